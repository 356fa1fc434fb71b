use astrace_connector::ConnectorError;
use astrace_types::ChainParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient, user-facing message shown after a failed wallet action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// `required` names the network the user is asked to pick after a
    /// failed switch.
    pub fn for_error(err: &ConnectorError, required: &ChainParameters) -> Self {
        let (level, message) = match err {
            ConnectorError::NoProvider => (
                NoticeLevel::Error,
                "No wallet found. Install a browser wallet such as MetaMask to continue."
                    .to_owned(),
            ),
            ConnectorError::UserRejected => (
                NoticeLevel::Info,
                "Request cancelled in your wallet.".to_owned(),
            ),
            ConnectorError::Activation(reason) => (
                NoticeLevel::Warning,
                format!("Could not connect your wallet: {reason}"),
            ),
            ConnectorError::ChainSwitch(_) | ConnectorError::ChainAdd(_) => (
                NoticeLevel::Warning,
                format!(
                    "Could not switch network. Select {} in your wallet and try again.",
                    required.chain_name
                ),
            ),
        };
        Self { level, message }
    }
}
