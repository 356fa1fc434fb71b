//! Seam between the session logic and the browser-injected wallet.
//!
//! `WalletProvider` is the EIP-1193 surface (`request` plus event
//! listeners). `Connector` turns raw provider replies into activations,
//! chain switches and the typed `ConnectorError` taxonomy.

use astrace_types::{ChainId, WalletAddress};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

pub mod connector;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use connector::{Activation, ActivationMode, Connector};

/// EIP-1193 `4001`: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 `4200`: the provider does not support the method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// Returned by `wallet_switchEthereumChain` when the wallet does not know the chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC internal error, used for replies we cannot interpret.
pub const INTERNAL_ERROR: i64 = -32603;

pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
}

/// Event names a provider emits through `on(name, listener)`.
pub mod events {
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
    pub const CHAIN_CHANGED: &str = "chainChanged";
    pub const DISCONNECT: &str = "disconnect";

    pub const ALL: [&str; 3] = [ACCOUNTS_CHANGED, CHAIN_CHANGED, DISCONNECT];
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "User rejected the request.")
    }

    pub fn malformed(what: &str, value: &Value) -> Self {
        Self::new(INTERNAL_ERROR, format!("unexpected {what} reply: {value}"))
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }
}

/// Notifications pushed by the provider outside of any request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<WalletAddress>),
    ChainChanged(ChainId),
    Disconnect(ProviderRpcError),
}

impl ProviderEvent {
    /// Decodes a listener payload. Unknown names and malformed payloads
    /// yield `None`.
    pub fn from_payload(name: &str, payload: &Value) -> Option<Self> {
        match name {
            events::ACCOUNTS_CHANGED => parse_accounts(payload).map(Self::AccountsChanged),
            events::CHAIN_CHANGED => parse_chain_id(payload).map(Self::ChainChanged),
            events::DISCONNECT => {
                let code = payload.get("code").and_then(Value::as_i64).unwrap_or(INTERNAL_ERROR);
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("provider disconnected");
                Some(Self::Disconnect(ProviderRpcError::new(code, message)))
            }
            _ => None,
        }
    }
}

pub type EventSink = UnboundedSender<ProviderEvent>;

/// The injected wallet object. Browser providers are `!Send`, so neither is this.
#[async_trait(?Send)]
pub trait WalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Starts forwarding `accountsChanged` / `chainChanged` / `disconnect` into `sink`.
    fn subscribe(&self, sink: EventSink);

    fn unsubscribe(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("no wallet provider detected; install a browser wallet to continue")]
    NoProvider,
    #[error("the request was rejected in the wallet")]
    UserRejected,
    #[error("wallet activation failed: {0}")]
    Activation(String),
    #[error("could not switch network: {0}")]
    ChainSwitch(String),
    #[error("could not add network: {0}")]
    ChainAdd(String),
}

impl ConnectorError {
    /// Everything except a missing provider can be retried by the user.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ConnectorError::NoProvider)
    }
}

pub(crate) fn parse_chain_id(value: &Value) -> Option<ChainId> {
    match value {
        Value::String(raw) => ChainId::parse(raw),
        Value::Number(n) => n.as_u64().map(ChainId),
        _ => None,
    }
}

pub(crate) fn parse_accounts(value: &Value) -> Option<Vec<WalletAddress>> {
    value
        .as_array()?
        .iter()
        .map(|entry| entry.as_str().map(|s| WalletAddress(s.to_owned())))
        .collect()
}
