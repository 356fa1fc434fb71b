use astrace_connector::{ConnectorError, WalletProvider};
use astrace_storage::KeyValueStore;
use astrace_types::{ChainId, ChainParameters, Session, SessionPhase};

use crate::store::SessionStore;

/// Derived view of whether the wallet sits on the chain minting needs.
#[derive(Debug, Clone)]
pub struct NetworkGuard {
    required: ChainParameters,
}

impl NetworkGuard {
    pub fn new(required: ChainParameters) -> Self {
        Self { required }
    }

    pub fn required_chain(&self) -> ChainId {
        self.required.chain_id
    }

    pub fn parameters(&self) -> &ChainParameters {
        &self.required
    }

    pub fn is_on_required_chain(&self, session: &Session) -> bool {
        session.chain_id() == Some(self.required.chain_id)
    }

    pub fn phase(&self, session: &Session) -> SessionPhase {
        session.phase(self.required.chain_id)
    }

    /// Moves the wallet to the required chain, registering it with the
    /// wallet first when needed. On failure the session is left as is.
    pub async fn switch_to_required_chain<P, S>(
        &self,
        store: &SessionStore<P, S>,
    ) -> Result<Session, ConnectorError>
    where
        P: WalletProvider,
        S: KeyValueStore,
    {
        store.switch_chain(&self.required).await
    }
}

impl Default for NetworkGuard {
    fn default() -> Self {
        Self::new(ChainParameters::polygon_mainnet())
    }
}
