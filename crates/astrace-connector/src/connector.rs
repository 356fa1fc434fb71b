use astrace_types::{ChainId, ChainParameters, WalletAddress};
use serde_json::json;
use std::cell::Cell;
use tracing::{debug, info};

use crate::{
    ConnectorError, EventSink, ProviderRpcError, UNRECOGNIZED_CHAIN, WalletProvider, methods,
    parse_accounts, parse_chain_id,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// `eth_requestAccounts`; may open the wallet's permission prompt.
    Interactive,
    /// `eth_accounts`; only succeeds for a site the wallet already trusts.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub address: WalletAddress,
    pub chain_id: ChainId,
}

pub struct Connector<P> {
    provider: Option<P>,
    supported_chains: Vec<ChainId>,
    subscribed: Cell<bool>,
}

impl<P> Connector<P>
where
    P: WalletProvider,
{
    /// `None` models a browser without an injected wallet.
    pub fn new(provider: Option<P>) -> Self {
        Self {
            provider,
            supported_chains: Vec::new(),
            subscribed: Cell::new(false),
        }
    }

    /// Restricts activation to these chains. Empty accepts any chain.
    pub fn with_supported_chains(mut self, chains: Vec<ChainId>) -> Self {
        self.supported_chains = chains;
        self
    }

    pub fn is_installed(&self) -> bool {
        self.provider.is_some()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.get()
    }

    fn provider(&self) -> Result<&P, ConnectorError> {
        self.provider.as_ref().ok_or(ConnectorError::NoProvider)
    }

    pub async fn activate(
        &self,
        mode: ActivationMode,
        sink: &EventSink,
    ) -> Result<Activation, ConnectorError> {
        let provider = self.provider()?;

        let method = match mode {
            ActivationMode::Interactive => methods::REQUEST_ACCOUNTS,
            ActivationMode::Silent => methods::ACCOUNTS,
        };
        let reply = provider
            .request(method, json!([]))
            .await
            .map_err(activation_error)?;
        let accounts = parse_accounts(&reply)
            .ok_or_else(|| activation_error(ProviderRpcError::malformed(method, &reply)))?;
        let Some(address) = accounts.into_iter().next() else {
            return Err(ConnectorError::Activation(
                "wallet returned no authorized accounts".to_owned(),
            ));
        };

        let chain_id = read_chain(provider).await.map_err(activation_error)?;
        if !self.supported_chains.is_empty() && !self.supported_chains.contains(&chain_id) {
            return Err(ConnectorError::Activation(format!(
                "chain {chain_id} is not supported"
            )));
        }

        if !self.subscribed.replace(true) {
            provider.subscribe(sink.clone());
        }

        info!(address = %address, chain_id = %chain_id, ?mode, "wallet activated");
        Ok(Activation { address, chain_id })
    }

    /// Drops provider listeners. Providers have no revoke call, so this
    /// only clears local state and cannot fail.
    pub fn deactivate(&self) {
        if let Some(provider) = &self.provider {
            if self.subscribed.replace(false) {
                provider.unsubscribe();
            }
        }
        debug!("wallet deactivated");
    }

    /// Asks the wallet to move to `target`, registering the chain first if
    /// the wallet reports it as unknown. Returns the chain the wallet ends on.
    pub async fn switch_chain(&self, target: &ChainParameters) -> Result<ChainId, ConnectorError> {
        let provider = self.provider()?;

        match request_switch(provider, target.chain_id).await {
            Ok(()) => {}
            Err(err) if err.code == UNRECOGNIZED_CHAIN => {
                debug!(chain_id = %target.chain_id, "chain unknown to wallet, adding it");
                let definition = serde_json::to_value(target)
                    .map_err(|err| ConnectorError::ChainAdd(err.to_string()))?;
                provider
                    .request(methods::ADD_CHAIN, json!([definition]))
                    .await
                    .map_err(|err| ConnectorError::ChainAdd(err.to_string()))?;
                request_switch(provider, target.chain_id)
                    .await
                    .map_err(|err| ConnectorError::ChainSwitch(err.to_string()))?;
            }
            Err(err) => return Err(ConnectorError::ChainSwitch(err.to_string())),
        }

        let chain_id = read_chain(provider)
            .await
            .map_err(|err| ConnectorError::ChainSwitch(err.to_string()))?;
        info!(chain_id = %chain_id, "wallet switched chain");
        Ok(chain_id)
    }
}

async fn request_switch<P: WalletProvider>(
    provider: &P,
    chain_id: ChainId,
) -> Result<(), ProviderRpcError> {
    provider
        .request(methods::SWITCH_CHAIN, json!([{ "chainId": chain_id.to_hex() }]))
        .await
        .map(|_| ())
}

async fn read_chain<P: WalletProvider>(provider: &P) -> Result<ChainId, ProviderRpcError> {
    let reply = provider.request(methods::CHAIN_ID, json!([])).await?;
    parse_chain_id(&reply).ok_or_else(|| ProviderRpcError::malformed(methods::CHAIN_ID, &reply))
}

fn activation_error(err: ProviderRpcError) -> ConnectorError {
    if err.is_user_rejection() {
        ConnectorError::UserRejected
    } else {
        ConnectorError::Activation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProvider;
    use crate::ProviderEvent;
    use astrace_types::POLYGON_MAINNET;
    use tokio::sync::mpsc;

    const ALICE: &str = "0xa11ce00000000000000000000000000000000001";

    fn sink() -> (EventSink, mpsc::UnboundedReceiver<ProviderEvent>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn missing_provider_is_reported() {
        let connector = Connector::<ScriptedProvider>::new(None);
        let (tx, _rx) = sink();

        let err = connector.activate(ActivationMode::Interactive, &tx).await.unwrap_err();
        assert_eq!(err, ConnectorError::NoProvider);
        assert!(!connector.is_installed());

        let err = connector
            .switch_chain(&ChainParameters::polygon_mainnet())
            .await
            .unwrap_err();
        assert_eq!(err, ConnectorError::NoProvider);
    }

    #[tokio::test]
    async fn interactive_activation_reads_account_and_chain() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let connector = Connector::new(Some(provider.clone()));
        let (tx, _rx) = sink();

        let activation = connector.activate(ActivationMode::Interactive, &tx).await.unwrap();
        assert_eq!(activation.address.0, ALICE);
        assert_eq!(activation.chain_id, ChainId(1));
        assert_eq!(provider.calls(methods::REQUEST_ACCOUNTS), 1);
        assert_eq!(provider.calls(methods::ACCOUNTS), 0);
        assert!(provider.is_subscribed());
    }

    #[tokio::test]
    async fn silent_activation_never_prompts() {
        let provider = ScriptedProvider::authorized(ALICE, POLYGON_MAINNET);
        let connector = Connector::new(Some(provider.clone()));
        let (tx, _rx) = sink();

        connector.activate(ActivationMode::Silent, &tx).await.unwrap();
        assert_eq!(provider.calls(methods::REQUEST_ACCOUNTS), 0);
        assert_eq!(provider.calls(methods::ACCOUNTS), 1);
    }

    #[tokio::test]
    async fn rejection_maps_to_user_rejected() {
        let provider = ScriptedProvider::new();
        provider.respond(methods::REQUEST_ACCOUNTS, Err(ProviderRpcError::user_rejected()));
        let connector = Connector::new(Some(provider.clone()));
        let (tx, _rx) = sink();

        let err = connector.activate(ActivationMode::Interactive, &tx).await.unwrap_err();
        assert_eq!(err, ConnectorError::UserRejected);
        assert!(!provider.is_subscribed());
    }

    #[tokio::test]
    async fn empty_account_list_fails_activation() {
        let provider = ScriptedProvider::new();
        provider.respond(methods::ACCOUNTS, Ok(json!([])));
        let connector = Connector::new(Some(provider));
        let (tx, _rx) = sink();

        let err = connector.activate(ActivationMode::Silent, &tx).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Activation(_)));
    }

    #[tokio::test]
    async fn unsupported_chain_fails_activation() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(999));
        let connector = Connector::new(Some(provider.clone()))
            .with_supported_chains(vec![POLYGON_MAINNET, ChainId(1)]);
        let (tx, _rx) = sink();

        let err = connector.activate(ActivationMode::Interactive, &tx).await.unwrap_err();
        assert_eq!(err, ConnectorError::Activation("chain 999 is not supported".to_owned()));
        assert!(!provider.is_subscribed());
    }

    #[tokio::test]
    async fn repeated_activation_subscribes_once() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let connector = Connector::new(Some(provider.clone()));
        let (tx, _rx) = sink();

        connector.activate(ActivationMode::Interactive, &tx).await.unwrap();
        connector.activate(ActivationMode::Interactive, &tx).await.unwrap();
        assert_eq!(provider.subscriptions(), 1);

        connector.deactivate();
        connector.deactivate();
        assert!(!provider.is_subscribed());
        assert!(!connector.is_subscribed());
    }

    #[tokio::test]
    async fn switch_returns_resulting_chain() {
        let provider = ScriptedProvider::new();
        provider.respond(methods::SWITCH_CHAIN, Ok(json!(null)));
        provider.respond(methods::CHAIN_ID, Ok(json!("0x89")));
        let connector = Connector::new(Some(provider.clone()));

        let chain = connector
            .switch_chain(&ChainParameters::polygon_mainnet())
            .await
            .unwrap();
        assert_eq!(chain, POLYGON_MAINNET);
        assert_eq!(provider.params(methods::SWITCH_CHAIN)[0], json!([{ "chainId": "0x89" }]));
        assert_eq!(provider.calls(methods::ADD_CHAIN), 0);
    }

    #[tokio::test]
    async fn unknown_chain_is_added_then_switched() {
        let provider = ScriptedProvider::new();
        provider.respond(
            methods::SWITCH_CHAIN,
            Err(ProviderRpcError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
        );
        provider.respond(methods::SWITCH_CHAIN, Ok(json!(null)));
        provider.respond(methods::ADD_CHAIN, Ok(json!(null)));
        provider.respond(methods::CHAIN_ID, Ok(json!("0x89")));
        let connector = Connector::new(Some(provider.clone()));

        let chain = connector
            .switch_chain(&ChainParameters::polygon_mainnet())
            .await
            .unwrap();
        assert_eq!(chain, POLYGON_MAINNET);
        assert_eq!(provider.calls(methods::SWITCH_CHAIN), 2);

        let added = &provider.params(methods::ADD_CHAIN)[0][0];
        assert_eq!(added["chainId"], "0x89");
        assert_eq!(added["rpcUrls"][0], "https://rpc.ankr.com/polygon");
        assert_eq!(added["nativeCurrency"]["decimals"], 18);
    }

    #[tokio::test]
    async fn failed_add_is_chain_add_error() {
        let provider = ScriptedProvider::new();
        provider.respond(
            methods::SWITCH_CHAIN,
            Err(ProviderRpcError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
        );
        provider.respond(methods::ADD_CHAIN, Err(ProviderRpcError::user_rejected()));
        let connector = Connector::new(Some(provider.clone()));

        let err = connector
            .switch_chain(&ChainParameters::polygon_mainnet())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ChainAdd(_)));
        assert_eq!(provider.calls(methods::SWITCH_CHAIN), 1);
    }

    #[tokio::test]
    async fn rejected_switch_is_chain_switch_error() {
        let provider = ScriptedProvider::new();
        provider.respond(methods::SWITCH_CHAIN, Err(ProviderRpcError::user_rejected()));
        let connector = Connector::new(Some(provider.clone()));

        let err = connector
            .switch_chain(&ChainParameters::polygon_mainnet())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ChainSwitch(_)));
        assert_eq!(provider.calls(methods::ADD_CHAIN), 0);
    }
}
