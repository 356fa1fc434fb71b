use astrace_connector::{
    Activation, ActivationMode, Connector, ConnectorError, EventSink, ProviderEvent,
    WalletProvider,
};
use astrace_storage::{ConnectionFlag, KeyValueStore};
use astrace_types::{ChainId, ChainParameters, Session};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

/// What applying a provider event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    Ignored,
    AccountChanged,
    ChainChanged(ChainId),
    Disconnected,
}

/// Sole owner of the `Session`.
///
/// Every mutation goes through `publish`, which notifies `subscribe()`
/// receivers and keeps the persisted flag in step with `connected`.
pub struct SessionStore<P, S> {
    connector: Connector<P>,
    flag: ConnectionFlag<S>,
    session: watch::Sender<Session>,
    sink: EventSink,
    connect_gate: Mutex<()>,
}

impl<P, S> SessionStore<P, S>
where
    P: WalletProvider,
    S: KeyValueStore,
{
    /// Returns the store and the receiving end of the provider event
    /// channel, to be drained by an `EventPump`.
    pub fn new(
        connector: Connector<P>,
        flag: ConnectionFlag<S>,
    ) -> (Self, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (sink, events) = mpsc::unbounded_channel();
        let (session, _) = watch::channel(Session::disconnected());
        let store = Self {
            connector,
            flag,
            session,
            sink,
            connect_gate: Mutex::new(()),
        };
        (store, events)
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn connector(&self) -> &Connector<P> {
        &self.connector
    }

    /// Prompts for account access. Concurrent calls are serialized; a call
    /// that finds the session already connected returns it untouched.
    pub async fn connect(&self) -> Result<Session, ConnectorError> {
        self.activate(ActivationMode::Interactive)
            .await
            .inspect_err(|err| warn!(error = %err, "wallet connection failed"))
    }

    /// Best-effort reconnect at startup. Only runs when the persisted flag
    /// is set and never surfaces an error.
    pub async fn restore_on_load(&self) -> Option<Session> {
        match self.flag.load() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                warn!(error = %err, key = self.flag.key(), "could not read connection flag");
                return None;
            }
        }

        match self.activate(ActivationMode::Silent).await {
            Ok(session) => Some(session),
            Err(err) => {
                debug!(error = %err, "silent reconnect skipped");
                None
            }
        }
    }

    /// Ends the session. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        self.connector.deactivate();
        if self.session.borrow().is_connected() {
            info!("wallet disconnected");
            self.publish(Session::disconnected());
        } else {
            self.persist(false);
        }
    }

    pub(crate) async fn switch_chain(
        &self,
        target: &ChainParameters,
    ) -> Result<Session, ConnectorError> {
        if !self.connector.is_installed() {
            return Err(ConnectorError::NoProvider);
        }
        if !self.session.borrow().is_connected() {
            return Err(ConnectorError::ChainSwitch("wallet is not connected".to_owned()));
        }

        let chain_id = self
            .connector
            .switch_chain(target)
            .await
            .inspect_err(|err| {
                warn!(error = %err, target = %target.chain_id, "chain switch failed");
            })?;

        // The wallet may have disconnected while the prompt was open; the
        // update is then dropped by `with_chain`.
        let next = self.session().with_chain(chain_id);
        self.publish(next.clone());
        Ok(next)
    }

    /// Applies a provider notification. The latest event always wins.
    pub fn apply_event(&self, event: ProviderEvent) -> EventEffect {
        debug!(?event, "provider event");
        let current = self.session();

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                Some(address) if current.is_connected() => {
                    self.publish(current.with_address(address));
                    EventEffect::AccountChanged
                }
                Some(_) => EventEffect::Ignored,
                // Locked wallet or every account revoked.
                None => self.reset(&current),
            },
            ProviderEvent::ChainChanged(chain_id) if current.is_connected() => {
                self.publish(current.with_chain(chain_id));
                EventEffect::ChainChanged(chain_id)
            }
            ProviderEvent::ChainChanged(_) => EventEffect::Ignored,
            ProviderEvent::Disconnect(err) => {
                info!(error = %err, "wallet reported disconnect");
                self.reset(&current)
            }
        }
    }

    async fn activate(&self, mode: ActivationMode) -> Result<Session, ConnectorError> {
        let _gate = self.connect_gate.lock().await;

        let current = self.session();
        if current.is_connected() {
            debug!(?mode, "connect skipped, session already active");
            return Ok(current);
        }

        let Activation { address, chain_id } = self.connector.activate(mode, &self.sink).await?;
        let session = Session::connected(address, chain_id);
        self.publish(session.clone());
        Ok(session)
    }

    fn reset(&self, current: &Session) -> EventEffect {
        if !current.is_connected() {
            return EventEffect::Ignored;
        }
        self.connector.deactivate();
        self.publish(Session::disconnected());
        EventEffect::Disconnected
    }

    fn publish(&self, next: Session) {
        let was_connected = self.session.borrow().is_connected();
        let now_connected = next.is_connected();
        self.session.send_replace(next);
        if was_connected != now_connected {
            self.persist(now_connected);
        }
    }

    fn persist(&self, connected: bool) {
        if let Err(err) = self.flag.store(connected) {
            warn!(error = %err, key = self.flag.key(), "could not persist connection flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrace_connector::methods;
    use astrace_connector::mock::ScriptedProvider;
    use astrace_connector::ProviderRpcError;
    use astrace_storage::{DEFAULT_FLAG_KEY, InMemoryStore};
    use astrace_types::{POLYGON_MAINNET, WalletAddress};
    use serde_json::json;

    const ALICE: &str = "0xa11ce00000000000000000000000000000000001";
    const BOB: &str = "0xb0b0000000000000000000000000000000000002";

    type TestStore = SessionStore<ScriptedProvider, InMemoryStore>;

    fn store_with(
        provider: Option<ScriptedProvider>,
    ) -> (TestStore, InMemoryStore, mpsc::UnboundedReceiver<ProviderEvent>) {
        let backing = InMemoryStore::new();
        let flag = ConnectionFlag::new(backing.clone(), DEFAULT_FLAG_KEY);
        let (store, events) = SessionStore::new(Connector::new(provider), flag);
        (store, backing, events)
    }

    fn assert_invariant(session: &Session) {
        assert_eq!(session.address().is_some(), session.is_connected());
        assert_eq!(session.chain_id().is_some(), session.is_connected());
    }

    #[tokio::test]
    async fn connect_sets_session_and_flag() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, backing, _events) = store_with(Some(provider));

        let session = store.connect().await.unwrap();
        assert_eq!(session.address().map(|a| a.0.as_str()), Some(ALICE));
        assert_eq!(session.chain_id(), Some(ChainId(1)));
        assert_eq!(store.session(), session);
        assert_eq!(backing.raw(DEFAULT_FLAG_KEY).as_deref(), Some("true"));
        assert_invariant(&session);
    }

    #[tokio::test]
    async fn missing_wallet_leaves_session_empty() {
        let (store, backing, _events) = store_with(None);

        let err = store.connect().await.unwrap_err();
        assert_eq!(err, ConnectorError::NoProvider);
        assert_eq!(store.session(), Session::disconnected());
        assert_eq!(backing.raw(DEFAULT_FLAG_KEY), None);
    }

    #[tokio::test]
    async fn rejected_connect_changes_nothing() {
        let provider = ScriptedProvider::new();
        provider.respond(methods::REQUEST_ACCOUNTS, Err(ProviderRpcError::user_rejected()));
        let (store, backing, _events) = store_with(Some(provider));
        let updates = store.subscribe();

        assert_eq!(store.connect().await.unwrap_err(), ConnectorError::UserRejected);
        assert!(!store.session().is_connected());
        assert!(!updates.has_changed().unwrap());
        assert_eq!(backing.raw(DEFAULT_FLAG_KEY), None);
    }

    #[tokio::test]
    async fn connect_while_connected_does_not_prompt_again() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, _backing, _events) = store_with(Some(provider.clone()));

        let (first, second) = tokio::join!(store.connect(), store.connect());
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(provider.calls(methods::REQUEST_ACCOUNTS), 1);
    }

    #[tokio::test]
    async fn disconnect_resets_and_clears_flag() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, backing, _events) = store_with(Some(provider.clone()));
        store.connect().await.unwrap();

        store.disconnect();
        assert_eq!(store.session(), Session::disconnected());
        assert_eq!(backing.raw(DEFAULT_FLAG_KEY).as_deref(), Some("false"));
        assert!(!provider.is_subscribed());
    }

    #[tokio::test]
    async fn disconnect_when_disconnected_is_a_noop() {
        let (store, _backing, _events) = store_with(None);
        let updates = store.subscribe();

        store.disconnect();
        store.disconnect();
        assert_eq!(store.session(), Session::disconnected());
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn restore_skips_without_flag() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, _backing, _events) = store_with(Some(provider.clone()));

        assert_eq!(store.restore_on_load().await, None);
        assert_eq!(provider.calls(methods::ACCOUNTS), 0);
        assert_eq!(provider.calls(methods::REQUEST_ACCOUNTS), 0);
    }

    #[tokio::test]
    async fn restore_with_flag_reconnects_silently_once() {
        let provider = ScriptedProvider::authorized(ALICE, POLYGON_MAINNET);
        let (store, backing, _events) = store_with(Some(provider.clone()));
        backing.set(DEFAULT_FLAG_KEY, "true").unwrap();

        let session = store.restore_on_load().await.unwrap();
        assert_eq!(session.chain_id(), Some(POLYGON_MAINNET));
        assert_eq!(provider.calls(methods::ACCOUNTS), 1);
        assert_eq!(provider.calls(methods::REQUEST_ACCOUNTS), 0);
    }

    #[tokio::test]
    async fn restore_failure_is_swallowed() {
        let provider = ScriptedProvider::new();
        provider.respond(methods::ACCOUNTS, Ok(json!([])));
        let (store, backing, _events) = store_with(Some(provider));
        backing.set(DEFAULT_FLAG_KEY, "true").unwrap();

        assert_eq!(store.restore_on_load().await, None);
        assert!(!store.session().is_connected());
    }

    #[tokio::test]
    async fn account_change_updates_address() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, _backing, _events) = store_with(Some(provider));
        store.connect().await.unwrap();

        let effect = store.apply_event(ProviderEvent::AccountsChanged(vec![WalletAddress(
            BOB.to_owned(),
        )]));
        assert_eq!(effect, EventEffect::AccountChanged);
        assert_eq!(store.session().address().map(|a| a.0.as_str()), Some(BOB));
        assert_eq!(store.session().chain_id(), Some(ChainId(1)));
    }

    #[tokio::test]
    async fn empty_accounts_disconnects() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, backing, _events) = store_with(Some(provider));
        store.connect().await.unwrap();

        let effect = store.apply_event(ProviderEvent::AccountsChanged(vec![]));
        assert_eq!(effect, EventEffect::Disconnected);
        assert_eq!(store.session(), Session::disconnected());
        assert_eq!(backing.raw(DEFAULT_FLAG_KEY).as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn provider_disconnect_resets_session() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, _backing, _events) = store_with(Some(provider.clone()));
        store.connect().await.unwrap();

        let effect = store.apply_event(ProviderEvent::Disconnect(ProviderRpcError::new(
            4900,
            "Disconnected",
        )));
        assert_eq!(effect, EventEffect::Disconnected);
        assert!(!store.session().is_connected());
        assert!(!provider.is_subscribed());
    }

    #[tokio::test]
    async fn events_while_disconnected_are_ignored() {
        let (store, _backing, _events) = store_with(None);

        assert_eq!(
            store.apply_event(ProviderEvent::ChainChanged(POLYGON_MAINNET)),
            EventEffect::Ignored
        );
        assert_eq!(
            store.apply_event(ProviderEvent::AccountsChanged(vec![WalletAddress(
                ALICE.to_owned()
            )])),
            EventEffect::Ignored
        );
        assert_invariant(&store.session());
    }

    #[tokio::test]
    async fn switch_requires_a_session() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, _backing, _events) = store_with(Some(provider.clone()));

        let err = store
            .switch_chain(&ChainParameters::polygon_mainnet())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ChainSwitch(_)));
        assert_eq!(provider.calls(methods::SWITCH_CHAIN), 0);
    }

    #[tokio::test]
    async fn subscribers_see_each_mutation() {
        let provider = ScriptedProvider::authorized(ALICE, ChainId(1));
        let (store, _backing, _events) = store_with(Some(provider));
        let mut updates = store.subscribe();

        store.connect().await.unwrap();
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().is_connected());

        store.disconnect();
        assert!(updates.has_changed().unwrap());
        assert!(!updates.borrow_and_update().is_connected());
    }
}
