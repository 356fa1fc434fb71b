//! Wallet session lifecycle for the Astrace onboarding flow.
//!
//! `SessionStore` owns the session, `NetworkGuard` derives chain state from
//! it, `EventPump` feeds provider notifications back in, and `PageRouter`
//! picks the view. The web front-end wires these together.

pub mod affordance;
pub mod config;
pub mod events;
pub mod guard;
pub mod notice;
pub mod router;
pub mod store;

pub use affordance::{
    AffordanceOptions, HomeAction, WalletAffordance, home_action, mint_enabled, wallet_affordance,
};
pub use config::{ChainChangePolicy, ConfigError, SessionConfig};
pub use events::{EventPump, PageReloader};
pub use guard::NetworkGuard;
pub use notice::{Notice, NoticeLevel};
pub use router::PageRouter;
pub use store::{EventEffect, SessionStore};

use astrace_connector::{Connector, ProviderEvent, WalletProvider};
use astrace_storage::{ConnectionFlag, KeyValueStore};
use tokio::sync::mpsc::UnboundedReceiver;

/// Builds the store and guard described by `config`.
pub fn build<P, S>(
    config: &SessionConfig,
    provider: Option<P>,
    storage: S,
) -> (SessionStore<P, S>, NetworkGuard, UnboundedReceiver<ProviderEvent>)
where
    P: WalletProvider,
    S: KeyValueStore,
{
    let connector = Connector::new(provider).with_supported_chains(config.supported_chains.clone());
    let flag = ConnectionFlag::new(storage, config.flag_key.clone());
    let (store, events) = SessionStore::new(connector, flag);
    let guard = NetworkGuard::new(config.required_chain.clone());
    (store, guard, events)
}
