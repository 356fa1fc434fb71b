//! Provider event subscriber.
//!
//! Drains the channel the connector feeds, applies each event to the
//! store and enforces the chain-change policy. With the default policy a
//! chain change reloads the page once per event, dropping any unsaved UI
//! state such as a half-filled birth form.

use astrace_connector::{ProviderEvent, WalletProvider};
use astrace_storage::KeyValueStore;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::config::ChainChangePolicy;
use crate::store::{EventEffect, SessionStore};

pub trait PageReloader {
    fn reload(&self);
}

pub struct EventPump<P, S, R> {
    store: Rc<SessionStore<P, S>>,
    reloader: R,
    policy: ChainChangePolicy,
}

impl<P, S, R> EventPump<P, S, R>
where
    P: WalletProvider,
    S: KeyValueStore,
    R: PageReloader,
{
    pub fn new(store: Rc<SessionStore<P, S>>, reloader: R, policy: ChainChangePolicy) -> Self {
        Self {
            store,
            reloader,
            policy,
        }
    }

    pub fn dispatch(&self, event: ProviderEvent) -> EventEffect {
        let effect = self.store.apply_event(event);
        if let EventEffect::ChainChanged(chain_id) = effect {
            if self.policy == ChainChangePolicy::Reload {
                info!(chain_id = %chain_id, "chain changed, reloading page");
                self.reloader.reload();
            }
        }
        effect
    }

    /// Runs until every sender is gone, which in practice means until the
    /// store is dropped.
    pub async fn run(self, mut events: UnboundedReceiver<ProviderEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        debug!("provider event stream closed");
    }
}
