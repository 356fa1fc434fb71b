//! Scripted in-process provider for tests.
//!
//! Replies are queued per method; the last queued reply for a method is
//! sticky and answers every later call. Unscripted methods fail with
//! `UNSUPPORTED_METHOD`.

use astrace_types::{ChainId, WalletAddress};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::{
    EventSink, ProviderEvent, ProviderRpcError, UNSUPPORTED_METHOD, WalletProvider, methods,
};

type Reply = Result<Value, ProviderRpcError>;

#[derive(Default)]
struct Script {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    log: RefCell<Vec<(String, Value)>>,
    sink: RefCell<Option<EventSink>>,
    subscriptions: Cell<usize>,
}

#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Rc<Script>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wallet that already trusts the site: both account methods return
    /// `address` and `eth_chainId` reports `chain_id`.
    pub fn authorized(address: &str, chain_id: ChainId) -> Self {
        let provider = Self::new();
        provider.respond(methods::REQUEST_ACCOUNTS, Ok(json!([address])));
        provider.respond(methods::ACCOUNTS, Ok(json!([address])));
        provider.respond(methods::CHAIN_ID, Ok(json!(chain_id.to_hex())));
        provider
    }

    pub fn respond(&self, method: &str, reply: Reply) -> &Self {
        self.script
            .replies
            .borrow_mut()
            .entry(method.to_owned())
            .or_default()
            .push_back(reply);
        self
    }

    /// Drops queued replies for `method` and installs `reply` as its only answer.
    pub fn replace(&self, method: &str, reply: Reply) -> &Self {
        self.script
            .replies
            .borrow_mut()
            .insert(method.to_owned(), VecDeque::from([reply]));
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.script
            .log
            .borrow()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn params(&self, method: &str) -> Vec<Value> {
        self.script
            .log
            .borrow()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn is_subscribed(&self) -> bool {
        self.script.sink.borrow().is_some()
    }

    pub fn subscriptions(&self) -> usize {
        self.script.subscriptions.get()
    }

    /// Pushes an event to the current subscriber. Returns `false` when
    /// nobody is listening.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        match self.script.sink.borrow().as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    pub fn emit_accounts(&self, accounts: &[&str]) -> bool {
        self.emit(ProviderEvent::AccountsChanged(
            accounts.iter().map(|a| WalletAddress((*a).to_owned())).collect(),
        ))
    }
}

#[async_trait(?Send)]
impl WalletProvider for ScriptedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        self.script.log.borrow_mut().push((method.to_owned(), params));

        let mut replies = self.script.replies.borrow_mut();
        let Some(queue) = replies.get_mut(method) else {
            return Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("{method} is not scripted"),
            ));
        };
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.unwrap_or_else(|| {
            Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("{method} is not scripted"),
            ))
        })
    }

    fn subscribe(&self, sink: EventSink) {
        self.script.subscriptions.set(self.script.subscriptions.get() + 1);
        *self.script.sink.borrow_mut() = Some(sink);
    }

    fn unsubscribe(&self) {
        self.script.sink.borrow_mut().take();
    }
}
