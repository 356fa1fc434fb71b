//! `window.ethereum` binding.
//!
//! Calls go through `Reflect` so any EIP-1193 wallet works without
//! per-vendor bindings. Listener closures are kept alive here until
//! `unsubscribe` hands them back to `removeListener`.

use astrace_connector::{
    EventSink, INTERNAL_ERROR, ProviderEvent, ProviderRpcError, WalletProvider, events,
};
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use std::cell::RefCell;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

const INJECTION_KEY: &str = "ethereum";

type Listener = Closure<dyn FnMut(JsValue)>;

pub struct Eip1193Provider {
    ethereum: Object,
    listeners: RefCell<Vec<(&'static str, Listener)>>,
}

impl Eip1193Provider {
    /// `None` when the browser has no injected wallet.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str(INJECTION_KEY)).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        let ethereum = ethereum.dyn_into::<Object>().ok()?;
        Some(Self {
            ethereum,
            listeners: RefCell::new(Vec::new()),
        })
    }

    fn method(&self, name: &str) -> Result<Function, JsValue> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str(&format!("provider.{name} is not a function")))
    }

    fn listen(&self, name: &'static str, sink: EventSink) -> Result<(), JsValue> {
        let listener = Closure::wrap(Box::new(move |payload: JsValue| {
            let payload: Value = serde_wasm_bindgen::from_value(payload).unwrap_or(Value::Null);
            match ProviderEvent::from_payload(name, &payload) {
                Some(event) => {
                    debug!(event = name, "provider event");
                    // Closed only once the store is gone.
                    let _ = sink.send(event);
                }
                None => warn!(event = name, %payload, "ignoring malformed provider event"),
            }
        }) as Box<dyn FnMut(JsValue)>);

        self.method("on")?
            .call2(&self.ethereum, &JsValue::from_str(name), listener.as_ref().unchecked_ref())?;
        self.listeners.borrow_mut().push((name, listener));
        Ok(())
    }
}

#[async_trait(?Send)]
impl WalletProvider for Eip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        let args = json!({ "method": method, "params": params })
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| ProviderRpcError::new(INTERNAL_ERROR, err.to_string()))?;

        let reply = self
            .method("request")
            .and_then(|request| request.call1(&self.ethereum, &args))
            .map_err(rpc_error)?;
        let reply = match reply.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise).await.map_err(rpc_error)?,
            Err(value) => value,
        };

        if reply.is_undefined() || reply.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(reply)
            .map_err(|err| ProviderRpcError::new(INTERNAL_ERROR, err.to_string()))
    }

    fn subscribe(&self, sink: EventSink) {
        for name in events::ALL {
            if let Err(err) = self.listen(name, sink.clone()) {
                warn!(event = name, error = ?err, "could not register provider listener");
            }
        }
    }

    fn unsubscribe(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        let remove = match self.method("removeListener") {
            Ok(remove) => remove,
            Err(err) => {
                warn!(error = ?err, "provider cannot remove listeners");
                return;
            }
        };
        for (name, listener) in listeners {
            if let Err(err) = remove.call2(
                &self.ethereum,
                &JsValue::from_str(name),
                listener.as_ref().unchecked_ref(),
            ) {
                warn!(event = name, error = ?err, "could not remove provider listener");
            }
        }
    }
}

/// Wallets reject with `{ code, message }`; anything else is internal.
fn rpc_error(err: JsValue) -> ProviderRpcError {
    let code = Reflect::get(&err, &JsValue::from_str("code"))
        .ok()
        .and_then(|code| code.as_f64())
        .map_or(INTERNAL_ERROR, |code| code as i64);
    let message = Reflect::get(&err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    ProviderRpcError::new(code, message)
}
