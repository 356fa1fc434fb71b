//! Astrace onboarding front-end.
//!
//! Binds the static page to the wallet session: injected provider, flag in
//! localStorage, header/landing/form controls and the mint hand-off.

pub mod app;
pub mod config;
pub mod dom;
pub mod events;
pub mod provider;
pub mod storage;

use astrace_session::EventPump;
use std::rc::Rc;
use tracing::info;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::app::{App, LocationReloader};
use crate::provider::Eip1193Provider;
use crate::storage::BrowserStore;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    init().await
}

async fn init() -> Result<(), JsValue> {
    let config = config::load();
    let els = dom::Elements::bind()?;

    let provider = Eip1193Provider::detect();
    if provider.is_none() {
        info!("no injected wallet detected");
    }
    let (store, guard, provider_events) =
        astrace_session::build(&config, provider, BrowserStore::local());
    let store = Rc::new(store);

    let pump = EventPump::new(Rc::clone(&store), LocationReloader, config.chain_change);
    spawn_local(pump.run(provider_events));

    let app = Rc::new(App::new(els, store, guard));
    events::bind_events(&app)?;
    app.render();
    spawn_local(events::follow_session(Rc::clone(&app)));

    // One silent attempt per page load, only if the user connected before.
    if let Some(session) = app.store.restore_on_load().await {
        info!(connected = session.is_connected(), "session restored");
    }
    Ok(())
}
