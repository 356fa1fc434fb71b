//! Event binding.
//!
//! Wires DOM listeners to `App` actions and keeps the view in sync with the
//! session. Async handlers run via `wasm_bindgen_futures::spawn_local`.

use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::app::App;

/// Helper: attach async click handler to an element.
macro_rules! on_click_async {
    ($el:expr, $app:expr, $handler:expr) => {{
        let app = Rc::clone($app);
        let cb = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let app2 = Rc::clone(&app);
            wasm_bindgen_futures::spawn_local(async move {
                $handler(&app2).await;
            });
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Helper: attach sync handler for any event name.
macro_rules! on_event {
    ($el:expr, $name:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(web_sys::Event)>);
        $el.add_event_listener_with_callback($name, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(app: &Rc<App>) -> Result<(), JsValue> {
    // ── Wallet ──
    on_click_async!(app.els.wallet_button, app, App::on_wallet_button);
    on_click_async!(app.els.home_cta, app, App::on_home_cta);

    // ── Birth form ──
    {
        let app2 = Rc::clone(app);
        on_event!(app.els.back_button, "click", move |_: web_sys::Event| app2.on_back());
    }
    for input in [
        &app.els.birth_place,
        &app.els.birth_coords,
        &app.els.birth_date,
        &app.els.birth_time,
    ] {
        let app2 = Rc::clone(app);
        on_event!(input, "change", move |_: web_sys::Event| app2.on_form_input());
    }

    // ── Mint ──
    {
        let app2 = Rc::clone(app);
        on_event!(app.els.mint_button, "click", move |_: web_sys::Event| app2.on_mint());
    }

    Ok(())
}

/// Redraws on every session change until the store is dropped.
pub async fn follow_session(app: Rc<App>) {
    let mut updates = app.store.subscribe();
    while updates.changed().await.is_ok() {
        app.render();
    }
}
