//! Application state and rendering.
//!
//! The session itself lives in `SessionStore`; this module only keeps the
//! view-local bits (current page, birth form, last notice) and redraws the
//! bound elements from them.

use astrace_connector::ConnectorError;
use astrace_form::{BirthForm, FormError};
use astrace_session::{
    AffordanceOptions, HomeAction, NetworkGuard, Notice, NoticeLevel, PageReloader, PageRouter,
    SessionStore, WalletAffordance, home_action, mint_enabled, wallet_affordance,
};
use astrace_types::Page;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit};

use crate::dom::{self, Elements};
use crate::provider::Eip1193Provider;
use crate::storage::BrowserStore;

pub type Store = SessionStore<Eip1193Provider, BrowserStore>;

pub const MINT_PRICE: &str = "0.02 ETH";
/// Dispatched on `document` with the chart query string as `detail`.
pub const MINT_EVENT: &str = "astrace:mint";

pub struct LocationReloader;

impl PageReloader for LocationReloader {
    fn reload(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Err(err) = window.location().reload() {
            warn!(error = ?err, "page reload failed");
        }
    }
}

pub struct App {
    pub els: Elements,
    pub store: Rc<Store>,
    pub guard: NetworkGuard,
    pub router: PageRouter,
    form: RefCell<BirthForm>,
    notice: RefCell<Option<Notice>>,
}

impl App {
    pub fn new(els: Elements, store: Rc<Store>, guard: NetworkGuard) -> Self {
        Self {
            els,
            store,
            guard,
            router: PageRouter::new(),
            form: RefCell::new(BirthForm::new()),
            notice: RefCell::new(None),
        }
    }

    pub fn render(&self) {
        let session = self.store.session();
        let page = self.router.on_session(&session);

        dom::set_hidden(&self.els.home_view, page != Page::Home);
        dom::set_hidden(&self.els.form_view, page != Page::Form);

        let affordance =
            wallet_affordance(&session, &self.guard, &AffordanceOptions::for_page(page));
        match affordance_label(&affordance) {
            Some(label) => {
                dom::set_text(&self.els.wallet_button, &label);
                dom::set_hidden(&self.els.wallet_button, false);
            }
            None => dom::set_hidden(&self.els.wallet_button, true),
        }

        dom::set_text(&self.els.home_cta, home_action_label(home_action(&session)));

        let complete = self.form.borrow().is_complete();
        self.els
            .mint_button
            .set_disabled(!mint_enabled(&session, &self.guard, complete));
        dom::set_text(&self.els.mint_price, MINT_PRICE);

        match &*self.notice.borrow() {
            Some(notice) => {
                dom::set_text(&self.els.notice, &notice.message);
                let _ = self
                    .els
                    .notice
                    .set_attribute("data-level", notice_level(notice.level));
                dom::set_hidden(&self.els.notice, false);
            }
            None => dom::set_hidden(&self.els.notice, true),
        }
    }

    fn show(&self, notice: Option<Notice>) {
        *self.notice.borrow_mut() = notice;
        self.render();
    }

    fn report(&self, err: &ConnectorError) {
        self.show(Some(Notice::for_error(err, self.guard.parameters())));
    }

    /// Returns whether the wallet ended up connected.
    pub async fn connect(&self) -> bool {
        match self.store.connect().await {
            Ok(_) => {
                self.show(None);
                true
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    pub async fn switch_network(&self) {
        match self.guard.switch_to_required_chain(&*self.store).await {
            Ok(_) => self.show(None),
            Err(err) => self.report(&err),
        }
    }

    pub fn disconnect(&self) {
        self.store.disconnect();
        self.show(None);
    }

    /// Header button: does whatever it currently offers.
    pub async fn on_wallet_button(&self) {
        let session = self.store.session();
        let options = AffordanceOptions::for_page(self.router.page());
        match wallet_affordance(&session, &self.guard, &options) {
            WalletAffordance::Connect => {
                self.connect().await;
            }
            WalletAffordance::SwitchNetwork => self.switch_network().await,
            WalletAffordance::Address { disconnects: true, .. } => self.disconnect(),
            WalletAffordance::Address { .. } | WalletAffordance::Hidden => {}
        }
    }

    /// Landing button. A successful connect opens the form right away.
    pub async fn on_home_cta(&self) {
        let connected = match home_action(&self.store.session()) {
            HomeAction::Continue => true,
            HomeAction::ConnectWallet => self.connect().await,
        };
        if connected {
            self.open(Page::Form);
        }
    }

    pub fn on_back(&self) {
        self.open(Page::Home);
    }

    fn open(&self, page: Page) {
        self.router.navigate(page, &self.store.session());
        self.render();
    }

    /// Re-reads every form input. Invalid fields are cleared and reported.
    pub fn on_form_input(&self) {
        let place = dom::get_input_value(&self.els.birth_place);
        let coords = dom::get_input_value(&self.els.birth_coords);
        let date = dom::get_input_value(&self.els.birth_date);
        let time = dom::get_input_value(&self.els.birth_time);

        let error = {
            let mut form = self.form.borrow_mut();
            [
                form.set_place(&place, Some(coords.as_str())),
                form.set_date(&date),
                form.set_time(&time),
            ]
            .into_iter()
            .find_map(Result::err)
        };
        self.show(error.map(|err| form_notice(&err)));
    }

    pub fn on_mint(&self) {
        let session = self.store.session();
        let form = self.form.borrow().clone();
        if !mint_enabled(&session, &self.guard, form.is_complete()) {
            return;
        }
        let request = match form.details().and_then(|details| details.chart_request()) {
            Ok(request) => request,
            Err(err) => {
                self.show(Some(form_notice(&err)));
                return;
            }
        };

        let query = request.query_string();
        info!(%query, "mint requested");
        if let Err(err) = dispatch_mint(&query) {
            warn!(error = ?err, "could not dispatch mint event");
        }
    }
}

fn dispatch_mint(query: &str) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let init = CustomEventInit::new();
    init.set_detail(&JsValue::from_str(query));
    let event = CustomEvent::new_with_event_init_dict(MINT_EVENT, &init)?;
    document.dispatch_event(&event)?;
    Ok(())
}

pub fn affordance_label(affordance: &WalletAffordance) -> Option<String> {
    match affordance {
        WalletAffordance::Hidden => None,
        WalletAffordance::Connect => Some("Connect Wallet".to_owned()),
        WalletAffordance::SwitchNetwork => Some("Switch Network".to_owned()),
        WalletAffordance::Address { label, .. } => Some(label.clone()),
    }
}

pub fn home_action_label(action: HomeAction) -> &'static str {
    match action {
        HomeAction::ConnectWallet => "Connect Wallet",
        HomeAction::Continue => "Continue",
    }
}

fn notice_level(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

fn form_notice(err: &FormError) -> Notice {
    Notice {
        level: NoticeLevel::Warning,
        message: err.to_string(),
    }
}
