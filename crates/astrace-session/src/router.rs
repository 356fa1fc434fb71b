use astrace_types::{Page, Session};
use std::cell::Cell;
use tracing::debug;

/// In-memory choice between the landing view and the birth form.
#[derive(Debug, Default)]
pub struct PageRouter {
    page: Cell<Page>,
}

impl PageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Page {
        self.page.get()
    }

    /// The form is only reachable with a connected wallet.
    pub fn navigate(&self, to: Page, session: &Session) -> Page {
        let next = match to {
            Page::Form if !session.is_connected() => Page::Home,
            page => page,
        };
        if next != to {
            debug!(?to, "navigation refused without a wallet");
        }
        self.page.set(next);
        next
    }

    /// Falls back to home as soon as the wallet goes away.
    pub fn on_session(&self, session: &Session) -> Page {
        if self.page.get() == Page::Form && !session.is_connected() {
            debug!("wallet gone, leaving form");
            self.page.set(Page::Home);
        }
        self.page.get()
    }
}
