//! What the wallet-facing controls should offer for a given session.
//!
//! One decision table, parameterized by `AffordanceOptions`, serves the
//! landing header and the form header. The form header doubles as the
//! wallet button: its address label ends the session when clicked.

use astrace_types::{Page, Session, SessionPhase};
use serde::{Deserialize, Serialize};

use crate::guard::NetworkGuard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletAffordance {
    Hidden,
    Connect,
    SwitchNetwork,
    Address { label: String, disconnects: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffordanceOptions {
    pub offer_connect: bool,
    pub offer_switch: bool,
    pub show_address: bool,
    /// Only show the address once the wallet is on the required chain.
    pub address_needs_required_chain: bool,
    /// Clicking the address ends the session.
    pub address_disconnects: bool,
}

impl Default for AffordanceOptions {
    fn default() -> Self {
        Self::for_page(Page::Form)
    }
}

impl AffordanceOptions {
    pub fn for_page(page: Page) -> Self {
        match page {
            Page::Home => Self {
                offer_connect: false,
                offer_switch: false,
                show_address: true,
                address_needs_required_chain: true,
                address_disconnects: false,
            },
            Page::Form => Self {
                offer_connect: true,
                offer_switch: true,
                show_address: true,
                address_needs_required_chain: false,
                address_disconnects: true,
            },
        }
    }
}

pub fn wallet_affordance(
    session: &Session,
    guard: &NetworkGuard,
    options: &AffordanceOptions,
) -> WalletAffordance {
    let address = || match session.address() {
        Some(address) if options.show_address => WalletAffordance::Address {
            label: address.short(),
            disconnects: options.address_disconnects,
        },
        _ => WalletAffordance::Hidden,
    };

    match guard.phase(session) {
        SessionPhase::Disconnected if options.offer_connect => WalletAffordance::Connect,
        SessionPhase::Disconnected => WalletAffordance::Hidden,
        SessionPhase::ConnectedWrongChain if options.offer_switch => {
            WalletAffordance::SwitchNetwork
        }
        SessionPhase::ConnectedWrongChain if options.address_needs_required_chain => {
            WalletAffordance::Hidden
        }
        SessionPhase::ConnectedWrongChain | SessionPhase::ConnectedRightChain => address(),
    }
}

/// The landing page's main call to action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeAction {
    ConnectWallet,
    Continue,
}

pub fn home_action(session: &Session) -> HomeAction {
    if session.is_connected() {
        HomeAction::Continue
    } else {
        HomeAction::ConnectWallet
    }
}

/// Minting needs a complete birth form and the wallet on the required chain.
pub fn mint_enabled(session: &Session, guard: &NetworkGuard, form_complete: bool) -> bool {
    form_complete && guard.is_on_required_chain(session)
}
