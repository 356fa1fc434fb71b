//! Page-level configuration.
//!
//! Hosts may embed `<script id="astrace-config" type="application/json">`
//! with any subset of `SessionConfig` fields. The Polygon RPC endpoint can
//! also be baked in at build time through `ASTRACE_POLYGON_RPC_URL`.

use astrace_session::SessionConfig;
use astrace_types::POLYGON_MAINNET;
use tracing::warn;

use crate::dom;

pub const CONFIG_ELEMENT_ID: &str = "astrace-config";

pub fn load() -> SessionConfig {
    let embedded = dom::by_id(CONFIG_ELEMENT_ID).and_then(|el| el.text_content());
    let mut config = parse(embedded.as_deref());
    apply_rpc_override(&mut config, option_env!("ASTRACE_POLYGON_RPC_URL"));
    config
}

/// Invalid JSON falls back to the defaults rather than blocking the page.
pub fn parse(embedded: Option<&str>) -> SessionConfig {
    match embedded.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => SessionConfig::from_json(raw).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring embedded config");
            SessionConfig::default()
        }),
        None => SessionConfig::default(),
    }
}

pub fn apply_rpc_override(config: &mut SessionConfig, rpc_url: Option<&str>) {
    let Some(url) = rpc_url.map(str::trim).filter(|url| !url.is_empty()) else {
        return;
    };
    if config.required_chain.chain_id == POLYGON_MAINNET {
        config.required_chain.rpc_urls = vec![url.to_owned()];
    }
}
