use anyhow::{Result, anyhow};
use astrace_storage::KeyValueStore;

/// `window.localStorage`. Private browsing modes can deny access, in which
/// case reads come back empty and writes are dropped.
#[derive(Debug, Clone)]
pub struct BrowserStore {
    storage: Option<web_sys::Storage>,
}

impl BrowserStore {
    pub fn local() -> Self {
        let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("localStorage unavailable; wallet connection will not persist");
        }
        Self { storage }
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        storage
            .get_item(key)
            .map_err(|err| anyhow!("localStorage read of {key} failed: {err:?}"))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        storage
            .set_item(key, value)
            .map_err(|err| anyhow!("localStorage write of {key} failed: {err:?}"))
    }
}
