use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Key under which the front-end remembers that the user opted into a
/// wallet connection.
pub const DEFAULT_FLAG_KEY: &str = "isBrowserWalletConnected";

/// String key/value persistence that survives page reloads.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Shared-handle store. Clones see the same entries, which lets a test keep
/// a handle while the store under test owns another.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// The persisted "wallet was connected" flag, stored as `"true"`/`"false"`.
pub struct ConnectionFlag<S> {
    store: S,
    key: String,
}

impl<S> ConnectionFlag<S>
where
    S: KeyValueStore,
{
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Anything but the exact string `"true"` reads as unset.
    pub fn load(&self) -> Result<bool> {
        Ok(self.store.get(&self.key)?.as_deref() == Some("true"))
    }

    pub fn store(&self, connected: bool) -> Result<()> {
        let value = if connected { "true" } else { "false" };
        self.store.set(&self.key, value)
    }
}
