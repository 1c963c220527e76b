//! Browser `localStorage` store for WASM.

use super::{KeyValueStore, StoreError, StoreResult};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, Storage};

/// DOMException code browsers use for quota errors.
const QUOTA_EXCEEDED_CODE: u16 = 22;

/// Key/value store over `window.localStorage`.
pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    /// Open the window's local storage.
    pub fn new() -> StoreResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StoreError::Unavailable("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

fn map_js_error(err: JsValue) -> StoreError {
    if let Some(exception) = err.dyn_ref::<DomException>() {
        if exception.name() == "QuotaExceededError" || exception.code() == QUOTA_EXCEEDED_CODE {
            return StoreError::QuotaExceeded;
        }
        return StoreError::Other(exception.message());
    }
    StoreError::Other(format!("{:?}", err))
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.storage.get_item(key).map_err(map_js_error)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.storage.set_item(key, value).map_err(map_js_error)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.storage.remove_item(key).map_err(map_js_error)
    }
}
