//! `IOptionStore` — named JSON documents, read and written whole.

use std::sync::Arc;

use serde_json::Value;

use crate::errors::StorageError;

/// Key-value store of JSON documents. The license registry is one document.
///
/// Each `set_option` replaces the document atomically; concurrent writers
/// race and the last one wins.
pub trait IOptionStore: Send + Sync {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StorageError>;
    fn set_option(&self, name: &str, value: &Value) -> Result<(), StorageError>;
}

// ─── Arc blanket impl ───────────────────────────────────────────────

impl<T: IOptionStore + ?Sized> IOptionStore for Arc<T> {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StorageError> {
        (**self).get_option(name)
    }
    fn set_option(&self, name: &str, value: &Value) -> Result<(), StorageError> {
        (**self).set_option(name, value)
    }
}
