//! Host boundary for establishing sessions.

use std::sync::Arc;

use crate::errors::StorageError;
use crate::types::SessionGrant;

/// Establishes the auth session described by a grant (cookie issuance in an
/// HTTP host). Route guards call it at most once per decision.
pub trait SessionSink: Send + Sync {
    fn establish(&self, grant: &SessionGrant) -> Result<(), StorageError>;
}

impl<T: SessionSink + ?Sized> SessionSink for Arc<T> {
    fn establish(&self, grant: &SessionGrant) -> Result<(), StorageError> {
        (**self).establish(grant)
    }
}
