use super::{AdminError, BindingError, ConfigError, LunaErrorCode, RestError, StorageError};

/// Top-level error type for the license gate.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum LunaError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("rest error: {0}")]
    Rest(#[from] RestError),

    #[error("admin error: {0}")]
    Admin(#[from] AdminError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl LunaErrorCode for LunaError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            Self::Binding(e) => e.error_code(),
            Self::Rest(e) => e.error_code(),
            Self::Admin(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
        }
    }
}

/// Convenience type alias.
pub type LunaResult<T> = Result<T, LunaError>;
