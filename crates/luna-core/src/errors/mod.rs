//! Error types, one enum per concern.
//! Every enum implements [`LunaErrorCode`] so REST and HTTP layers can map
//! failures to stable wire codes.

mod admin_error;
mod binding_error;
mod config_error;
pub mod error_code;
mod luna_error;
mod rest_error;
mod storage_error;

pub use admin_error::AdminError;
pub use binding_error::BindingError;
pub use config_error::ConfigError;
pub use error_code::LunaErrorCode;
pub use luna_error::{LunaError, LunaResult};
pub use rest_error::RestError;
pub use storage_error::StorageError;
