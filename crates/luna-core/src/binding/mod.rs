//! License → account binding.
//!
//! ## Components
//! - **resolver** — BindingResolver: indexed lookup and `ensure_user`
//! - **username** — username synthesis and password generation

pub mod resolver;
pub mod username;

pub use resolver::{BindingResolver, EnsureUserOutcome, EnsureUserRequest};
