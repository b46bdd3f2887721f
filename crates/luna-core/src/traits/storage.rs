//! Storage traits.
//!
//! The SQLite implementations live in `luna-storage`; in-memory doubles
//! live in [`test_helpers`]. All traits are object-safe, `Send + Sync`, and
//! have blanket `Arc<T>` impls.

pub mod option_store;
pub mod test_helpers;
pub mod user_directory;

pub use option_store::IOptionStore;
pub use user_directory::IUserDirectory;
