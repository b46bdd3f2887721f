//! Session events for third-party listeners.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::EventDispatcher;
pub use handler::SessionEventHandler;
