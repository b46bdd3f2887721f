//! Seams between the license gate and its host.

pub mod clock;
pub mod session;
pub mod storage;

pub use clock::{Clock, SystemClock};
pub use session::SessionSink;
pub use storage::{IOptionStore, IUserDirectory};
