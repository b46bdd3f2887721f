//! Session Reconciliation Engine.
//!
//! A decision table evaluated fresh for every request. Nothing here performs
//! the session side effect itself: decisions carry a [`SessionGrant`] that the
//! route guards apply.
//!
//! ## Rules
//! 1. legacy key scrub
//! 2. console bootstrap (anonymous console request with a license)
//! 3. console protection
//! 4. post-login redirect
//! 5. login-screen bounce for signed-in clients
//! 6. logout
//!
//! [`SessionGrant`]: crate::types::SessionGrant

mod console;
mod engine;
mod login;

pub use engine::ReconciliationEngine;
