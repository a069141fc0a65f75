// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod bot;
pub mod checker;
pub mod config;
pub mod detect;
pub mod extract;
pub mod notify;
pub mod source;
pub mod state;
pub mod subscribers;

// ---- Re-exports for stable public API ----
pub use crate::checker::{CheckGate, Checker, RunKind};
pub use crate::extract::Notice;
pub use crate::notify::{Notifier, Transport};
pub use crate::source::NoticeSource;
