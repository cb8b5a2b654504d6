#![deny(warnings)]

//! Runtime for the idle commits game.
//!
//! [`Game`] is the explicit context that owns the state, a timer queue of
//! deferred callbacks and the notification outbox. Nothing here reads the
//! clock: every entry point takes the current time in milliseconds, so the
//! same code runs live, under test, and during offline catch-up.

pub mod clock;
mod game;
pub mod notify;
mod offline;
pub mod repository;
mod session;
pub mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use game::{AdvanceReport, Game};
pub use notify::{Notification, Notifier, Severity};
pub use offline::OfflineSummary;
pub use session::{Intent, Session};
pub use timers::{TimerId, TimerKind, TimerQueue};

use idle_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
}
