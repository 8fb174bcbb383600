//! Core systems for viewsync.
//!
//! This crate provides the ambient runtime pieces shared by the list-view
//! synchronizer:
//!
//! - **Errors**: [`CoreError`] and its [`Result`] alias
//! - **Logging**: tracing targets, span names and [`PerfSpan`] guards
//! - **Timers**: [`RepeatingTimer`], a cancellable single-flight repeating job
//!   with an explicit stop-and-join

mod error;
pub mod logging;
pub mod timer;

pub use error::{CoreError, Result, TimerError};
pub use logging::PerfSpan;
pub use timer::{RepeatingTimer, TimerConfig};
