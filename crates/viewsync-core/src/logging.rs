//! Logging facilities for viewsync.
//!
//! viewsync uses the `tracing` crate for instrumentation. To see logs, install
//! a subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("viewsync=debug")
//!     .init();
//! ```
//!
//! Every subsystem logs under one of the [`targets`] so that the tick loop can
//! be silenced independently from lifecycle events.

/// Span names used throughout viewsync for tracing.
pub mod span_names {
    /// One recomputation of a list view.
    pub const TICK: &str = "viewsync::tick";
    /// A full rebuild of the canonical list.
    pub const REBUILD: &str = "viewsync::rebuild";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Repeating timer target.
    pub const TIMER: &str = "viewsync_core::timer";
    /// View controller lifecycle and requests.
    pub const CONTROLLER: &str = "viewsync::controller";
    /// Per-tick recomputation.
    pub const TICK: &str = "viewsync::tick";
    /// Filter evaluation.
    pub const FILTER: &str = "viewsync::filter";
    /// Performance spans.
    pub const PERF: &str = "viewsync::perf";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// Used to time ticks and list rebuilds.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a performance span tagged with the view it belongs to.
    ///
    /// The span will be active until the guard is dropped.
    pub fn for_view(name: &'static str, view: &str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name, view);
        Self {
            span: span.entered(),
        }
    }
}
