//! List view configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use viewsync_core::TimerConfig;

/// Default tick interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;

/// Configuration for a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// View name. Push messages are sent as `"<view_name>_updated"`.
    pub view_name: String,
    /// Interval between two ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Name of the tick thread. Defaults to `"<view_name>-tick"`.
    pub thread_name: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            view_name: "list_view".to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            thread_name: None,
        }
    }
}

impl ViewConfig {
    /// Create a configuration for the named view.
    pub fn with_name(view_name: impl Into<String>) -> Self {
        Self {
            view_name: view_name.into(),
            ..Default::default()
        }
    }

    /// The tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The push event name.
    pub fn update_event(&self) -> String {
        format!("{}_updated", self.view_name)
    }

    /// Timer configuration for the periodic job.
    pub fn timer_config(&self) -> TimerConfig {
        let name = self
            .thread_name
            .clone()
            .unwrap_or_else(|| format!("{}-tick", self.view_name));
        TimerConfig::new(self.tick_interval()).name(name)
    }
}

/// Builder for [`ViewConfig`].
#[derive(Debug, Default)]
pub struct ViewConfigBuilder {
    config: ViewConfig,
}

impl ViewConfigBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the view name.
    pub fn view_name(mut self, name: impl Into<String>) -> Self {
        self.config.view_name = name.into();
        self
    }

    /// Set the tick interval.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the tick thread name.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = Some(name.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> ViewConfig {
        self.config
    }
}
