//! Live list views over changing item collections.
//!
//! A [`ListViewController`] maintains a filtered, sorted and paginated
//! projection of an item set that changes concurrently. Producers report
//! adds, removes and property updates from any thread; the controller
//! coalesces them in a merge queue and a periodic tick applies them, then
//! pushes the minimal diff of the visible window to the subscriber.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::{Value, json};
//! use viewsync::{
//!     ApiRequest, ListViewController, Method, Property, PropertyItemHandler, SortMethod,
//!     Transport, ViewConfig,
//! };
//!
//! #[derive(Clone)]
//! struct Job {
//!     id: u64,
//!     name: String,
//! }
//!
//! struct Printer;
//!
//! impl Transport for Printer {
//!     fn send(&self, event: &str, payload: Value) {
//!         println!("{event}: {payload}");
//!     }
//! }
//!
//! fn main() -> viewsync::Result<()> {
//!     let handler = PropertyItemHandler::new(
//!         vec![Property::new("name", SortMethod::Text)],
//!         |job: &Job| job.id,
//!         |_, _| 0.0,
//!         |job, _| job.name.clone(),
//!     );
//!
//!     let view = ListViewController::new(
//!         ViewConfig::with_name("jobs"),
//!         handler,
//!         Vec::new,
//!         Arc::new(Printer),
//!     )?;
//!
//!     view.handle_request(&ApiRequest::new(Method::Post, &[]).with_body(json!({
//!         "sort_property": "name",
//!         "sort_ascending": true,
//!         "range_start": 0,
//!         "max_count": 25,
//!     })))?;
//!
//!     view.on_item_added(&Job { id: 1, name: "backup".into() });
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod controller;
mod error;
pub mod filter;
pub mod property;
pub mod serialize;
pub mod settings;
pub mod tasks;

pub use api::{ApiRequest, ApiResponse, FilterRequest, Method, SettingsRequest, StatusCode, Transport};
pub use config::{DEFAULT_TICK_INTERVAL_MS, ViewConfig, ViewConfigBuilder};
pub use controller::{ItemListFn, ListViewController};
pub use error::{Result, ViewError};
pub use filter::{PropertyFilter, StringMatchMethod};
pub use property::{Property, PropertyIdSet, PropertyItemHandler, SortMethod, Token};
pub use serialize::{ItemEntry, ItemListing, ViewUpdate};
pub use settings::{SettingKey, Settings, SettingsCollector};
pub use tasks::{MergeQueue, MergeTask, TaskKind};
