//! Live list view controller.
//!
//! `ListViewController` keeps a filtered, sorted projection (the canonical
//! list) over a changing item collection and periodically pushes the minimal
//! diff of the client-visible window.
//!
//! Producers report changes through [`on_item_added`](ListViewController::on_item_added),
//! [`on_item_removed`](ListViewController::on_item_removed) and
//! [`on_item_updated`](ListViewController::on_item_updated). These only touch
//! the merge queue; the canonical list is patched by the periodic tick.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use viewsync::{ListViewController, ViewConfig, ApiRequest, Method};
//!
//! let view = ListViewController::new(
//!     ViewConfig::with_name("queue_view"),
//!     handler,
//!     move || store.all_items(),
//!     transport,
//! )?;
//!
//! // First settings request activates the view and starts the tick timer
//! view.handle_request(&ApiRequest::new(Method::Post, &[]).with_body(json!({
//!     "sort_property": "name",
//!     "sort_ascending": true,
//!     "range_start": 0,
//!     "max_count": 50,
//! })))?;
//!
//! // Producers report changes from any thread
//! view.on_item_added(&item);
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};
use serde_json::json;
use viewsync_core::logging::{span_names, targets};
use viewsync_core::{PerfSpan, RepeatingTimer};

use crate::api::{ApiRequest, ApiResponse, FilterRequest, Method, SettingsRequest, Transport};
use crate::config::ViewConfig;
use crate::error::{Result, ViewError};
use crate::filter::{FilterPreparation, PropertyFilter, StringMatchMethod};
use crate::property::{PropertyIdSet, PropertyItemHandler, Token};
use crate::serialize::{
    ItemEntry, ItemListing, ViewUpdate, serialize_from_position, serialize_item,
    serialize_item_properties,
};
use crate::settings::{SettingKey, Settings, SettingsCollector};
use crate::tasks::{MergeQueue, TaskKind};

/// Type alias for the function enumerating every current item, unfiltered.
pub type ItemListFn<T> = Arc<dyn Fn() -> Vec<T> + Send + Sync>;

/// State guarded by the view lock.
struct ViewState<T> {
    /// Every item passing the filter, sorted once a tick has run.
    all_items: Vec<T>,
    /// The window sent by the last completed tick.
    view_items: Vec<T>,
    /// Settings used by the last completed tick.
    prev_settings: Settings,
    /// Total item count reported by the last completed tick.
    prev_total: Option<usize>,
    /// Set by list rebuilds; forces a full sort on the next tick.
    list_changed: bool,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            all_items: Vec::new(),
            view_items: Vec::new(),
            prev_settings: Settings::default(),
            prev_total: None,
            list_changed: false,
        }
    }
}

/// Shared between the controller handle and the tick timer.
struct ViewInner<T> {
    config: ViewConfig,
    update_event: String,
    handler: PropertyItemHandler<T>,
    item_list: ItemListFn<T>,
    transport: Arc<dyn Transport>,
    filter: RwLock<PropertyFilter>,
    tasks: MergeQueue<T>,
    settings: Mutex<SettingsCollector>,
    state: RwLock<ViewState<T>>,
    /// Serializes ticks, whether fired by the timer or run directly.
    /// Re-entrant so a transport can stop the view from inside `send`.
    tick_lock: ReentrantMutex<()>,
    active: AtomicBool,
    paused: AtomicBool,
}

/// A live, filtered, sorted and paginated view over a changing item set.
pub struct ListViewController<T: Clone + Send + Sync + 'static> {
    inner: Arc<ViewInner<T>>,
    timer: RepeatingTimer,
}

impl<T: Clone + Send + Sync + 'static> ListViewController<T> {
    /// Creates an inactive view.
    ///
    /// `item_list` must return the full, unfiltered item set; it is called
    /// whenever the canonical list is rebuilt.
    pub fn new<F>(
        config: ViewConfig,
        handler: PropertyItemHandler<T>,
        item_list: F,
        transport: Arc<dyn Transport>,
    ) -> Result<Self>
    where
        F: Fn() -> Vec<T> + Send + Sync + 'static,
    {
        let filter = PropertyFilter::new(handler.properties.clone());
        let timer_config = config.timer_config();

        let inner = Arc::new(ViewInner {
            update_event: config.update_event(),
            config,
            handler,
            item_list: Arc::new(item_list),
            transport,
            filter: RwLock::new(filter),
            tasks: MergeQueue::new(),
            settings: Mutex::new(SettingsCollector::new()),
            state: RwLock::new(ViewState::default()),
            tick_lock: ReentrantMutex::new(()),
            active: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        });

        let weak: Weak<ViewInner<T>> = Arc::downgrade(&inner);
        let timer = RepeatingTimer::new(timer_config, move || {
            if let Some(inner) = weak.upgrade() {
                inner.run_tasks();
            }
        })?;

        Ok(Self { inner, timer })
    }

    /// The view name.
    pub fn view_name(&self) -> &str {
        &self.inner.config.view_name
    }

    /// Whether the view has been activated by a settings request.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Whether the subscriber paused the periodic updates.
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Whether the tick timer is currently running.
    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Number of items in the canonical list.
    pub fn total_count(&self) -> usize {
        self.inner.state.read().all_items.len()
    }

    /// Number of tokens with a pending change.
    pub fn pending_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Tokens of the canonical list, in list order.
    pub fn canonical_tokens(&self) -> Vec<Token> {
        let state = self.inner.state.read();
        state.all_items.iter().map(|i| self.inner.handler.token(i)).collect()
    }

    /// Tokens of the last pushed window, in window order.
    pub fn visible_tokens(&self) -> Vec<Token> {
        let state = self.inner.state.read();
        state.view_items.iter().map(|i| self.inner.handler.token(i)).collect()
    }

    // ---- Notifications ----

    /// Reports a new item. Queued if it passes the filter.
    pub fn on_item_added(&self, item: &T) {
        self.inner.on_item_added(item);
    }

    /// Reports a removed item. Queued only if the item is listed.
    pub fn on_item_removed(&self, item: &T) {
        self.inner.on_item_removed(item);
    }

    /// Reports changed properties of an item.
    pub fn on_item_updated(&self, item: &T, updated_properties: &PropertyIdSet) {
        self.inner.on_item_updated(item, updated_properties);
    }

    /// Reports the same changed properties for several items.
    pub fn on_items_updated(&self, items: &[T], updated_properties: &PropertyIdSet) {
        if !self.is_active() {
            return;
        }

        for item in items {
            self.inner.on_item_updated(item, updated_properties);
        }
    }

    /// The transport lost its session; tears the view down.
    pub fn on_session_disconnected(&self) {
        tracing::debug!(target: targets::CONTROLLER, view = %self.view_name(), "session disconnected");
        self.stop();
    }

    // ---- Filter ----

    /// Replaces the filter and rebuilds the canonical list.
    pub fn set_filter(&self, pattern: &str, method: StringMatchMethod, property: Option<usize>) {
        {
            let mut filter = self.inner.filter.write();
            filter.set_method(method);
            filter.set_property(property);
            filter.set_text(pattern);
        }

        self.inner.rebuild_list();
    }

    /// Clears the filter and rebuilds the canonical list.
    pub fn reset_filter(&self) {
        self.inner.filter.write().clear();
        self.inner.rebuild_list();
    }

    // ---- Settings & lifecycle ----

    /// Validates and applies a settings request.
    ///
    /// The first call activates the view: the canonical list is built and the
    /// tick timer starts unless the request pauses it.
    pub fn apply_settings(&self, request: &SettingsRequest) -> Result<()> {
        let mut updates = Vec::new();

        if let Some(start) = request.range_start {
            if start < 0 {
                return Err(ViewError::NegativeRangeStart(start));
            }
            updates.push((SettingKey::RangeStart, saturate(start)));
        }

        if let Some(max_count) = request.max_count {
            updates.push((SettingKey::MaxCount, saturate(max_count)));
        }

        if let Some(name) = &request.sort_property {
            let property = self
                .inner
                .handler
                .find_property(name)
                .ok_or_else(|| ViewError::InvalidSortProperty(name.clone()))?;
            updates.push((SettingKey::SortProperty, saturate(property as i64)));
        }

        if let Some(ascending) = request.sort_ascending {
            updates.push((SettingKey::SortAscending, i32::from(ascending)));
        }

        let resumed = match request.paused {
            Some(paused) => self.set_paused(paused)?,
            None => false,
        };

        if !updates.is_empty() {
            self.inner.settings.lock().set_many(updates);
        }

        // Changes held back while paused go out now, not one interval later
        if resumed {
            self.inner.run_tasks();
        }

        if !self.inner.active.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: targets::CONTROLLER, view = %self.view_name(), "view activated");
            self.inner.rebuild_list();
            if !self.is_paused() {
                self.timer.start()?;
            }
        }

        Ok(())
    }

    /// Returns whether the timer was restarted.
    fn set_paused(&self, paused: bool) -> Result<bool> {
        self.inner.paused.store(paused, Ordering::Release);
        if !self.is_active() {
            return Ok(false);
        }

        if paused && self.timer.is_running() {
            self.timer.stop(false);
        } else if !paused && !self.timer.is_running() {
            return Ok(self.timer.start()?);
        }
        Ok(false)
    }

    /// Clears the lists and the queue, moves the window back to the first
    /// item and rebuilds from the item source.
    pub fn reset_items(&self) {
        self.inner.clear_items();
        self.inner.settings.lock().set(SettingKey::RangeStart, 0);
        self.inner.rebuild_list();
    }

    /// Deactivates the view: stops the timer, waits for an in-flight tick
    /// (timer or [`tick`](Self::tick) caller) to finish its push, then clears
    /// the queue, the lists, the settings and the filter.
    ///
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        let was_active = self.inner.active.swap(false, Ordering::AcqRel);
        self.timer.stop(true);
        let _fence = self.inner.tick_lock.lock();

        self.inner.clear_items();
        self.inner.settings.lock().reset();
        self.inner.paused.store(false, Ordering::Release);
        self.inner.filter.write().clear();

        if was_active {
            tracing::debug!(target: targets::CONTROLLER, view = %self.view_name(), "view stopped");
        }
    }

    /// Runs one recomputation immediately and returns the pushed update.
    ///
    /// Returns `None` when nothing was sent. Ticks never run concurrently,
    /// whether started here or by the timer.
    pub fn tick(&self) -> Option<ViewUpdate> {
        self.inner.run_tasks()
    }

    // ---- Requests ----

    /// Returns up to `end - start` fully serialized items of the canonical
    /// list, starting at `start`.
    pub fn items(&self, start: usize, end: usize) -> Result<ItemListing> {
        if end < start {
            return Err(ViewError::InvalidRange { start, end });
        }

        let (slice, total_items) = {
            let state = self.inner.state.read();
            let total = state.all_items.len();
            let from = start.min(total);
            let to = end.min(total);
            (state.all_items[from..to].to_vec(), total)
        };

        Ok(ItemListing {
            items: serialize_from_position(0, slice.len(), &slice, &self.inner.handler),
            total_items,
        })
    }

    /// Dispatches a request addressed to this view.
    pub fn handle_request(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let path: Vec<&str> = request.path.iter().map(String::as_str).collect();
        let result = match (request.method, path.as_slice()) {
            (Method::Post, ["filter"]) => self.handle_post_filter(request),
            (Method::Delete, ["filter"]) => {
                self.reset_filter();
                Ok(ApiResponse::ok())
            }
            (Method::Post, []) => {
                let body: SettingsRequest = parse_body(request)?;
                self.apply_settings(&body)?;
                Ok(ApiResponse::no_content())
            }
            (Method::Delete, []) => {
                self.stop();
                Ok(ApiResponse::no_content())
            }
            (Method::Get, ["items", start, end]) => match (start.parse::<usize>(), end.parse::<usize>()) {
                (Ok(start), Ok(end)) => {
                    let listing = self.items(start, end)?;
                    Ok(ApiResponse::json(serde_json::to_value(listing)?))
                }
                _ => Err(ViewError::unknown_route(request.method, &request.path)),
            },
            _ => Err(ViewError::unknown_route(request.method, &request.path)),
        };

        if let Err(err) = &result {
            tracing::debug!(
                target: targets::CONTROLLER,
                view = %self.view_name(),
                method = %request.method,
                path = %request.path.join("/"),
                %err,
                "request rejected"
            );
        }
        result
    }

    fn handle_post_filter(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let body: FilterRequest = parse_body(request)?;
        if body.pattern.is_empty() {
            self.reset_filter();
            return Ok(ApiResponse::no_content());
        }

        let method = StringMatchMethod::try_from(body.method)?;
        let property = match &body.property {
            Some(name) => Some(
                self.inner
                    .handler
                    .find_property(name)
                    .ok_or_else(|| ViewError::InvalidFilterProperty(name.clone()))?,
            ),
            None => None,
        };

        self.set_filter(&body.pattern, method, property);
        Ok(ApiResponse::no_content())
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for ListViewController<T> {
    fn drop(&mut self) {
        self.inner.active.store(false, Ordering::Release);
        self.timer.stop(true);
        drop(self.inner.tick_lock.lock());
    }
}

/// Decodes a request body; a missing body counts as an empty object.
fn parse_body<B: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<B> {
    let body = if request.body.is_null() {
        json!({})
    } else {
        request.body.clone()
    };
    Ok(serde_json::from_value(body)?)
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl<T: Clone + Send + Sync + 'static> ViewInner<T> {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn matches_filter(&self, filter: &PropertyFilter, prep: &FilterPreparation, item: &T) -> bool {
        filter.matches(
            prep,
            |property| self.handler.number(item, property),
            |property| self.handler.string(item, property),
        )
    }

    fn passes_filter(&self, item: &T) -> bool {
        let filter = self.filter.read();
        let prep = filter.prepare();
        self.matches_filter(&filter, &prep, item)
    }

    fn is_listed(&self, token: Token) -> bool {
        let state = self.state.read();
        state.all_items.iter().any(|i| self.handler.token(i) == token)
    }

    fn on_item_added(&self, item: &T) {
        if !self.is_active() || !self.passes_filter(item) {
            return;
        }

        self.tasks.add_item(self.handler.token(item), item.clone());
    }

    fn on_item_removed(&self, item: &T) {
        if !self.is_active() {
            return;
        }

        let token = self.handler.token(item);
        if self.is_listed(token) {
            self.tasks.remove_item(token, item.clone());
        }
    }

    fn on_item_updated(&self, item: &T, updated_properties: &PropertyIdSet) {
        if !self.is_active() {
            return;
        }

        let token = self.handler.token(item);
        let listed = self.is_listed(token);

        if !self.passes_filter(item) {
            if listed {
                self.tasks.remove_item(token, item.clone());
            }
            return;
        }

        if !listed {
            self.tasks.add_item(token, item.clone());
            return;
        }

        self.tasks.update_item(token, item.clone(), updated_properties.clone());
    }

    /// Rebuilds the canonical list from the item source with the current filter.
    ///
    /// Inactive views keep an empty list; activation rebuilds it.
    fn rebuild_list(&self) {
        if !self.is_active() {
            return;
        }

        let _perf = PerfSpan::for_view(span_names::REBUILD, &self.config.view_name);

        let items: Vec<T> = {
            let filter = self.filter.read();
            let prep = filter.prepare();
            (self.item_list)()
                .into_iter()
                .filter(|item| self.matches_filter(&filter, &prep, item))
                .collect()
        };

        tracing::debug!(target: targets::CONTROLLER, view = %self.config.view_name, count = items.len(), "canonical list rebuilt");

        let mut state = self.state.write();
        state.all_items = items;
        state.view_items.clear();
        state.list_changed = true;
    }

    fn clear_items(&self) {
        self.tasks.clear();

        let mut state = self.state.write();
        state.all_items.clear();
        state.view_items.clear();
        state.prev_total = None;
        state.prev_settings = Settings::default();
    }

    /// One tick. Returns the update that was pushed, if any.
    fn run_tasks(&self) -> Option<ViewUpdate> {
        let _tick = self.tick_lock.lock();
        if !self.is_active() {
            return None;
        }

        let list_changed = self.state.read().list_changed;
        if self.tasks.is_empty() && !self.settings.lock().has_changed() && !list_changed {
            return None;
        }

        let _perf = PerfSpan::for_view(span_names::TICK, &self.config.view_name);

        // Nothing is drained until the view is configured, so queued changes
        // are kept for the first tick that can apply them.
        let (settings, sort_property) = {
            let mut collector = self.settings.lock();
            let snapshot = collector.snapshot();
            let Some(sort_property) = snapshot.sort_property() else {
                tracing::trace!(target: targets::TICK, view = %self.config.view_name, "sort property not set");
                return None;
            };
            if snapshot.range_start < 0 {
                tracing::trace!(target: targets::TICK, view = %self.config.view_name, "range start not set");
                return None;
            }
            (collector.get_all(), sort_property)
        };

        let (tasks, updated_properties) = self.tasks.drain();
        let ascending = settings.is_ascending();
        let handler = &self.handler;

        let mut guard = self.state.write();
        let state = &mut *guard;

        let positions: HashMap<Token, usize> = state
            .all_items
            .iter()
            .enumerate()
            .map(|(pos, item)| (handler.token(item), pos))
            .collect();

        // Refresh listed items first so a re-sort sees the new values.
        let mut updated_items: HashMap<Token, PropertyIdSet> = HashMap::new();
        for (token, pending) in &tasks {
            if pending.task.kind != TaskKind::Update {
                continue;
            }
            if let Some(&pos) = positions.get(token) {
                state.all_items[pos] = pending.item.clone();
            }
            updated_items.insert(*token, pending.task.updated_properties.clone());
        }
        let mut listed: HashSet<Token> = positions.into_keys().collect();

        let need_sort = updated_properties.contains(&sort_property)
            || state.prev_settings.sort_ascending != settings.sort_ascending
            || state.prev_settings.sort_property != settings.sort_property
            || state.list_changed;

        if need_sort {
            state
                .all_items
                .sort_by(|a, b| handler.compare_directed(a, b, sort_property, ascending));
        }
        state.list_changed = false;

        let mut range_start = i64::from(settings.range_start);
        for (token, pending) in tasks {
            match pending.task.kind {
                TaskKind::Add => {
                    if !listed.insert(token) {
                        tracing::trace!(target: targets::TICK, token, "item already listed");
                        continue;
                    }
                    self.insert_item(&mut state.all_items, pending.item, sort_property, ascending, &mut range_start)
                }
                TaskKind::Remove => {
                    if listed.remove(&token) {
                        self.remove_item(&mut state.all_items, token, &mut range_start);
                    }
                }
                TaskKind::Update => {}
            }
        }

        let total = state.all_items.len();
        if range_start >= total as i64 {
            range_start = 0;
        }

        let count = (total as i64 - range_start).min(i64::from(settings.max_count));
        if count < 0 {
            tracing::trace!(target: targets::TICK, view = %self.config.view_name, count, "empty window");
            return None;
        }

        let start = range_start as usize;
        let new_view = state.all_items[start..start + count as usize].to_vec();

        // Serialization only needs read access; let request handlers in.
        let guard = RwLockWriteGuard::downgrade_to_upgradable(guard);
        let previous: HashSet<Token> = guard.view_items.iter().map(|i| handler.token(i)).collect();

        let items: Vec<ItemEntry> = new_view
            .iter()
            .map(|item| {
                let token = handler.token(item);
                if !previous.contains(&token) {
                    serialize_item(item, handler)
                } else if let Some(properties) = updated_items.get(&token) {
                    serialize_item_properties(item, handler, properties)
                } else {
                    ItemEntry::position(token)
                }
            })
            .collect();

        let offset = range_start - i64::from(settings.range_start);
        let update = ViewUpdate {
            total_items: (guard.prev_total != Some(total)).then_some(total),
            range_offset: (offset != 0).then_some(offset),
            range_start: start,
            items,
        };

        {
            let mut state = RwLockUpgradableReadGuard::upgrade(guard);
            state.view_items = new_view;
            state.prev_settings = settings;
            state.prev_total = Some(total);
        }

        tracing::trace!(
            target: targets::TICK,
            view = %self.config.view_name,
            total,
            range_start = start,
            items = update.items.len(),
            sorted = need_sort,
            "view updated"
        );

        match serde_json::to_value(&update) {
            Ok(payload) => self.transport.send(&self.update_event, payload),
            Err(err) => {
                tracing::warn!(target: targets::TICK, view = %self.config.view_name, %err, "failed to encode view update");
            }
        }

        Some(update)
    }

    /// Inserts an unlisted item at its sorted position.
    fn insert_item(&self, items: &mut Vec<T>, item: T, sort_property: usize, ascending: bool, range_start: &mut i64) {
        let pos = items.partition_point(|existing| {
            self.handler.compare_directed(existing, &item, sort_property, ascending) == CmpOrdering::Less
        });
        items.insert(pos, item);

        if (pos as i64) < *range_start {
            *range_start += 1;
        }
    }

    /// Removes a listed item by token. The position lookup is a linear scan.
    fn remove_item(&self, items: &mut Vec<T>, token: Token, range_start: &mut i64) {
        let Some(pos) = items.iter().position(|i| self.handler.token(i) == token) else {
            return;
        };
        items.remove(pos);

        if (pos as i64) < *range_start {
            *range_start -= 1;
        }
    }
}
