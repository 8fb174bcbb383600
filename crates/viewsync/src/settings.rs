//! Settings collector for sort and pagination values.
//!
//! Partial updates merge into the stored snapshot; keys that are not part of
//! an update keep their previous value. Every value starts out unset (`-1`).

/// Value used for settings that were never configured.
pub const UNSET: i32 = -1;

/// The integer-valued view settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Index of the sort property.
    SortProperty,
    /// `1` for ascending, `0` for descending.
    SortAscending,
    /// First list position of the visible window.
    RangeStart,
    /// Maximum number of items in the visible window.
    MaxCount,
}

/// A full settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub sort_property: i32,
    pub sort_ascending: i32,
    pub range_start: i32,
    pub max_count: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sort_property: UNSET,
            sort_ascending: UNSET,
            range_start: UNSET,
            max_count: UNSET,
        }
    }
}

impl Settings {
    /// Reads one value.
    pub fn get(&self, key: SettingKey) -> i32 {
        match key {
            SettingKey::SortProperty => self.sort_property,
            SettingKey::SortAscending => self.sort_ascending,
            SettingKey::RangeStart => self.range_start,
            SettingKey::MaxCount => self.max_count,
        }
    }

    fn set(&mut self, key: SettingKey, value: i32) {
        match key {
            SettingKey::SortProperty => self.sort_property = value,
            SettingKey::SortAscending => self.sort_ascending = value,
            SettingKey::RangeStart => self.range_start = value,
            SettingKey::MaxCount => self.max_count = value,
        }
    }

    /// The configured sort property, if any.
    pub fn sort_property(&self) -> Option<usize> {
        usize::try_from(self.sort_property).ok()
    }

    /// Whether the sort direction is ascending.
    pub fn is_ascending(&self) -> bool {
        self.sort_ascending == 1
    }
}

/// Coalesces setting changes between ticks and tracks whether anything changed.
#[derive(Debug, Clone)]
pub struct SettingsCollector {
    values: Settings,
    changed: bool,
}

impl Default for SettingsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsCollector {
    /// Creates a collector with every value unset and the changed flag raised.
    pub fn new() -> Self {
        Self {
            values: Settings::default(),
            changed: true,
        }
    }

    /// Sets one value and marks the snapshot changed.
    pub fn set(&mut self, key: SettingKey, value: i32) {
        self.changed = true;
        self.values.set(key, value);
    }

    /// Merges several values and marks the snapshot changed.
    pub fn set_many<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (SettingKey, i32)>,
    {
        self.changed = true;
        for (key, value) in values {
            self.values.set(key, value);
        }
    }

    /// Returns the full snapshot and clears the changed flag.
    pub fn get_all(&mut self) -> Settings {
        self.changed = false;
        self.values
    }

    /// Returns the full snapshot without clearing the changed flag.
    pub fn snapshot(&self) -> Settings {
        self.values
    }

    /// Whether anything was set since the last [`get_all`](Self::get_all).
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Unsets every value. The changed flag is left as is.
    pub fn reset(&mut self) {
        self.values = Settings::default();
    }
}
