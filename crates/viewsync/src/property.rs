//! Property schema and item accessors.
//!
//! A list view never requires its items to implement a trait. Instead it is
//! handed a [`PropertyItemHandler`]: the ordered property schema plus the
//! accessor closures used to read, compare and serialize item properties.
//!
//! # Example
//!
//! ```
//! use viewsync::property::{Property, PropertyItemHandler, SortMethod};
//!
//! #[derive(Clone)]
//! struct Download {
//!     id: u64,
//!     name: String,
//!     size: u64,
//! }
//!
//! let handler = PropertyItemHandler::new(
//!     vec![
//!         Property::new("name", SortMethod::Text),
//!         Property::new("size", SortMethod::Numeric),
//!     ],
//!     |d: &Download| d.id,
//!     |d, prop| if prop == 1 { d.size as f64 } else { 0.0 },
//!     |d, prop| match prop {
//!         0 => d.name.clone(),
//!         _ => d.size.to_string(),
//!     },
//! );
//!
//! assert_eq!(handler.find_property("size"), Some(1));
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Stable unique identifier of an item.
pub type Token = u64;

/// A set of property ids (indices into the schema).
pub type PropertyIdSet = BTreeSet<usize>;

/// How a property is compared when the view is sorted by it.
///
/// The sort method also decides how the property is serialized: numeric
/// properties as JSON numbers, text properties as strings and custom
/// properties through the handler's custom serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMethod {
    /// Compare the numeric accessor.
    Numeric,
    /// Compare the string accessor, case-insensitively.
    Text,
    /// Compare with the handler's custom comparator.
    Custom,
}

/// One entry of the property schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Name used on the wire.
    pub name: String,
    /// Sort (and serialization) method.
    pub sort_method: SortMethod,
}

impl Property {
    /// Creates a new property.
    pub fn new(name: impl Into<String>, sort_method: SortMethod) -> Self {
        Self {
            name: name.into(),
            sort_method,
        }
    }
}

/// Returns the index of the property with the given name.
pub fn find_property_by_name(name: &str, properties: &[Property]) -> Option<usize> {
    properties.iter().position(|p| p.name == name)
}

/// Returns the set containing every property of the schema.
pub fn all_property_ids(properties: &[Property]) -> PropertyIdSet {
    (0..properties.len()).collect()
}

/// Type alias for the token accessor.
pub type TokenFn<T> = Arc<dyn Fn(&T) -> Token + Send + Sync>;

/// Type alias for the numeric accessor.
pub type NumberFn<T> = Arc<dyn Fn(&T, usize) -> f64 + Send + Sync>;

/// Type alias for the string accessor.
pub type StringFn<T> = Arc<dyn Fn(&T, usize) -> String + Send + Sync>;

/// Type alias for the custom comparator.
pub type CustomSortFn<T> = Arc<dyn Fn(&T, &T, usize) -> Ordering + Send + Sync>;

/// Type alias for the custom serializer.
pub type CustomJsonFn<T> = Arc<dyn Fn(&T, usize) -> Value + Send + Sync>;

/// The capability bundle a list view uses to work with its items.
pub struct PropertyItemHandler<T> {
    /// The ordered property schema.
    pub properties: Vec<Property>,
    token_fn: TokenFn<T>,
    number_fn: NumberFn<T>,
    string_fn: StringFn<T>,
    custom_sort_fn: Option<CustomSortFn<T>>,
    custom_json_fn: Option<CustomJsonFn<T>>,
}

impl<T> Clone for PropertyItemHandler<T> {
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.clone(),
            token_fn: self.token_fn.clone(),
            number_fn: self.number_fn.clone(),
            string_fn: self.string_fn.clone(),
            custom_sort_fn: self.custom_sort_fn.clone(),
            custom_json_fn: self.custom_json_fn.clone(),
        }
    }
}

impl<T> fmt::Debug for PropertyItemHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyItemHandler")
            .field("properties", &self.properties)
            .field("custom_sort", &self.custom_sort_fn.is_some())
            .field("custom_json", &self.custom_json_fn.is_some())
            .finish()
    }
}

impl<T> PropertyItemHandler<T> {
    /// Creates a handler from the schema and the mandatory accessors.
    pub fn new<TF, NF, SF>(properties: Vec<Property>, token_fn: TF, number_fn: NF, string_fn: SF) -> Self
    where
        TF: Fn(&T) -> Token + Send + Sync + 'static,
        NF: Fn(&T, usize) -> f64 + Send + Sync + 'static,
        SF: Fn(&T, usize) -> String + Send + Sync + 'static,
    {
        Self {
            properties,
            token_fn: Arc::new(token_fn),
            number_fn: Arc::new(number_fn),
            string_fn: Arc::new(string_fn),
            custom_sort_fn: None,
            custom_json_fn: None,
        }
    }

    /// Sets the comparator used for [`SortMethod::Custom`] properties.
    ///
    /// Without one, custom properties compare as equal.
    pub fn with_custom_sort<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T, usize) -> Ordering + Send + Sync + 'static,
    {
        self.custom_sort_fn = Some(Arc::new(compare));
        self
    }

    /// Sets the serializer used for [`SortMethod::Custom`] properties.
    ///
    /// Without one, custom properties serialize through the string accessor.
    pub fn with_custom_serializer<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&T, usize) -> Value + Send + Sync + 'static,
    {
        self.custom_json_fn = Some(Arc::new(serialize));
        self
    }

    /// Returns the token of an item.
    pub fn token(&self, item: &T) -> Token {
        (self.token_fn)(item)
    }

    /// Reads a numeric property.
    pub fn number(&self, item: &T, property: usize) -> f64 {
        (self.number_fn)(item, property)
    }

    /// Reads a property as text.
    pub fn string(&self, item: &T, property: usize) -> String {
        (self.string_fn)(item, property)
    }

    /// Returns the index of the property with the given name.
    pub fn find_property(&self, name: &str) -> Option<usize> {
        find_property_by_name(name, &self.properties)
    }

    /// Compares two items by one property in ascending order.
    pub fn compare(&self, a: &T, b: &T, property: usize) -> Ordering {
        let Some(prop) = self.properties.get(property) else {
            return Ordering::Equal;
        };

        match prop.sort_method {
            SortMethod::Numeric => self.number(a, property).total_cmp(&self.number(b, property)),
            SortMethod::Text => compare_ignore_case(&self.string(a, property), &self.string(b, property)),
            SortMethod::Custom => match &self.custom_sort_fn {
                Some(compare) => compare(a, b, property),
                None => Ordering::Equal,
            },
        }
    }

    /// Compares two items by one property in the given direction.
    pub fn compare_directed(&self, a: &T, b: &T, property: usize, ascending: bool) -> Ordering {
        let ordering = self.compare(a, b, property);
        if ascending { ordering } else { ordering.reverse() }
    }

    /// Serializes one property value.
    pub fn serialize_property(&self, item: &T, property: usize) -> Value {
        let Some(prop) = self.properties.get(property) else {
            return Value::Null;
        };

        match prop.sort_method {
            SortMethod::Numeric => number_to_json(self.number(item, property)),
            SortMethod::Text => Value::String(self.string(item, property)),
            SortMethod::Custom => match &self.custom_json_fn {
                Some(serialize) => serialize(item, property),
                None => Value::String(self.string(item, property)),
            },
        }
    }

    /// Serializes the given properties into an object keyed by property name.
    pub fn serialize_properties(&self, item: &T, properties: &PropertyIdSet) -> Map<String, Value> {
        properties
            .iter()
            .filter_map(|&id| {
                let prop = self.properties.get(id)?;
                Some((prop.name.clone(), self.serialize_property(item, id)))
            })
            .collect()
    }
}

/// Case-insensitive string comparison.
fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    let lhs = a.chars().flat_map(char::to_lowercase);
    let rhs = b.chars().flat_map(char::to_lowercase);
    lhs.cmp(rhs)
}

/// Integral values serialize as integers, everything else as floats.
fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone)]
    struct Entry {
        id: u64,
        name: &'static str,
        size: f64,
        rank: i32,
    }

    fn handler() -> PropertyItemHandler<Entry> {
        PropertyItemHandler::new(
            vec![
                Property::new("name", SortMethod::Text),
                Property::new("size", SortMethod::Numeric),
                Property::new("rank", SortMethod::Custom),
            ],
            |e: &Entry| e.id,
            |e, prop| match prop {
                1 => e.size,
                2 => e.rank as f64,
                _ => 0.0,
            },
            |e, prop| match prop {
                0 => e.name.to_string(),
                1 => e.size.to_string(),
                _ => format!("#{}", e.rank),
            },
        )
    }

    fn entry(id: u64, name: &'static str, size: f64, rank: i32) -> Entry {
        Entry { id, name, size, rank }
    }

    #[test]
    fn test_find_property() {
        let handler = handler();
        assert_eq!(handler.find_property("name"), Some(0));
        assert_eq!(handler.find_property("rank"), Some(2));
        assert_eq!(handler.find_property("missing"), None);
        assert_eq!(all_property_ids(&handler.properties).len(), 3);
    }

    #[test]
    fn test_numeric_compare() {
        let handler = handler();
        let (a, b) = (entry(1, "a", 5.0, 0), entry(2, "b", 3.0, 0));
        assert_eq!(handler.compare(&a, &b, 1), Ordering::Greater);
        assert_eq!(handler.compare_directed(&a, &b, 1, false), Ordering::Less);
    }

    #[test]
    fn test_text_compare_ignores_case() {
        let handler = handler();
        let (a, b) = (entry(1, "apple", 0.0, 0), entry(2, "Banana", 0.0, 0));
        assert_eq!(handler.compare(&a, &b, 0), Ordering::Less);

        let (c, d) = (entry(3, "SAME", 0.0, 0), entry(4, "same", 0.0, 0));
        assert_eq!(handler.compare(&c, &d, 0), Ordering::Equal);
    }

    #[test]
    fn test_custom_compare() {
        let (a, b) = (entry(1, "a", 0.0, 9), entry(2, "b", 0.0, 1));
        assert_eq!(handler().compare(&a, &b, 2), Ordering::Equal);

        let handler = handler().with_custom_sort(|x, y, _| x.rank.cmp(&y.rank));
        assert_eq!(handler.compare(&a, &b, 2), Ordering::Greater);
    }

    #[test]
    fn test_serialize_properties() {
        let handler = handler().with_custom_serializer(|e, _| json!({ "rank": e.rank }));
        let item = entry(7, "report.pdf", 1024.0, 3);

        let all = handler.serialize_properties(&item, &all_property_ids(&handler.properties));
        assert_eq!(
            Value::Object(all),
            json!({ "name": "report.pdf", "size": 1024, "rank": { "rank": 3 } })
        );

        let subset: PropertyIdSet = [1].into_iter().collect();
        let partial = handler.serialize_properties(&item, &subset);
        assert_eq!(Value::Object(partial), json!({ "size": 1024 }));
    }

    #[test]
    fn test_fractional_numbers_serialize_as_floats() {
        let handler = handler();
        assert_eq!(handler.serialize_property(&entry(1, "a", 1.5, 0), 1), json!(1.5));
        assert_eq!(handler.serialize_property(&entry(1, "a", 1.5, 0), 9), Value::Null);
    }
}
