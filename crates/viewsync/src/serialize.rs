//! Payload types for view pushes and item listings.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::property::{PropertyIdSet, PropertyItemHandler, Token, all_property_ids};

/// One entry of the `items` array.
///
/// Entries without `properties` only report the item's position; the
/// subscriber reuses the properties it already has for that id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemEntry {
    pub id: Token,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl ItemEntry {
    /// An id-only entry.
    pub fn position(id: Token) -> Self {
        Self { id, properties: None }
    }

    /// Whether the entry carries properties.
    pub fn has_properties(&self) -> bool {
        self.properties.is_some()
    }
}

/// The `"<view>_updated"` push payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_offset: Option<i64>,
    pub range_start: usize,
    pub items: Vec<ItemEntry>,
}

/// The `GET <view>/items/<start>/<end>` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemListing {
    pub items: Vec<ItemEntry>,
    pub total_items: usize,
}

/// Serializes an item with every schema property.
pub fn serialize_item<T>(item: &T, handler: &PropertyItemHandler<T>) -> ItemEntry {
    serialize_item_properties(item, handler, &all_property_ids(&handler.properties))
}

/// Serializes an item with the given subset of properties.
pub fn serialize_item_properties<T>(
    item: &T,
    handler: &PropertyItemHandler<T>,
    properties: &PropertyIdSet,
) -> ItemEntry {
    ItemEntry {
        id: handler.token(item),
        properties: Some(handler.serialize_properties(item, properties)),
    }
}

/// Serializes up to `count` items starting at `start`, clamped to the list.
pub fn serialize_from_position<T>(
    start: usize,
    count: usize,
    items: &[T],
    handler: &PropertyItemHandler<T>,
) -> Vec<ItemEntry> {
    items
        .iter()
        .skip(start)
        .take(count)
        .map(|item| serialize_item(item, handler))
        .collect()
}
