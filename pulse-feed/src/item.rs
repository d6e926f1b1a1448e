//! Listing records as delivered by the paginated endpoints.
//!
//! Only the id, the rank and the container discriminator matter to
//! pagination and grouping. Every other field the server sends is kept
//! verbatim in [`ResultItem::fields`] so renderers can still reach it.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stable unique identifier of a listing record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One theme, context or post record reduced to what the feed needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireItem")]
pub struct ResultItem {
    /// Stable identifier. Mongo-style `_id` is accepted on the wire; when
    /// both are sent, `id` wins.
    pub id: ItemId,
    /// Rank used for ordering display entries. Missing or `null` means `0`.
    pub display_order: f64,
    /// Discriminator selecting the grouping rule.
    pub container_type: String,
    /// Remaining display fields, opaque to the feed.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResultItem {
    /// Creates an item without extra display fields.
    pub fn new(
        id: impl Into<ItemId>,
        display_order: impl Into<f64>,
        container_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_order: display_order.into(),
            container_type: container_type.into(),
            fields: Map::new(),
        }
    }

    /// Returns whether this item belongs to the 3-up grouped layout.
    pub fn is_grouped(&self, grouped_type: &str) -> bool {
        self.container_type == grouped_type
    }

    /// Returns a display field as a string, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Best effort human readable title for terminal output.
    pub fn title(&self) -> &str {
        ["title", "name", "heading", "slug"]
            .iter()
            .find_map(|name| self.field_str(name))
            .unwrap_or_else(|| self.id.as_str())
    }
}

/// Record as it appears on the wire, before the id is resolved.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    #[serde(default)]
    id: Option<ItemId>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<ItemId>,
    #[serde(default, deserialize_with = "nullable_order")]
    display_order: f64,
    #[serde(default)]
    container_type: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl TryFrom<WireItem> for ResultItem {
    type Error = String;

    fn try_from(wire: WireItem) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or(wire.mongo_id)
            .ok_or_else(|| "record has neither `id` nor `_id`".to_owned())?;
        Ok(Self {
            id,
            display_order: wire.display_order,
            container_type: wire.container_type.unwrap_or_default(),
            fields: wire.fields,
        })
    }
}

fn nullable_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mongo_id_and_defaults() {
        let item: ResultItem =
            serde_json::from_str(r#"{"_id":"abc","containerType":"Type-One","title":"Rates"}"#)
                .expect("valid item");
        assert_eq!(item.id, ItemId::from("abc"));
        assert_eq!(item.display_order, 0.0);
        assert!(item.is_grouped("Type-One"));
        assert_eq!(item.title(), "Rates");
    }

    #[test]
    fn keeps_unknown_fields() {
        let item: ResultItem = serde_json::from_str(
            r#"{"id":"p1","displayOrder":4,"containerType":"Type-Two","sector":"banking"}"#,
        )
        .expect("valid item");
        assert_eq!(item.display_order, 4.0);
        assert_eq!(item.field_str("sector"), Some("banking"));
        assert!(!item.is_grouped("Type-One"));
        assert_eq!(item.title(), "p1");
    }

    #[test]
    fn fractional_and_null_orders_decode() {
        let item: ResultItem =
            serde_json::from_str(r#"{"id":"a","displayOrder":1.5,"containerType":"Type-One"}"#)
                .expect("fractional order");
        assert_eq!(item.display_order, 1.5);

        let item: ResultItem =
            serde_json::from_str(r#"{"id":"b","displayOrder":null,"containerType":null}"#)
                .expect("null order");
        assert_eq!(item.display_order, 0.0);
        assert_eq!(item.container_type, "");
    }

    #[test]
    fn plain_id_wins_over_mongo_id() {
        let item: ResultItem =
            serde_json::from_str(r#"{"_id":"oid-1","id":"a","containerType":"Type-One"}"#)
                .expect("both ids");
        assert_eq!(item.id, ItemId::from("a"));
        assert!(!item.fields.contains_key("_id"));

        let err = serde_json::from_str::<ResultItem>(r#"{"containerType":"Type-One"}"#)
            .expect_err("no id");
        assert!(err.to_string().contains("neither `id` nor `_id`"));
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(ResultItem::new("a", 2, "Type-One")).expect("serializable");
        assert_eq!(value["id"], "a");
        assert_eq!(value["displayOrder"], 2.0);
        assert_eq!(value["containerType"], "Type-One");
    }
}
