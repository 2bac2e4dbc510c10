use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Backend-assigned item identifier.
///
/// Opaque to clients. Integer keys from the backend are carried as their
/// decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

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
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => ItemId(id),
            Raw::Number(id) => ItemId(id.to_string()),
        })
    }
}

/// A single todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Order items newest first. Ties on `created_at` fall back to the id,
/// also descending, so the order is total.
pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, secs: i64) -> Item {
        Item {
            id: ItemId::new(id),
            title: format!("title {id}"),
            completed: false,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn sorts_newest_first_with_id_tiebreak() {
        let mut items = vec![item("a", 10), item("c", 30), item("b", 30), item("d", 20)];
        sort_newest_first(&mut items);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn item_id_accepts_text_and_numbers() {
        let text: ItemId = serde_json::from_str(r#""abc-123""#).unwrap();
        assert_eq!(text.as_str(), "abc-123");

        let number: ItemId = serde_json::from_str("42").unwrap();
        assert_eq!(number, ItemId::from("42"));
    }

    #[test]
    fn item_row_deserializes() {
        let row = r#"{"id":7,"title":"Buy milk","completed":true,"created_at":"2024-05-01T10:00:00.123456+00:00"}"#;
        let item: Item = serde_json::from_str(row).unwrap();
        assert_eq!(item.id.as_str(), "7");
        assert_eq!(item.title, "Buy milk");
        assert!(item.completed);
    }
}
