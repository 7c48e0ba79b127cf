//! Catalog records and the authoritative [`CatalogStore`] collaborator.
//!
//! The catalog store is the single source of truth for what a caller may see:
//! the search pipeline only ever returns records loaded from here.
//!
//! Stores are `Send + Sync` and do blocking I/O; async callers dispatch to
//! them through `tokio::task::spawn_blocking`.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Store-assigned record identifier. Always positive once assigned.
pub type RecordId = i64;

/// Binary image attached to a record at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// Original file name, e.g. `"mouse.png"`.
    pub name: String,
    /// MIME type, e.g. `"image/png"`.
    pub content_type: String,
    /// Raw bytes; base64 in JSON.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One catalog entry.
///
/// `id` is `None` until the store assigns one on first save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
}

impl CatalogRecord {
    /// Check the field rules enforced before any save.
    ///
    /// Returns every violated rule, joined with `"; "`.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if self.category.trim().is_empty() {
            problems.push("category is required".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            problems.push(format!("price must be a non-negative number, got {}", self.price));
        }
        if let Some(id) = self.id {
            if id <= 0 {
                problems.push(format!("id must be positive, got {id}"));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

/// Authoritative record storage.
pub trait CatalogStore: Send + Sync {
    /// Short backend name for logs (e.g. `"sqlite"`).
    fn backend(&self) -> &str;

    /// Insert (no `id`) or replace (with `id`) a record; returns the stored
    /// version carrying its assigned identifier.
    fn save(&self, record: CatalogRecord) -> Result<CatalogRecord, AppError>;

    fn find_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, AppError>;

    /// Batched lookup. Unknown identifiers are skipped; result order is
    /// ascending by identifier.
    fn find_all_by_id(&self, ids: &[RecordId]) -> Result<Vec<CatalogRecord>, AppError>;

    /// Every record, ascending by identifier.
    fn find_all(&self) -> Result<Vec<CatalogRecord>, AppError>;

    /// Returns `true` when a record was removed.
    fn delete_by_id(&self, id: RecordId) -> Result<bool, AppError>;
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn record(name: &str, category: &str, price: f64) -> CatalogRecord {
        CatalogRecord {
            id: None,
            name: name.to_string(),
            description: format!("{name} for everyday use"),
            brand: "Acme".to_string(),
            category: category.to_string(),
            price,
            release_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            available: true,
            stock_quantity: 10,
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn valid_record_passes() {
        assert!(record("Wireless Mouse", "Electronics", 19.99).validate().is_ok());
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut r = record("  ", "", -1.0);
        r.id = Some(0);
        let msg = r.validate().unwrap_err();
        assert!(msg.contains("name is required"));
        assert!(msg.contains("category is required"));
        assert!(msg.contains("price must be a non-negative number"));
        assert!(msg.contains("id must be positive"));
    }

    #[test]
    fn nan_price_is_invalid() {
        assert!(record("Lamp", "Home", f64::NAN).validate().is_err());
    }

    #[test]
    fn json_uses_camel_case_and_base64_image() {
        let mut r = record("Lamp", "Home", 12.5);
        r.image = Some(ImagePayload {
            name: "lamp.png".into(),
            content_type: "image/png".into(),
            data: vec![0x89, b'P', b'N', b'G'],
        });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["releaseDate"], "2024-03-15");
        assert_eq!(json["stockQuantity"], 10);
        assert_eq!(json["image"]["contentType"], "image/png");
        assert_eq!(json["image"]["data"], "iVBORw==");
        assert!(json.get("id").is_none());

        let back: CatalogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let r: CatalogRecord = serde_json::from_str(
            r#"{"name":"Mouse","category":"Electronics","price":19.99,"releaseDate":"2024-01-02"}"#,
        )
        .unwrap();
        assert_eq!(r.id, None);
        assert_eq!(r.description, "");
        assert!(!r.available);
        assert_eq!(r.stock_quantity, 0);
        assert!(r.image.is_none());
    }
}
