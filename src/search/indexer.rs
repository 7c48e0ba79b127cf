//! Document indexer: catalog record → [`IndexDocument`].

use std::collections::BTreeMap;

use crate::catalog::CatalogRecord;
use crate::error::AppError;
use crate::index::{IndexDocument, RECORD_ID_KEY};

/// Fixed-layout summary of a record. Depends only on field values, so
/// unchanged records always render byte-identical text.
pub fn render_summary(record: &CatalogRecord) -> String {
    format!(
        "Name: {}\n\
         Description: {}\n\
         Brand: {}\n\
         Category: {}\n\
         Price: {:.2}\n\
         Release Date: {}\n\
         Available: {}\n\
         Stock: {}\n",
        record.name,
        record.description,
        record.brand,
        record.category,
        record.price,
        record.release_date.format("%Y-%m-%d"),
        record.available,
        record.stock_quantity,
    )
}

/// Times the name is repeated in [`search_key`].
const NAME_WEIGHT: usize = 3;

/// Compact matching text: name (weighted), brand, category. Blank fields
/// are skipped.
pub fn search_key(record: &CatalogRecord) -> String {
    let mut parts = vec![record.name.as_str(); NAME_WEIGHT];
    parts.extend([record.brand.as_str(), record.category.as_str()]);
    parts.retain(|p| !p.trim().is_empty());
    parts.join(" ")
}

/// Build the index document for a saved record, tagged with its identifier.
pub fn build_document(record: &CatalogRecord) -> Result<IndexDocument, AppError> {
    let id = record
        .id
        .ok_or_else(|| AppError::Store("cannot index a record without an identifier".into()))?;
    let metadata = BTreeMap::from([(RECORD_ID_KEY.to_string(), id.to_string())]);
    Ok(IndexDocument::new(render_summary(record), metadata).with_key(search_key(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::record;

    #[test]
    fn summary_layout_is_fixed() {
        let mut r = record("Wireless Mouse", "Electronics", 19.99);
        r.description = "2.4 GHz, silent clicks".into();
        r.brand = "Logi".into();
        r.stock_quantity = 120;
        assert_eq!(
            render_summary(&r),
            "Name: Wireless Mouse\n\
             Description: 2.4 GHz, silent clicks\n\
             Brand: Logi\n\
             Category: Electronics\n\
             Price: 19.99\n\
             Release Date: 2024-03-15\n\
             Available: true\n\
             Stock: 120\n"
        );
    }

    #[test]
    fn reindexing_unchanged_record_gives_identical_body() {
        let mut r = record("Desk Lamp", "Home", 24.5);
        r.id = Some(9);
        let first = build_document(&r).unwrap();
        let second = build_document(&r).unwrap();
        assert_eq!(first.body, second.body);
        assert_eq!(first.content_hash(), second.content_hash());
        assert_ne!(first.id, second.id);
        assert_eq!(first.metadata, second.metadata);
    }

    #[test]
    fn document_is_tagged_with_record_id() {
        let mut r = record("Mouse", "Electronics", 19.99);
        r.id = Some(42);
        let doc = build_document(&r).unwrap();
        assert_eq!(doc.metadata.get(RECORD_ID_KEY).map(String::as_str), Some("42"));
        assert_eq!(doc.record_id(), Some(42));
    }

    #[test]
    fn search_key_weights_name_over_brand_and_category() {
        let mut r = record("Wireless Mouse", "Electronics", 19.99);
        r.brand = "Logi".into();
        r.description = "Quiet clicks".into();
        assert_eq!(
            search_key(&r),
            "Wireless Mouse Wireless Mouse Wireless Mouse Logi Electronics"
        );
        r.id = Some(42);
        assert_eq!(build_document(&r).unwrap().key, search_key(&r));
    }

    #[test]
    fn unsaved_record_cannot_be_indexed() {
        assert!(build_document(&record("Mouse", "Electronics", 19.99)).is_err());
    }

    #[test]
    fn price_renders_two_decimals() {
        let r = record("Cable", "Electronics", 5.0);
        assert!(render_summary(&r).contains("Price: 5.00\n"));
    }
}
