//! Export and import of the quick links document.
//!
//! The document is a pretty-printed JSON array of `{url, name}` objects.
//! Import is split in two steps so the caller can ask for confirmation
//! between validating the file and overwriting the stored list.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;

use crate::entity::Entity;
use crate::entity_list::{EntityList, ListView};
use crate::error::TransferError;
use crate::store::StorageBackend;

pub const EXPORT_PREFIX: &str = "quick-links";

pub fn export_file_name(date: NaiveDate) -> String {
    format!("{EXPORT_PREFIX}-export-{}.json", date.format("%Y-%m-%d"))
}

pub fn render_export(entities: &[Entity]) -> Result<String, TransferError> {
    if entities.is_empty() {
        return Err(TransferError::Empty);
    }
    Ok(serde_json::to_string_pretty(entities)?)
}

/// Write the current list into `dir`, returning the file created.
pub fn export_to_dir(
    entities: &[Entity],
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, TransferError> {
    let body = render_export(entities)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date));
    fs::write(&path, body)?;
    log::info!("exported {} links to {}", entities.len(), path.display());
    Ok(path)
}

/// Every element must be an object carrying non-empty string `url` and
/// `name` fields.
pub fn validate_document(value: &Value) -> bool {
    let Some(items) = value.as_array() else {
        return false;
    };
    items.iter().all(|item| {
        let non_empty = |field: &str| {
            item.get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| !text.is_empty())
        };
        item.is_object() && non_empty("url") && non_empty("name")
    })
}

pub fn parse_document(text: &str) -> Result<Vec<Entity>, TransferError> {
    let value: Value = serde_json::from_str(text)?;
    if !validate_document(&value) {
        return Err(TransferError::InvalidFormat);
    }
    Ok(serde_json::from_value(value)?)
}

/// A validated import waiting for the user's go-ahead.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingImport {
    pub source: PathBuf,
    pub entities: Vec<Entity>,
}

pub fn read_import(path: &Path) -> Result<PendingImport, TransferError> {
    let text = fs::read_to_string(path)?;
    let entities = parse_document(&text)?;
    Ok(PendingImport {
        source: path.to_path_buf(),
        entities,
    })
}

/// Replace the whole list with a confirmed import.
pub fn apply_import<B: StorageBackend, V: ListView>(
    list: &mut EntityList<B, V>,
    pending: PendingImport,
) -> usize {
    let count = pending.entities.len();
    list.replace_all(pending.entities);
    log::info!("imported {count} links from {}", pending.source.display());
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[test]
    fn file_name_carries_date() {
        assert_eq!(export_file_name(date()), "quick-links-export-2026-03-09.json");
    }

    #[test]
    fn empty_list_is_not_exported() {
        assert!(matches!(render_export(&[]), Err(TransferError::Empty)));
    }

    #[test]
    fn export_is_pretty_printed() {
        let body = render_export(&[Entity::new("a.com", "A")]).unwrap();
        assert!(body.contains("\n  {"));
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!([{ "url": "a.com", "name": "A" }])
        );
    }

    #[test]
    fn export_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_to_dir(&[Entity::new("a.com", "A")], dir.path(), date()).unwrap();
        assert_eq!(path, dir.path().join("quick-links-export-2026-03-09.json"));
        let parsed = parse_document(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, vec![Entity::new("a.com", "A")]);
    }

    #[test]
    fn validation_rules() {
        assert!(validate_document(&json!([])));
        assert!(validate_document(&json!([{ "url": "a", "name": "A", "x": 1 }])));
        assert!(!validate_document(&json!({ "url": "a", "name": "A" })));
        assert!(!validate_document(&json!([{ "url": "a" }])));
        assert!(!validate_document(&json!([{ "url": "", "name": "A" }])));
        assert!(!validate_document(&json!([{ "url": 1, "name": "A" }])));
        assert!(!validate_document(&json!(["a.com"])));
        assert!(!validate_document(&json!([null])));
    }

    #[test]
    fn parse_rejects_bad_json() {
        assert!(matches!(
            parse_document("[{"),
            Err(TransferError::Json(_))
        ));
        assert!(matches!(
            parse_document(r#"[{"url":"a"}]"#),
            Err(TransferError::InvalidFormat)
        ));
    }

    #[test]
    fn read_import_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_import(&dir.path().join("nope.json")),
            Err(TransferError::Io(_))
        ));
    }
}
