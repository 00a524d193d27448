// unbloat-common/src/model/catalog.rs
use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::classification::{ClassificationRecord, InstallOrigin, RemovalRisk};
use crate::error::{Result, UnbloatError};

/// Immutable snapshot of the classification list at one revision.
///
/// A refresh builds a new `Catalog` and swaps it in whole; an existing one is
/// never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    revision: String,
    records: BTreeMap<String, ClassificationRecord>,
}

impl Catalog {
    pub fn new(revision: impl Into<String>, records: BTreeMap<String, ClassificationRecord>) -> Self {
        Self {
            revision: revision.into(),
            records,
        }
    }

    /// Parses `raw` and stamps the result with the caller-supplied revision.
    pub fn parse(revision: impl Into<String>, raw: &[u8]) -> Result<Self> {
        Ok(Self::new(revision, parse_records(raw)?))
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn records(&self) -> &BTreeMap<String, ClassificationRecord> {
        &self.records
    }

    pub fn get(&self, package_id: &str) -> Option<&ClassificationRecord> {
        self.records.get(package_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Converts the raw list document into records keyed by package identifier.
///
/// Only a document whose top level is not an object fails. Every key of the
/// object produces exactly one record; bad field values degrade to
/// `Unknown` / empty description.
pub fn parse_records(raw: &[u8]) -> Result<BTreeMap<String, ClassificationRecord>> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|e| UnbloatError::InvalidDocument(format!("not valid JSON: {e}")))?;

    let Value::Object(entries) = document else {
        return Err(UnbloatError::InvalidDocument(format!(
            "expected an object keyed by package id, found {}",
            json_kind(&document)
        )));
    };

    let mut degraded = 0usize;
    let records: BTreeMap<String, ClassificationRecord> = entries
        .into_iter()
        .map(|(package_id, value)| {
            let record = match value {
                Value::Object(fields) => record_from_fields(&fields),
                other => {
                    debug!(
                        "Entry '{}' is a {} rather than an object; keeping it unclassified",
                        package_id,
                        json_kind(&other)
                    );
                    ClassificationRecord::unclassified()
                }
            };
            if record.removal_risk == RemovalRisk::Unknown
                || record.install_origin == InstallOrigin::Unknown
            {
                degraded += 1;
            }
            (package_id, record)
        })
        .collect();

    debug!(
        "Parsed {} catalog entries ({} with unknown origin or risk)",
        records.len(),
        degraded
    );
    Ok(records)
}

fn record_from_fields(fields: &Map<String, Value>) -> ClassificationRecord {
    let text = |key: &str| fields.get(key).and_then(Value::as_str);
    ClassificationRecord {
        install_origin: text("list")
            .map(InstallOrigin::from_label)
            .unwrap_or(InstallOrigin::Unknown),
        description: text("description").unwrap_or_default().to_string(),
        removal_risk: text("removal")
            .map(RemovalRisk::from_label)
            .unwrap_or(RemovalRisk::Unknown),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_entry() {
        let raw = br#"{"com.a.app": {"list":"oem","description":"x","removal":"recommended"}}"#;
        let catalog = Catalog::parse("abc123", raw).unwrap();

        assert_eq!(catalog.revision(), "abc123");
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.get("com.a.app"),
            Some(&ClassificationRecord {
                install_origin: InstallOrigin::Oem,
                description: "x".to_string(),
                removal_risk: RemovalRisk::Recommended,
            })
        );
    }

    #[test]
    fn test_bogus_removal_keeps_entry() {
        let raw = br#"{"com.a.app": {"list":"carrier","description":"d","removal":"bogus"}}"#;
        let records = parse_records(raw).unwrap();

        let record = records.get("com.a.app").expect("entry must be retained");
        assert_eq!(record.removal_risk, RemovalRisk::Unknown);
        assert_eq!(record.install_origin, InstallOrigin::Carrier);
        assert_eq!(record.description, "d");
    }

    #[test]
    fn test_malformed_entries_are_never_dropped() {
        let raw = br#"{
            "a": {"list": 3, "removal": null},
            "b": {},
            "c": "just a string",
            "d": [1, 2, 3],
            "e": null,
            "f": {"list": "Misc", "description": "fine", "removal": "Expert"}
        }"#;
        let records = parse_records(raw).unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records["a"], ClassificationRecord::unclassified());
        assert_eq!(records["b"].description, "");
        assert_eq!(records["c"].removal_risk, RemovalRisk::Unknown);
        assert_eq!(records["f"].install_origin, InstallOrigin::Unknown);
        assert_eq!(records["f"].removal_risk, RemovalRisk::Expert);
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        for raw in [&b"[]"[..], b"\"text\"", b"42", b"not json at all"] {
            let err = parse_records(raw).unwrap_err();
            assert!(matches!(err, UnbloatError::InvalidDocument(_)), "{err:?}");
        }
    }

    #[test]
    fn test_empty_object_is_an_empty_catalog() {
        let catalog = Catalog::parse("rev", b"{}").unwrap();
        assert!(catalog.is_empty());
    }
}
