//! Whole-database backup and restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{Database, RepositoryError};

/// Envelope version written by [`BackupEnvelope::new`].
pub const BACKUP_VERSION: u32 = 1;

/// A downloadable backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEnvelope {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub data: Database,
}

impl BackupEnvelope {
    #[must_use]
    pub const fn new(data: Database, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: BACKUP_VERSION,
            exported_at,
            data,
        }
    }

    /// File name offered for download.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "ashpazkhoone-backup-{}.json",
            self.exported_at.format("%Y%m%d-%H%M%S")
        )
    }
}

/// Parse a restore body.
///
/// Accepts either a [`BackupEnvelope`] or a bare database document, as older
/// exports were written without the envelope.
///
/// # Errors
///
/// Returns [`RepositoryError::Invalid`] if the body is not an object, names a
/// newer envelope version, or does not match the database shape.
pub fn parse_restore(body: Value) -> Result<Database, RepositoryError> {
    let Value::Object(mut map) = body else {
        return Err(RepositoryError::Invalid(
            "backup must be a JSON object".to_string(),
        ));
    };

    let is_envelope = map.contains_key("data") && map.contains_key("version");
    if !is_envelope {
        return Database::from_value(Value::Object(map))
            .map_err(|e| RepositoryError::Invalid(format!("invalid backup: {e}")));
    }

    let version = map
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| RepositoryError::Invalid("backup version must be a number".to_string()))?;
    if version > u64::from(BACKUP_VERSION) {
        return Err(RepositoryError::Invalid(format!(
            "backup version {version} is newer than supported version {BACKUP_VERSION}"
        )));
    }
    let data = map.remove("data").unwrap_or(Value::Null);
    Database::from_value(data).map_err(|e| RepositoryError::Invalid(format!("invalid backup: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_envelope_shape() {
        let at = DateTime::parse_from_rfc3339("2026-03-20T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let envelope = BackupEnvelope::new(Database::default(), at);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["exportedAt"].is_string());
        assert!(value["data"]["products"].is_array());
        assert_eq!(envelope.file_name(), "ashpazkhoone-backup-20260320-093000.json");
    }

    #[test]
    fn test_parse_envelope_and_raw() {
        let raw = json!({ "categories": [{ "id": 3, "name": "Cookware", "slug": "cookware" }] });
        let from_raw = parse_restore(raw.clone()).unwrap();
        assert_eq!(from_raw.categories.len(), 1);

        let wrapped = json!({ "version": 1, "exportedAt": "2026-01-01T00:00:00Z", "data": raw });
        assert_eq!(parse_restore(wrapped).unwrap(), from_raw);
    }

    #[test]
    fn test_parse_rejects_bad_bodies() {
        assert!(matches!(
            parse_restore(json!([1, 2])),
            Err(RepositoryError::Invalid(_))
        ));
        assert!(matches!(
            parse_restore(json!({ "version": 9, "data": {} })),
            Err(RepositoryError::Invalid(_))
        ));
        assert!(matches!(
            parse_restore(json!({ "products": "nope" })),
            Err(RepositoryError::Invalid(_))
        ));
    }
}
