//! Snapshot loading with primary/secondary failover.
//!
//! The primary location is the fresher but less reliable copy (usually a
//! network mount). Whenever it reads and parses cleanly, its exact bytes are
//! mirrored into the secondary location so that the next outage still has recent data.

use crate::config::StorageConfig;
use crate::error::{json_type_name, LoadError};
use crate::models::ProcessRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which location a snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Primary,
    Secondary,
}

/// Reads the snapshot from the configured locations.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    primary: PathBuf,
    secondary: PathBuf,
}

impl SnapshotLoader {
    pub fn new(primary: impl Into<PathBuf>, secondary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.primary_path, &config.secondary_path)
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn secondary(&self) -> &Path {
        &self.secondary
    }

    /// Load the raw snapshot entries.
    pub async fn load(&self) -> Result<Vec<Value>, LoadError> {
        self.load_with_source().await.map(|(entries, _)| entries)
    }

    /// Load the raw snapshot entries and report where they came from.
    pub async fn load_with_source(&self) -> Result<(Vec<Value>, SnapshotSource), LoadError> {
        match tokio::fs::read(&self.primary).await {
            Ok(bytes) => {
                debug!("Read snapshot from primary {}", self.primary.display());
                let text = decode_text(&self.primary, bytes)?;
                let entries = parse_snapshot(&self.primary, &text)?;
                self.refresh_backup(&text).await;
                Ok((entries, SnapshotSource::Primary))
            }
            Err(primary_err) => {
                warn!(
                    "Primary snapshot {} unavailable ({}), falling back to {}",
                    self.primary.display(),
                    primary_err,
                    self.secondary.display()
                );

                let bytes = tokio::fs::read(&self.secondary)
                    .await
                    .map_err(|source| LoadError::Unavailable {
                        path: self.secondary.clone(),
                        source,
                    })?;
                let text = decode_text(&self.secondary, bytes)?;

                let entries = parse_snapshot(&self.secondary, &text)?;
                info!(
                    "Loaded {} entries from secondary {}",
                    entries.len(),
                    self.secondary.display()
                );
                Ok((entries, SnapshotSource::Secondary))
            }
        }
    }

    /// Load and decode records, skipping entries that do not decode.
    pub async fn load_records(&self) -> Result<Vec<ProcessRecord>, LoadError> {
        let entries = self.load().await?;
        Ok(decode_records(entries))
    }

    /// Mirror the primary's bytes into the secondary location. Never fails.
    ///
    /// Only called once the primary text has parsed as a list, so a corrupt
    /// primary never overwrites a good backup.
    async fn refresh_backup(&self, text: &str) {
        if self.primary == self.secondary {
            return;
        }

        if let Err(e) = write_backup(&self.secondary, text).await {
            let err = LoadError::BackupWriteFailed {
                path: self.secondary.clone(),
                source: e,
            };
            warn!("{}", err);
        } else {
            debug!("Refreshed backup at {}", self.secondary.display());
        }
    }
}

async fn write_backup(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await
}

/// A file that was read but is not UTF-8 is bad data, not an outage.
fn decode_text(path: &Path, bytes: Vec<u8>) -> Result<String, LoadError> {
    String::from_utf8(bytes).map_err(|source| LoadError::InvalidEncoding {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse snapshot text and require a top-level list.
pub fn parse_snapshot(path: &Path, text: &str) -> Result<Vec<Value>, LoadError> {
    let value: Value = serde_json::from_str(text).map_err(|source| LoadError::CorruptData {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(LoadError::InvalidShape {
            path: path.to_path_buf(),
            found: json_type_name(&other),
        }),
    }
}

/// Decode raw entries into records. Undecodable entries are logged and skipped.
pub fn decode_records(entries: Vec<Value>) -> Vec<ProcessRecord> {
    let total = entries.len();
    let records: Vec<ProcessRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping snapshot entry {}: {}", index, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        debug!("Decoded {} of {} snapshot entries", records.len(), total);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const PRIMARY: &str = r#"[{"processo":"0001.000001/2024-01","unidade":"A","tipo_tabela":"X","dias":3}]"#;
    const SECONDARY: &str = r#"[{"processo":"0002.000002/2024-02","unidade":"B","tipo_tabela":"Y","dias":"9"}]"#;

    #[tokio::test]
    async fn test_primary_is_preferred() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        let secondary = dir.path().join("secondary.json");
        std::fs::write(&primary, PRIMARY).unwrap();
        std::fs::write(&secondary, SECONDARY).unwrap();

        let loader = SnapshotLoader::new(&primary, &secondary);
        let (entries, source) = loader.load_with_source().await.unwrap();

        assert_eq!(source, SnapshotSource::Primary);
        assert_eq!(entries[0]["processo"], json!("0001.000001/2024-01"));
    }

    #[tokio::test]
    async fn test_falls_back_to_secondary() {
        let dir = TempDir::new().unwrap();
        let secondary = dir.path().join("secondary.json");
        std::fs::write(&secondary, SECONDARY).unwrap();

        let loader = SnapshotLoader::new(dir.path().join("missing.json"), &secondary);
        let (entries, source) = loader.load_with_source().await.unwrap();

        assert_eq!(source, SnapshotSource::Secondary);
        assert_eq!(entries, serde_json::from_str::<Vec<Value>>(SECONDARY).unwrap());
    }

    #[tokio::test]
    async fn test_primary_bytes_are_mirrored() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        let secondary = dir.path().join("nested/mirror/secondary.json");
        let raw = "[\n  {\"processo\": \"0001.000001/2024-01\"}\n]\n";
        std::fs::write(&primary, raw).unwrap();

        let loader = SnapshotLoader::new(&primary, &secondary);
        loader.load().await.unwrap();

        assert_eq!(std::fs::read_to_string(&secondary).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_backup_write_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        std::fs::write(&primary, PRIMARY).unwrap();

        // Parent of the backup is a regular file, so create_dir_all fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let secondary = blocker.join("secondary.json");

        let loader = SnapshotLoader::new(&primary, &secondary);
        let entries = loader.load().await.unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!secondary.exists());
    }

    #[tokio::test]
    async fn test_corrupt_primary_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        let secondary = dir.path().join("secondary.json");
        std::fs::write(&primary, "[{ not json").unwrap();
        std::fs::write(&secondary, SECONDARY).unwrap();

        let loader = SnapshotLoader::new(&primary, &secondary);
        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, LoadError::CorruptData { ref path, .. } if path == &primary));
        assert_eq!(std::fs::read_to_string(&secondary).unwrap(), SECONDARY);
    }

    #[tokio::test]
    async fn test_non_utf8_primary_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        let secondary = dir.path().join("secondary.json");
        // Latin-1 "ã" (0xE3) inside an otherwise valid snapshot.
        let mut raw = br#"[{"processo":"0001.000001/2024-01","unidade":"Gest"#.to_vec();
        raw.push(0xE3);
        raw.extend_from_slice(br#"o"}]"#);
        std::fs::write(&primary, &raw).unwrap();
        std::fs::write(&secondary, SECONDARY).unwrap();

        let loader = SnapshotLoader::new(&primary, &secondary);
        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, LoadError::InvalidEncoding { ref path, .. } if path == &primary));
        assert_eq!(std::fs::read_to_string(&secondary).unwrap(), SECONDARY);
    }

    #[tokio::test]
    async fn test_non_utf8_secondary_is_invalid_encoding() {
        let dir = TempDir::new().unwrap();
        let secondary = dir.path().join("secondary.json");
        std::fs::write(&secondary, [b'[', 0xFF, b']']).unwrap();

        let loader = SnapshotLoader::new(dir.path().join("missing.json"), &secondary);
        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, LoadError::InvalidEncoding { ref path, .. } if path == &secondary));
    }

    #[tokio::test]
    async fn test_both_unavailable() {
        let dir = TempDir::new().unwrap();
        let loader = SnapshotLoader::new(dir.path().join("a.json"), dir.path().join("b.json"));

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::Unavailable { ref path, .. } if path.ends_with("b.json")));
    }

    #[tokio::test]
    async fn test_non_list_snapshot_is_rejected() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        std::fs::write(&primary, r#"{"0001.000001/2024-01": {"dias": 1}}"#).unwrap();

        let loader = SnapshotLoader::new(&primary, dir.path().join("secondary.json"));
        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, LoadError::InvalidShape { found: "object", .. }));
    }

    #[tokio::test]
    async fn test_load_records_skips_bad_entries() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        std::fs::write(
            &primary,
            r#"[{"processo":"0001.000001/2024-01"},{"processo":42},"junk",{"processo":"0001.000002/2024-01"}]"#,
        )
        .unwrap();

        let loader = SnapshotLoader::new(&primary, dir.path().join("secondary.json"));
        let records = loader.load_records().await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.processo.as_str()).collect();
        assert_eq!(ids, vec!["0001.000001/2024-01", "0001.000002/2024-01"]);
    }

    #[tokio::test]
    async fn test_null_labels_keep_the_record() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.json");
        std::fs::write(
            &primary,
            r#"[{"processo":"0001.000001/2024-01","unidade":null,"tipo_tabela":null,"dias":4},{"processo":"0001.000002/2024-01","unidade":12,"tipo_tabela":"X"}]"#,
        )
        .unwrap();

        let loader = SnapshotLoader::new(&primary, dir.path().join("secondary.json"));
        let records = loader.load_records().await.unwrap();

        assert_eq!(records.len(), 2);
        let found = crate::analysis::find_by_number(&records, "0001.000001/2024-01").unwrap();
        assert_eq!(found.unidade, "");
        assert_eq!(found.valid_days(), Some(4.0));
        assert_eq!(records[1].unidade, "");
        assert_eq!(records[1].tipo_tabela, "X");
    }

    #[test]
    fn test_from_config() {
        let config = StorageConfig::default();
        let loader = SnapshotLoader::from_config(&config);
        assert_eq!(loader.primary(), config.primary_path.as_path());
        assert_eq!(loader.secondary(), config.secondary_path.as_path());
    }
}
