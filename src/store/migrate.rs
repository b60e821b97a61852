//! Import of the legacy id-keyed snapshot layout.
//!
//! Some upstream exports write `{ "<processo>": { ...record } }` instead of a
//! list. That layout is accepted here only, never by the loader.

use crate::error::json_type_name;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Convert a snapshot value into the canonical list of records.
///
/// Lists pass through untouched. Maps become a list sorted by `processo`,
/// with the key filled in as `processo` where the entry lacks one.
pub fn to_record_list(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(entries) => Ok(entries),
        Value::Object(map) => {
            let mut entries = map
                .into_iter()
                .map(|(key, entry)| match entry {
                    Value::Object(mut fields) => {
                        fields
                            .entry("processo")
                            .or_insert_with(|| Value::String(key));
                        Ok(Value::Object(fields))
                    }
                    other => bail!(
                        "entry {} is a {}, expected an object",
                        key,
                        json_type_name(&other)
                    ),
                })
                .collect::<Result<Vec<_>>>()?;

            entries.sort_by(|a, b| a["processo"].as_str().cmp(&b["processo"].as_str()));
            Ok(entries)
        }
        other => bail!(
            "snapshot must be a list or an id-keyed object, found {}",
            json_type_name(&other)
        ),
    }
}

/// Rewrite `input` as a canonical list snapshot at `output`. Returns the record count.
pub async fn migrate_file(input: &Path, output: &Path) -> Result<usize> {
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let entries = to_record_list(value)?;
    let count = entries.len();
    let content = serde_json::to_string_pretty(&entries)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(output, content)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Migrated {} records to {}", count, output.display());
    Ok(count)
}
