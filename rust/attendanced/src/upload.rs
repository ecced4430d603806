use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub first_name: String,
    pub last_name: String,
    pub enrollment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub course_name: String,
    pub course_code: String,
}

/// Name an upload lands under: `<millis>-<uuid>-<sanitized original name>`.
pub fn stored_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.csv");
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}-{}-{}", millis, Uuid::new_v4().simple(), clean)
}

pub async fn store(dir: &Path, original_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create upload directory {}", dir.to_string_lossy()))?;
    let path = dir.join(stored_file_name(original_name));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write upload {}", path.to_string_lossy()))?;
    debug!(path = %path.to_string_lossy(), size = bytes.len(), "stored upload");
    Ok(path)
}

/// Removes a processed upload. Failure is logged, never returned.
pub fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.to_string_lossy(), error = %e, "failed to remove upload");
    }
}

pub fn parse_rows<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<T>().enumerate() {
        // Header is line 1.
        rows.push(row.with_context(|| format!("invalid row on line {}", idx + 2))?);
    }
    Ok(rows)
}
