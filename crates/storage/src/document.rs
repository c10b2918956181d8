//! On-disk document: `{ "files": { <path>: <record> } }`.

use crate::error::StoreError;
use crate::models::FileRecord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub files: IndexMap<String, FileRecord>,
}

impl Document {
    /// Reads the document at `path`. A missing, unreadable or malformed file
    /// yields an empty document.
    pub fn load(path: &Path) -> Document {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store unreadable; using empty document");
                return Document::default();
            }
        };
        match serde_json::from_str::<Document>(&raw) {
            Ok(mut doc) => {
                for record in doc.files.values_mut() {
                    record.dedup_tags();
                }
                doc
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store is corrupt; using empty document");
                Document::default()
            }
        }
    }

    /// Replaces the file at `path` with the whole document. The bytes go to a
    /// sibling temp file first and are renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');

        let tmp = temp_path(path);
        if let Err(e) = write_synced(&tmp, &bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(path, e));
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "filetrack.json".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
