use crate::document::Document;
use crate::error::StoreError;
use crate::models::{FileRecord, RefreshSummary, TrackedFile};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Handle to the JSON document holding every tracked record.
///
/// Nothing is cached between calls: each operation loads the whole document,
/// applies its change and writes the whole document back. The store assumes a
/// single writer per document path.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    revision: AtomicU64,
}

impl RecordStore {
    /// Opens the store at `path`, writing an empty document if none exists.
    /// An existing file is never touched here, even if it fails to parse.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            Document::default().save(&path)?;
            debug!(path = %path.display(), "initialized empty store");
        }
        Ok(Self {
            path,
            revision: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bumped after every successful write made through this handle.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn load(&self) -> Document {
        Document::load(&self.path)
    }

    fn save(&self, doc: &Document) -> Result<(), StoreError> {
        doc.save(&self.path)?;
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Inserts or wholesale replaces the record at `path`.
    pub fn upsert(&self, path: &str, mut record: FileRecord) -> Result<(), StoreError> {
        let mut doc = self.load();
        record.dedup_tags();
        doc.files.insert(path.to_string(), record);
        self.save(&doc)?;
        debug!(path, "upserted record");
        Ok(())
    }

    /// Upserts a batch with one load and one write. Returns the batch size.
    pub fn upsert_many(
        &self,
        records: impl IntoIterator<Item = (String, FileRecord)>,
    ) -> Result<usize, StoreError> {
        let mut doc = self.load();
        let mut count = 0;
        for (path, mut record) in records {
            record.dedup_tags();
            doc.files.insert(path, record);
            count += 1;
        }
        if count > 0 {
            self.save(&doc)?;
        }
        debug!(count, "upserted batch");
        Ok(count)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.load().files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<TrackedFile> {
        self.load()
            .files
            .swap_remove_entry(path)
            .map(|(path, record)| TrackedFile { path, record })
    }

    /// All records in document order.
    pub fn list(&self) -> Vec<TrackedFile> {
        self.load()
            .files
            .into_iter()
            .map(|(path, record)| TrackedFile { path, record })
            .collect()
    }

    /// Records whose path or filename contains `query`, ignoring case.
    pub fn search_by_name(&self, query: &str) -> Vec<TrackedFile> {
        let needle = query.to_lowercase();
        self.load()
            .files
            .into_iter()
            .filter(|(path, record)| record.matches_name(path, &needle))
            .map(|(path, record)| TrackedFile { path, record })
            .collect()
    }

    /// Records carrying exactly `tag`.
    pub fn search_by_tag(&self, tag: &str) -> Vec<TrackedFile> {
        self.load()
            .files
            .into_iter()
            .filter(|(_, record)| record.has_tag(tag))
            .map(|(path, record)| TrackedFile { path, record })
            .collect()
    }

    /// Ensures `tag` is on the record at `path`. `Ok(false)` means it was
    /// already there and nothing was written.
    pub fn add_tag(&self, path: &str, tag: &str) -> Result<bool, StoreError> {
        let mut doc = self.load();
        let record = doc
            .files
            .get_mut(path)
            .ok_or_else(|| StoreError::NotTracked(path.to_string()))?;
        if !record.insert_tag(tag) {
            return Ok(false);
        }
        self.save(&doc)?;
        debug!(path, tag, "added tag");
        Ok(true)
    }

    /// Ensures `tag` is absent from the record at `path`. `Ok(false)` means
    /// it was not there and nothing was written.
    pub fn remove_tag(&self, path: &str, tag: &str) -> Result<bool, StoreError> {
        let mut doc = self.load();
        let record = doc
            .files
            .get_mut(path)
            .ok_or_else(|| StoreError::NotTracked(path.to_string()))?;
        if !record.delete_tag(tag) {
            return Ok(false);
        }
        self.save(&doc)?;
        debug!(path, tag, "removed tag");
        Ok(true)
    }

    /// Untracks `path`. `Ok(false)` if it was not tracked.
    pub fn remove(&self, path: &str) -> Result<bool, StoreError> {
        let mut doc = self.load();
        if doc.files.shift_remove(path).is_none() {
            return Ok(false);
        }
        self.save(&doc)?;
        debug!(path, "untracked");
        Ok(true)
    }

    /// Untracks `dir` and every tracked path beneath it.
    pub fn remove_under(&self, dir: &str) -> Result<usize, StoreError> {
        let mut doc = self.load();
        let root = Path::new(dir);
        let before = doc.files.len();
        doc.files
            .retain(|path, _| path != dir && !Path::new(path).starts_with(root));
        let removed = before - doc.files.len();
        if removed > 0 {
            self.save(&doc)?;
        }
        debug!(dir, removed, "untracked tree");
        Ok(removed)
    }

    /// Re-probes every tracked path, keeping tags. Paths that no longer exist
    /// or fail to probe are dropped from the rewritten document.
    pub fn refresh_all<F>(&self, mut probe: F) -> Result<RefreshSummary, StoreError>
    where
        F: FnMut(&Path) -> Option<FileRecord>,
    {
        let doc = self.load();
        let mut refreshed = Document::default();
        let mut summary = RefreshSummary::default();

        for (path, old) in doc.files {
            let fs_path = Path::new(&path);
            let fresh = if fs_path.exists() { probe(fs_path) } else { None };
            match fresh {
                Some(mut record) => {
                    record.tags = old.tags;
                    refreshed.files.insert(path, record);
                    summary.updated += 1;
                }
                None => {
                    warn!(path = %path, "dropping record that could not be refreshed");
                    summary.failed += 1;
                }
            }
        }
        summary.total = summary.updated + summary.failed;

        self.save(&refreshed)?;
        info!(
            updated = summary.updated,
            failed = summary.failed,
            total = summary.total,
            "refreshed store"
        );
        Ok(summary)
    }
}
