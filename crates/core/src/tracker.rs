//! Entry point tying the metadata probe to the record store.

use crate::config::AppConfig;
use crate::probe::{FsProbe, MetadataProbe, ProbeError};
use crate::query::QueryEngine;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::cell::{RefCell, RefMut};
use std::path::{Path, PathBuf};
use storage::{RecordStore, RefreshSummary, StoreError, TrackedFile};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("path is not tracked: {0}")]
    NotTracked(String),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Store(StoreError),
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotTracked(path) => TrackerError::NotTracked(path),
            other => TrackerError::Store(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddSummary {
    pub added: usize,
    pub failed: usize,
    pub total: usize,
}

pub struct Tracker<P = FsProbe> {
    store: RecordStore,
    probe: P,
    queries: RefCell<QueryEngine>,
    excludes: GlobSet,
    include_hidden: bool,
}

impl Tracker<FsProbe> {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, TrackerError> {
        let store = RecordStore::open(&cfg.store.path)?;
        Self::new(store, FsProbe, cfg)
    }
}

impl<P: MetadataProbe> Tracker<P> {
    pub fn new(store: RecordStore, probe: P, cfg: &AppConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            store,
            probe,
            queries: RefCell::new(QueryEngine::new(cfg.query.cache_capacity)),
            excludes: build_globset(&cfg.scan.exclude)?,
            include_hidden: cfg.scan.include_hidden,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Probes `path` and stores a fresh record for it with no tags.
    pub fn add_file(&self, path: &str) -> Result<(), TrackerError> {
        let fs_path = Path::new(path);
        if !fs_path.exists() {
            return Err(TrackerError::NotFound(fs_path.to_path_buf()));
        }
        let record = self.probe.probe(fs_path)?;
        self.store.upsert(path, record)?;
        Ok(())
    }

    /// Adds `path` itself, or with `recursive` every regular file under a
    /// directory. Files that fail to probe are counted, not fatal.
    pub fn add_path(&self, path: &str, recursive: bool) -> Result<AddSummary, TrackerError> {
        let root = Path::new(path);
        if !root.exists() {
            return Err(TrackerError::NotFound(root.to_path_buf()));
        }
        if !recursive || !root.is_dir() {
            self.add_file(path)?;
            return Ok(AddSummary {
                added: 1,
                failed: 0,
                total: 1,
            });
        }

        let mut records = Vec::new();
        let mut failed = 0;
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.should_descend(e.path()));
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    // A broken link or unreadable file still counts against
                    // the batch; unreadable directories do not.
                    let counted = e
                        .path()
                        .is_some_and(|p| !p.is_dir() && self.should_descend(p));
                    if counted {
                        failed += 1;
                    }
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match self.probe.probe(entry.path()) {
                Ok(record) => {
                    records.push((entry.path().to_string_lossy().into_owned(), record));
                }
                Err(e) => {
                    warn!(error = %e, "failed to probe file");
                    failed += 1;
                }
            }
        }

        let added = self.store.upsert_many(records)?;
        let summary = AddSummary {
            added,
            failed,
            total: added + failed,
        };
        info!(path, added, failed, "added directory tree");
        Ok(summary)
    }

    /// Adds `path` if it is not tracked yet. Returns true when it was added.
    pub fn ensure_tracked(&self, path: &str) -> Result<bool, TrackerError> {
        if self.store.exists(path) {
            return Ok(false);
        }
        self.add_file(path)?;
        Ok(true)
    }

    pub fn list_files(&self) -> Vec<TrackedFile> {
        self.store.list()
    }

    /// Path or filename substring search, ignoring case.
    pub fn search_by_name(&self, name: &str) -> Vec<TrackedFile> {
        self.store.search_by_name(name)
    }

    pub fn search_by_tag(&self, tag: &str) -> Vec<TrackedFile> {
        let mut queries = self.queries();
        queries.sync(&self.store);
        queries.by_tag(tag)
    }

    /// Filename-only substring search, ignoring case.
    pub fn find_by_filename(&self, name: &str) -> Vec<TrackedFile> {
        let mut queries = self.queries();
        queries.sync(&self.store);
        queries.by_name(name)
    }

    pub fn add_tag(&self, path: &str, tag: &str) -> Result<bool, TrackerError> {
        Ok(self.store.add_tag(path, tag)?)
    }

    pub fn remove_tag(&self, path: &str, tag: &str) -> Result<bool, TrackerError> {
        Ok(self.store.remove_tag(path, tag)?)
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.store.exists(path)
    }

    pub fn file_meta(&self, path: &str) -> Option<TrackedFile> {
        self.store.get(path)
    }

    /// Stops tracking `path`, and with `recursive` everything beneath it.
    /// Returns how many records were removed.
    pub fn untrack(&self, path: &str, recursive: bool) -> Result<usize, TrackerError> {
        let removed = if recursive {
            self.store.remove_under(path)?
        } else {
            usize::from(self.store.remove(path)?)
        };
        debug!(path, removed, "untrack");
        Ok(removed)
    }

    pub fn refresh_database(&self) -> Result<RefreshSummary, TrackerError> {
        let summary = self.store.refresh_all(|path| match self.probe.probe(path) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "probe failed during refresh");
                None
            }
        })?;
        Ok(summary)
    }

    fn queries(&self) -> RefMut<'_, QueryEngine> {
        self.queries.borrow_mut()
    }

    fn should_descend(&self, path: &Path) -> bool {
        if self.excludes.is_match(path) {
            return false;
        }
        self.include_hidden || !is_hidden(path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    builder.build()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
