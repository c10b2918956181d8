//! Reads filesystem metadata for a path and turns it into a fresh record.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use storage::{FileKind, FileRecord, Owner};
use tracing::debug;
use walkdir::WalkDir;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("no such file or directory: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read metadata for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait MetadataProbe {
    fn probe(&self, path: &Path) -> Result<FileRecord, ProbeError>;
}

/// Probe backed by the local filesystem and user database.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl MetadataProbe for FsProbe {
    fn probe(&self, path: &Path) -> Result<FileRecord, ProbeError> {
        let meta = fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProbeError::Missing(path.to_path_buf())
            } else {
                ProbeError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let (kind, size) = if meta.is_dir() {
            (FileKind::Directory, dir_size(path))
        } else {
            (FileKind::File, meta.len())
        };

        let modified = meta.modified().ok();
        let created = meta.created().ok().or_else(|| status_changed(&meta)).or(modified);

        Ok(FileRecord {
            filename: file_name(path),
            kind,
            size,
            created_at: format_time(created),
            modified_at: format_time(modified),
            owner: owner_of(&meta),
            tags: Vec::new(),
        })
    }
}

/// Final path component; `.` and `..` keep their literal spelling.
fn file_name(path: &Path) -> String {
    path.file_name()
        .or_else(|| path.components().next_back().map(|c| c.as_os_str()))
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sum of regular file sizes under `dir`. Entries that cannot be read are
/// skipped.
pub fn dir_size(dir: &Path) -> u64 {
    let mut total = 0u64;
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(m) => total = total.saturating_add(m.len()),
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "skipping unreadable file");
            }
        }
    }
    total
}

pub fn format_time(time: Option<SystemTime>) -> String {
    let time = time.unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(unix)]
fn status_changed(meta: &fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    let secs = u64::try_from(meta.ctime()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(std::time::Duration::from_secs(secs))
}

#[cfg(not(unix))]
fn status_changed(_meta: &fs::Metadata) -> Option<SystemTime> {
    None
}

#[cfg(unix)]
fn owner_of(meta: &fs::Metadata) -> Owner {
    use nix::unistd::{Uid, User};
    use std::os::unix::fs::MetadataExt;

    let uid = meta.uid();
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Owner {
            uid,
            name: user.name,
        },
        Ok(None) => Owner::unknown(uid),
        Err(e) => {
            debug!(uid, error = %e, "owner lookup failed");
            Owner::unknown(uid)
        }
    }
}

#[cfg(not(unix))]
fn owner_of(_meta: &fs::Metadata) -> Owner {
    Owner::unknown(0)
}
