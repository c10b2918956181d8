use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    File,
    Directory,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Directory => "directory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub name: String,
}

impl Owner {
    pub const UNKNOWN_NAME: &'static str = "unknown";

    pub fn unknown(uid: u32) -> Self {
        Self {
            uid,
            name: Self::UNKNOWN_NAME.to_string(),
        }
    }
}

/// Metadata for one tracked path, as persisted under `files.<path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    #[serde(rename = "filetype")]
    pub kind: FileKind,
    #[serde(rename = "filesize")]
    pub size: u64,
    #[serde(rename = "create_time")]
    pub created_at: String,
    #[serde(rename = "modify_time")]
    pub modified_at: String,
    #[serde(rename = "creator")]
    pub owner: Owner,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FileRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Adds `tag` unless present. Returns true when the set changed.
    pub fn insert_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Removes `tag` if present. Returns true when the set changed.
    pub fn delete_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    pub(crate) fn dedup_tags(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|t| seen.insert(t.clone()));
    }

    /// Case-insensitive substring match against `path` or the filename.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_name(&self, path: &str, needle: &str) -> bool {
        path.to_lowercase().contains(needle) || self.filename.to_lowercase().contains(needle)
    }
}

/// A record paired with the path it is keyed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    #[serde(rename = "filepath")]
    pub path: String,
    #[serde(flatten)]
    pub record: FileRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub updated: usize,
    pub failed: usize,
    pub total: usize,
}
