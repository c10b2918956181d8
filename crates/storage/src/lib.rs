//! Storage layer: the JSON document of tracked records.
//!
//! Every operation is a self-contained load, mutate, save cycle over the
//! whole document. See [`RecordStore`].

mod document;
mod error;
pub mod models;
mod store;

pub use document::Document;
pub use error::StoreError;
pub use models::{FileKind, FileRecord, Owner, RefreshSummary, TrackedFile};
pub use store::RecordStore;
