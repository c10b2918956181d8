//! Core library: metadata probing, cached queries and the tracker facade.

pub mod config;
pub mod probe;
pub mod query;
pub mod tracker;

pub use probe::{FsProbe, MetadataProbe, ProbeError};
pub use tracker::{AddSummary, Tracker, TrackerError};
