//! Cache module - Materialize-or-reuse decisions and Parquet artifacts
//!
//! Provides:
//! - Artifact storage (write, read, list)
//! - The resolver that decides between reusing and rebuilding an artifact

pub mod resolver;
pub mod store;

pub use resolver::{CacheDecision, CacheResolver, RebuildReason, Resolution, TargetMode};
pub use store::{ArtifactCompression, ArtifactInfo};
