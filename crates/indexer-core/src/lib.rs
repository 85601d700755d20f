//! Core data types for the artifact indexer.
//!
//! This crate defines the catalog entities persisted by the database
//! (projects, build types, branches, downloads, dependencies, artifacts)
//! and the in-flight, memory-only state a publishing session accumulates
//! before it commits (metadata lock state, per-artifact checksum
//! rendezvous).
//!
//! This crate is intentionally free of async code and network I/O: the
//! session registry, project locks, and idle timers that drive these types
//! at runtime live in `indexer-server`.

/// Maximum accepted upload size for a single PUT body.
pub const MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Extension the controller actually catalogs; other extensions are
/// proxied but never indexed.
pub const INDEXED_EXTENSION: &str = "jar";

pub mod entities;
pub mod session;
