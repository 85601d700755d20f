//! HTTP front end for the Maven repository indexing proxy.
//!
//! Ties the `indexer-core` state machines, `indexer-db` catalog, and
//! `indexer-storage`/`indexer-vcs` drivers together behind two axum
//! routes: `GET`/`PUT {uploadPrefix}/*path`.

pub mod config;
pub mod controller;
pub mod purge;
pub mod router;
pub mod session;

pub use config::Config;
pub use controller::Controller;
pub use purge::{CachePurger, HttpPurger, NoopPurger};
pub use router::build_router;
