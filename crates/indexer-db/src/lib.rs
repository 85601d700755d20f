//! Catalog schema and queries: projects, build types, branches, downloads,
//! dependencies, artifacts. Queries are hand-written parameterized SQL run
//! through `sqlx`'s runtime (non-macro) API rather than the `query!`
//! family, since compile-time query checking needs a live database that
//! this crate cannot assume is reachable wherever it is built.

pub mod pool;
pub mod queries;
pub mod seed;

pub use pool::connect_pool;
