//! Maven repository protocol primitives: upload-path decoding, JAR
//! manifest/plugin-metadata extraction, checksum computation, and incoming
//! Basic Auth verification. `maven-metadata.xml` itself is never parsed
//! here: the controller stores and relays it as an opaque, lock-guarded
//! blob, the way a Maven client expects to read-merge-write it.

pub mod auth;
pub mod checksum;
pub mod jar;
pub mod path;
