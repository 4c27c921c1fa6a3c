//! Wire types for the ACORN student web service.
//!
//! This crate contains the serde-serializable shapes exchanged with ACORN and
//! persisted alongside the login session. Types here are:
//!
//! * Pure data: no behavior beyond serialization and small accessors
//! * Lenient: optional or missing fields deserialize to defaults
//! * Stable: changes only when the remote payloads change
//!
//! Session, retry and polling logic is built on top of these types in `squirrel`.

pub mod cookie;
pub mod course;

pub use cookie::*;
pub use course::*;
