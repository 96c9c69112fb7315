//! Database schema description and pruning
//!
//! A [`Schema`] is loaded once per database, either from a JSON/YAML document
//! or by introspecting a SQLite file, and is read-only afterwards.

pub mod error;
pub mod introspect;
pub mod model;
pub mod prune;
mod render;

pub use error::{SchemaError, SchemaResult};
pub use introspect::introspect_sqlite;
pub use model::{Column, ForeignKey, Schema, Table};
pub use prune::{PruneOutcome, apply_selection, prune};
