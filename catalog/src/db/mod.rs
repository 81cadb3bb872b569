//! Database schema, row snapshots and the actions that seed calls.

mod action;
mod insert;
mod schema;
mod snapshot;

pub use action::{repair_foreign_keys, verify_foreign_keys, DbAction, DbActionId, DbActionKind, ForeignKeyRef};
pub use insert::{DbActionIdGen, InsertBuilder};
pub use schema::{format_table_name, Column, DbSchema, ForeignKey, Table};
pub use snapshot::{DataRow, DbSnapshot, SnapshotDiff};
