//! resdep Catalog
//!
//! The static inputs of the engine: REST actions with their path templates
//! and parameters, the database schema, and snapshots of existing rows.
//!
//! # Module Structure
//!
//! - `verb` - HTTP verbs in flag-array order
//! - `path` - Path templates split into static and variable elements
//! - `param` - Parameter kinds and body schemas
//! - `value` - Minimal value model for parameters and columns
//! - `action` - REST call actions and parameter binding
//! - `catalogue` - The action catalogue
//! - `db` - Schema, snapshots, DB actions and foreign-key repair
//! - `similarity` - Name similarity used for table matching

pub mod action;
pub mod catalogue;
pub mod db;
pub mod error;
pub mod param;
pub mod path;
pub mod similarity;
pub mod value;
pub mod verb;

pub use action::{AuthInfo, RestCallAction};
pub use catalogue::Catalogue;
pub use db::{
    format_table_name, repair_foreign_keys, verify_foreign_keys, Column, DataRow, DbAction,
    DbActionId, DbActionIdGen, DbActionKind, DbSchema, DbSnapshot, ForeignKey, ForeignKeyRef,
    InsertBuilder, SnapshotDiff, Table,
};
pub use error::{CatalogError, CatalogResult};
pub use param::{Field, Param, ParamKind};
pub use path::{PathElement, RestPath};
pub use similarity::{string_similarity, SIMILARITY_THRESHOLD};
pub use value::{Value, ValueType};
pub use verb::HttpVerb;
