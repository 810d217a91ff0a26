// Copyright 2025 Oxide Computer Company

//! Skew
//!
//! Compute field-precise semantic deltas between OpenAPI documents.
//!
//! The entry point is [`diff`], which walks two parsed, resolved documents
//! and returns a sparse [`DocumentDiff`] tree whose `is_empty` predicates
//! are the authoritative "no semantic change" signal.

mod compare;
mod config;
mod error;
pub mod mediatype;
mod model;
mod operations;
mod parameters;
mod schema;
mod setdiff;
mod state;
pub mod typelist;
mod value;

pub use compare::{DocumentDiff, PathItemDiff, PathsDiff, diff};
pub use config::DiffConfig;
pub use error::DiffError;
pub use model::{
    AdditionalProperties, Components, Content, Document, Operation, Parameter, ParameterLocation,
    PathItem, RequestBody, Response, SchemaNode, SchemaRef,
};
pub use operations::{
    ContentDiff, MediaTypeDiff, OperationDiff, RequestBodyDiff, ResponseDiff, ResponsesDiff,
};
pub use parameters::{ParameterDiff, ParametersDiff};
pub use schema::{SchemaDiff, SchemasMapDiff, SubschemasDiff};
pub use setdiff::{StringsDiff, compare_string_sets};
pub use state::{TraversalContext, TraversalState};
pub use value::{ExtensionsDiff, ValueDiff, compare_values};
