// Copyright 2025 Oxide Computer Company

use thiserror::Error;

/// Unrecoverable comparison failures.
///
/// Any of these aborts the comparison run as a whole: a returned diff is
/// never partially computed.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A media type string could not be parsed into type/subtype/suffixes.
    #[error("malformed media type {text:?}: {detail}")]
    MalformedMediaType { text: String, detail: String },

    /// A reference whose target is absent from the document's schema
    /// registry. This is a dangling pointer, not a cycle; cycles are a
    /// reportable diff outcome, not an error.
    #[error("unresolved reference {reference:?}")]
    UnresolvedReference { reference: String },

    /// A virtual parameter was synthesized against a property name that the
    /// exploded parameter's schema does not define.
    #[error("property {property:?} is not defined by exploded parameter {parameter:?}")]
    InvalidExplodedProperty { parameter: String, property: String },
}
