use thiserror::Error;

/// Errors raised while walking definition records during [`crate::builder::Root::define`] or
/// [`crate::builder::Root::create`] (the ingestion engine).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum BuildError {
    #[error("illegal namespace: {0:?}")]
    IllegalNamespace(String),

    #[error("duplicate field id {id} in message {message}")]
    DuplicateFieldId { message: String, id: i32 },

    #[error("field options on {field} are not a mapping")]
    IllegalOptions { field: String },

    #[error("field {field} references undeclared oneof {oneof:?}")]
    IllegalOneof { field: String, oneof: String },

    #[error("extension field id {id} is outside the extension range of {message}")]
    IllegalExtensionRange { message: String, id: i32 },

    #[error("extended message {0:?} is not defined")]
    ExtendedNotDefined(String),

    #[error("not a valid definition: {0}")]
    InvalidDefinition(String),
}

/// Errors raised by the resolution pass, [`crate::builder::Root::resolve_all`].
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ResolveError {
    #[error("unresolvable type {0:?}")]
    UnresolvableType(String),

    #[error("map key type {0:?} is not a builtin")]
    IllegalKeyType(String),

    #[error("proto3 field {field} references proto2 enum {r#enum}")]
    SyntaxMismatch { field: String, r#enum: String },
}

/// Errors raised by the import composer, [`crate::builder::Root::import`].
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ImportError {
    #[error("import {0:?} not found")]
    ImportMissing(String),

    #[error("cannot resolve relative import {import:?}: no filename context is known")]
    ImportRootUnknown { import: String },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
