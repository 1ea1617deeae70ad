//! Error types shared by the TVN and column-mapping engines.
//!
//! Coercion and column conversion are total for every known type; the
//! variants here cover the cases that indicate corrupted state or a
//! schema/version mismatch and must not be swallowed.

use thiserror::Error;

use crate::tvn::TvnDiagnostic;

#[derive(Debug, Error)]
pub enum TvnError {
    /// Input to a deconversion was neither a TypedValue nor a wrapper.
    #[error("Invalid TypeValueNotation: {0}")]
    InvalidTvn(TvnDiagnostic),

    /// Coercion target that has no conversion rule.
    #[error("Could not get conversion function for type '{0}'")]
    UnsupportedType(String),

    /// Copy-on-write edit addressed a node that does not exist.
    #[error("Invalid TypeValueNotation path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// A column type declared a data type the transform engine does not know.
    #[error("Unknown column data type '{data_type}' for column type '{column_type}'")]
    UnknownColumnType {
        column_type: String,
        data_type: String,
    },

    #[error("Raw column '{column}' would overwrite output column '{name}'")]
    DuplicateOutputColumn { name: String, column: String },
}
