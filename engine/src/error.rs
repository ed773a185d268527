//! Error types for the sheetconf engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SchemaError`] - Schema resolution and header layout errors
//! - [`SheetError`] - Spreadsheet store errors
//! - [`ExtractError`] - Row extraction errors
//! - [`ExportError`] - JSON export and manifest errors
//! - [`ConfigError`] - Configuration loading errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while resolving beans or laying out headers.
///
/// Field-level variants carry a `<package>.<bean>::<field>` location.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A bean listed in `extends` does not exist in the package.
    #[error("extended type '{base}' of '{package}.{bean}' not found")]
    UnresolvedBase {
        package: String,
        bean: String,
        base: String,
    },

    /// A struct or enum field type does not exist in the package.
    #[error("type of field '{location}' not found")]
    UnresolvedType { location: String },

    /// Array element type does not exist in the package.
    #[error("element type of array field '{location}' not found")]
    UnresolvedElement { location: String },

    /// Array size is not an integer in [1, 128).
    #[error("invalid size of array field '{location}'")]
    InvalidArraySize { location: String },

    /// The field type cannot be laid out as columns.
    #[error("unsupported type of field '{location}'")]
    UnsupportedType { location: String },

    /// An enum member value is not an integer literal.
    #[error("invalid enum value '{value}' of '{location}'")]
    InvalidEnumValue { location: String, value: String },

    /// A struct contains itself through its fields, directly or nested.
    #[error("recursive type of field '{location}'")]
    RecursiveType { location: String },

    /// A bean extends itself, directly or through its bases.
    #[error("cyclic extends chain at '{package}.{bean}'")]
    CyclicExtends { package: String, bean: String },

    /// The bean is not present in the package.
    #[error("bean '{0}' not found")]
    BeanNotFound(String),

    /// Schema document could not be read.
    #[error("schema file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed schema document.
    #[error("invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Sheet Errors
// =============================================================================

/// Errors from a spreadsheet store.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read or write the sheet file.
    #[error("sheet file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited text could not be parsed or written.
    #[error("sheet file '{path}': {message}")]
    Format { path: PathBuf, message: String },
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors while turning rows into records.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Two data rows share the same non-empty key.
    #[error("id {key:?} duplicated in table {bean}")]
    DuplicateKey { bean: String, key: String },

    /// Schema error surfaced while walking the tree.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing JSON payloads and manifests.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The same protocol name appears twice in one package.
    #[error("protocol {0} duplicated")]
    DuplicateBean(String),

    /// A singleton table holds more than one row.
    #[error("singleton {0} has more than one values")]
    SingletonViolation(String),

    /// A tag value cannot be interpreted.
    #[error("invalid {tag} tag of {bean}: {value:?}")]
    InvalidTag {
        bean: String,
        tag: String,
        value: String,
    },

    /// Output directory or file failure.
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A side-table template could not be rendered.
    #[error("generate {kind} error: {message}")]
    Render { kind: String, message: String },

    /// Row extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl From<SchemaError> for ExportError {
    fn from(err: SchemaError) -> Self {
        ExportError::Extract(ExtractError::Schema(err))
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not a flat JSON object of strings.
    #[error("config file '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `key=value` pair is malformed.
    #[error("invalid config pair {0:?}, expected key=value")]
    InvalidPair(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors returned by [`crate::pipeline`] entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("create directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ExtractError> for PipelineError {
    fn from(err: ExtractError) -> Self {
        PipelineError::Export(ExportError::Extract(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for sheet store operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Formats the `<package>.<bean>::<field>` location used in schema errors.
pub fn field_location(package: &str, bean: &str, field: &str) -> String {
    format!("{}.{}::{}", package, bean, field)
}
