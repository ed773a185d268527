//! # Sheetconf - schema-driven spreadsheet config tables
//!
//! Sheetconf keeps one spreadsheet per table bean of a schema package in
//! line with the schema, and exports the filled-in sheets as JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Package   │────▶│   Headers   │────▶│    Sync     │────▶│   Sheets    │
//! │   (JSON)    │     │ (flattened) │     │ (migrate)   │     │ (CSV, auto) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐            │
//!                     │ JSON + mani-│◀────│  Node tree  │◀───────────┘
//!                     │ fests       │     │  (extract)  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetconf::{sync_package, Config, CsvStore, Package};
//!
//! let pkg = Package::load("schema.json".as_ref())?;
//! let config = Config::new().with("xlsxdir", "tables");
//! let report = sync_package(&pkg, &config, &CsvStore::new())?;
//! println!("{} sheets migrated", report.migrated);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`schema`] - Package, bean and field model
//! - [`header`] - Flattened column layout of a bean
//! - [`sheet`] - Sheet grid and CSV store with encoding detection
//! - [`tree`] - Node tree over header comments, row value extraction
//! - [`sync`] - Header synchronization and column migration
//! - [`export`] - JSON payloads, manifests, side tables
//! - [`config`] - Layered key/value configuration
//! - [`pipeline`] - Package-level sync and export
//! - [`logs`] - Log broadcasting

// Core modules
pub mod error;
pub mod logs;
pub mod schema;

// Layout
pub mod header;
pub mod sheet;
pub mod tree;

// Operations
pub mod export;
pub mod sync;

// Orchestration
pub mod config;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    ExtractError,
    PipelineError,
    SchemaError,
    SheetError,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{
    BasicType,
    Bean,
    BeanKind,
    EnumValue,
    Field,
    FieldType,
    Package,
    SchemaFile,
};

// =============================================================================
// Re-exports - Layout
// =============================================================================

pub use header::{build_headers, Header};
pub use sheet::{CellValue, CsvStore, Sheet, SheetStore};
pub use tree::{NodeKind, NodeTree};

// =============================================================================
// Re-exports - Operations
// =============================================================================

pub use sync::{sync_sheet, SyncOutcome};

pub use export::{
    build_payload,
    collect_rows,
    encode_payload,
    ExportManager,
    FileInfo,
    ManifestSet,
    PlaceholderRenderer,
    TableRenderer,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::Config;

pub use pipeline::{
    export_package,
    sync_package,
    ExportReport,
    SyncReport,
};
