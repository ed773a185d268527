//! High-level package operations.
//!
//! - [`sync_package`] brings every table sheet of a package in line with
//!   the schema, creating missing sheets.
//! - [`export_package`] exports every table sheet as JSON and writes the
//!   manifests.
//!
//! Sheets of schema file `defs/item.mid` live in `<xlsxdir>/item/`.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetconf::{export_package, Config, CsvStore, Package, PlaceholderRenderer};
//! use std::path::Path;
//!
//! let pkg = Package::load(Path::new("schema.json"))?;
//! let config = Config::new().with("xlsxdir", "tables").with("outdir", "build");
//! let report = export_package(&pkg, &config, &CsvStore::new(), &PlaceholderRenderer)?;
//! println!("exported {} tables", report.exported);
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::export::{ExportManager, TableRenderer};
use crate::logs::{log_debug, log_info, log_success, log_warning};
use crate::schema::{Bean, Package};
use crate::sheet::{SheetStore, FIRST_DATA_ROW};
use crate::sync::{sync_sheet, SyncOutcome};

/// Counts of one [`sync_package`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub migrated: usize,
    pub unchanged: usize,
}

/// Counts and files of one [`export_package`] run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Tables exported.
    pub exported: usize,
    /// Tables skipped because their sheet is missing or empty.
    pub skipped: usize,
    /// Data rows exported over all tables.
    pub rows: usize,
    /// Payload files written.
    pub files: Vec<PathBuf>,
    /// Manifest files written.
    pub manifests: Vec<PathBuf>,
}

/// Table beans of a package with their sheet directory, in schema order.
fn tables<'a>(pkg: &'a Package, root: &Path) -> Vec<(PathBuf, &'a Bean)> {
    pkg.files
        .iter()
        .flat_map(|file| {
            let dir = root.join(file.stem());
            file.beans
                .iter()
                .filter(|bean| bean.is_table())
                .map(move |bean| (dir.clone(), bean))
        })
        .collect()
}

fn create_dir(dir: &Path) -> PipelineResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Synchronize the headers of every table sheet.
pub fn sync_package(pkg: &Package, config: &Config, store: &dyn SheetStore) -> PipelineResult<SyncReport> {
    let mut report = SyncReport::default();
    for (dir, bean) in tables(pkg, &config.xlsx_dir()) {
        let path = store.sheet_path(&dir, &bean.name);
        let mut sheet = store.open(&path)?.unwrap_or_default();

        let outcome = sync_sheet(pkg, bean, &mut sheet)?;
        match outcome {
            SyncOutcome::Created { columns } => {
                report.created += 1;
                log_info(format!("{}: created with {} columns", path.display(), columns));
            }
            SyncOutcome::Migrated { new_columns, moved_columns } => {
                report.migrated += 1;
                log_info(format!(
                    "{}: {} new columns, {} moved",
                    path.display(),
                    new_columns,
                    moved_columns
                ));
            }
            SyncOutcome::Unchanged => {
                report.unchanged += 1;
                log_debug(format!("{}: up to date", path.display()));
            }
        }
        if outcome.is_changed() {
            create_dir(&dir)?;
            store.save(&path, &sheet)?;
        }
    }
    log_success(format!(
        "Synced package {}: {} created, {} migrated, {} unchanged",
        pkg.name, report.created, report.migrated, report.unchanged
    ));
    Ok(report)
}

/// Export every table sheet of a package.
pub fn export_package(
    pkg: &Package,
    config: &Config,
    store: &dyn SheetStore,
    renderer: &dyn TableRenderer,
) -> PipelineResult<ExportReport> {
    let mut report = ExportReport::default();
    let mut manager = ExportManager::new(config, renderer);

    for (dir, bean) in tables(pkg, &config.xlsx_dir()) {
        manager.register(bean)?;

        let path = store.sheet_path(&dir, &bean.name);
        let sheet = match store.open(&path)? {
            Some(sheet) => sheet,
            None => {
                log_warning(format!("sheet file '{}' not found", path.display()));
                report.skipped += 1;
                continue;
            }
        };
        if sheet.row_count() < FIRST_DATA_ROW {
            log_warning(format!("empty sheet file '{}'", path.display()));
            report.skipped += 1;
            continue;
        }

        let export = manager.export_bean(pkg, bean, &sheet)?;
        report.exported += 1;
        report.rows += export.rows;
        report.files.extend(export.files);
    }

    report.manifests = manager.finish()?;
    log_success(format!(
        "Exported package {}: {} tables, {} rows, {} skipped",
        pkg.name, report.exported, report.rows, report.skipped
    ));
    Ok(report)
}
