//! Per-target manifests of checksummed export files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{create_parent_dir, encode_with_indent, write_file};
use crate::config::Config;
use crate::error::ExportResult;

/// One exported file listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Bean name.
    pub name: String,
    /// Lowercase hex SHA-256 of the file content.
    pub checksum: String,
    /// File name, `<Bean>.<checksum>.json`.
    pub filename: String,
}

impl FileInfo {
    pub fn new(bean: &str, data: &[u8]) -> Self {
        let checksum = checksum(data);
        Self {
            name: bean.to_string(),
            filename: format!("{}.{}.json", bean, checksum),
            checksum,
        }
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    files: &'a [FileInfo],
}

/// Lowercase hex SHA-256 of `data`.
pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Files exported per target during one package export.
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    targets: BTreeMap<String, Vec<FileInfo>>,
}

impl ManifestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: &str, info: FileInfo) {
        self.targets.entry(target.to_string()).or_default().push(info);
    }

    pub fn files(&self, target: &str) -> &[FileInfo] {
        self.targets.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Write each target's manifest to its configured path.
    ///
    /// Returns the written paths in target order.
    pub fn write_all(&self, config: &Config) -> ExportResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (target, files) in &self.targets {
            let Some(path) = config.manifest_path(target) else {
                continue;
            };
            let content = encode_with_indent(&Manifest { files }, "", "    ")?;
            create_parent_dir(&path)?;
            write_file(&path, &content)?;
            written.push(path);
        }
        Ok(written)
    }
}
