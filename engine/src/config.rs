//! Key/value configuration.
//!
//! Every setting is a string looked up by key; absent keys read as empty.
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. JSON config file (flat object)
//! 2. Environment: `SHEETCONF_<KEY>` with `_` read as `-`
//! 3. `key=value` pairs from the command line
//!
//! ```text
//! SHEETCONF_EXPORTED_CLIENT_DIR=out/c   ->   exported-client-dir = out/c
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::parse_bool_literal;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "SHEETCONF_";

/// Export targets used when a bean has no `export` tag.
pub const DEFAULT_EXPORTS: [&str; 2] = ["client", "server"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a flat JSON object. Non-string scalars are stored as their text.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, Value> =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let values = raw
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();
        Ok(Self { values })
    }

    /// Overlay `SHEETCONF_*` pairs from an environment listing.
    pub fn merge_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(rest) = name.strip_prefix(ENV_PREFIX) {
                if rest.is_empty() {
                    continue;
                }
                let key = rest.to_lowercase().replace('_', "-");
                self.values.insert(key, value);
            }
        }
    }

    /// Overlay the process environment.
    pub fn merge_process_env(&mut self) {
        self.merge_env(std::env::vars());
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Apply a `key=value` pair.
    pub fn set_pair(&mut self, pair: &str) -> ConfigResult<()> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                self.set(key.trim(), value);
                Ok(())
            }
            _ => Err(ConfigError::InvalidPair(pair.to_string())),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Value of a key, empty when unset.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    fn path_or(&self, key: &str, default: &str) -> PathBuf {
        match self.get(key) {
            "" => PathBuf::from(default),
            value => PathBuf::from(value),
        }
    }

    // -------------------------------------------------------------------------
    // Typed accessors
    // -------------------------------------------------------------------------

    /// Root directory of the sheets.
    pub fn xlsx_dir(&self) -> PathBuf {
        self.path_or("xlsxdir", ".")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path_or("outdir", ".")
    }

    pub fn json_prefix(&self) -> &str {
        self.get("jsonprefix")
    }

    pub fn json_indent(&self) -> &str {
        self.get("jsonindent")
    }

    pub fn verbose(&self) -> bool {
        parse_bool_literal(self.get("verbose")).unwrap_or(false)
    }

    /// Manifest path of an export target, if the target keeps one.
    pub fn manifest_path(&self, target: &str) -> Option<PathBuf> {
        match self.get(&format!("manifest-{}", target)) {
            "" => None,
            path => Some(PathBuf::from(path)),
        }
    }

    /// Output directory of an export target.
    pub fn export_dir(&self, target: &str) -> PathBuf {
        match self.get(&format!("exported-{}-dir", target)) {
            "" => self.out_dir().join(target),
            dir => PathBuf::from(dir),
        }
    }

    /// Bean name configured as the `errors` or `strings` side table.
    pub fn side_table(&self, kind: &str) -> &str {
        self.get(&format!("{}-table", kind))
    }

    /// Template and output paths of a side table for one target.
    pub fn side_table_files(&self, kind: &str, target: &str) -> Option<(PathBuf, PathBuf)> {
        let template = self.get(&format!("{}-{}-template", kind, target));
        let output = self.get(&format!("{}-{}-output", kind, target));
        if template.is_empty() || output.is_empty() {
            None
        } else {
            Some((PathBuf::from(template), PathBuf::from(output)))
        }
    }
}
