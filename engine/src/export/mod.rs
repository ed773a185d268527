//! JSON export of table sheets.
//!
//! ```text
//! Sheet ──▶ collect_rows ──▶ build_payload ──▶ encode_payload ──▶ <target>/<Bean>[.<sha256>].json
//!                │                                                     │
//!                └──▶ side tables (errors / strings)                    └──▶ ManifestSet
//! ```
//!
//! Rows are keyed by the bean's key field; rows with an empty key are
//! skipped and duplicate keys are fatal. A `singleton` table exports its
//! only row as `{"row": ...}`, any other table as `{"rows": [...]}`.

pub mod manifest;
pub mod render;

pub use manifest::{checksum, FileInfo, ManifestSet};
pub use render::{PlaceholderRenderer, TableRenderer, SIDE_TABLES};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::{Config, DEFAULT_EXPORTS};
use crate::error::{ExportError, ExportResult, ExtractError};
use crate::logs::{log_debug, log_info_indent};
use crate::schema::{parse_bool_literal, Bean, Package};
use crate::sheet::{cell_name, Sheet, COMMENT_ROW, FIRST_DATA_ROW};
use crate::tree::{extract, row_key, NodeTree};

// =============================================================================
// Rows and payloads
// =============================================================================

/// Data rows of a table sheet as JSON objects, in sheet order.
pub fn collect_rows(pkg: &Package, bean: &Bean, sheet: &Sheet) -> ExportResult<Vec<Value>> {
    let comments = sheet.row_text(COMMENT_ROW);
    let mut tree = NodeTree::from_comments(pkg, bean, &comments, &[], &[])?;
    tree.sort(pkg)?;

    let mut rows = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for index in FIRST_DATA_ROW..sheet.row_count() {
        let row = sheet.row_text(index);
        let key = row_key(pkg, &tree, &row)?;
        if key.is_empty() {
            log_debug(format!("{}: row {} has no key, skipped", bean.name, cell_name(index, 0)));
            continue;
        }
        if seen.contains_key(&key) {
            return Err(ExtractError::DuplicateKey {
                bean: bean.name.clone(),
                key,
            }
            .into());
        }
        if let Some(value) = extract(pkg, &tree, NodeTree::ROOT, &row, false) {
            seen.insert(key, rows.len());
            rows.push(value);
        }
    }
    Ok(rows)
}

/// Whether a bean is tagged `singleton`.
pub fn is_singleton(bean: &Bean) -> ExportResult<bool> {
    match bean.tag("singleton") {
        "" => Ok(false),
        value => parse_bool_literal(value).ok_or_else(|| ExportError::InvalidTag {
            bean: bean.name.clone(),
            tag: "singleton".to_string(),
            value: value.to_string(),
        }),
    }
}

/// Wrap rows into the exported document.
pub fn build_payload(bean: &Bean, rows: Vec<Value>) -> ExportResult<Value> {
    if !is_singleton(bean)? {
        return Ok(json!({ "rows": rows }));
    }
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (None, _) => Ok(json!({ "row": {} })),
        (Some(row), None) => Ok(json!({ "row": row })),
        (Some(_), Some(_)) => Err(ExportError::SingletonViolation(bean.name.clone())),
    }
}

/// Export targets of a bean in tag order, duplicates and `-` removed.
pub fn export_targets(bean: &Bean) -> Vec<String> {
    let tag = bean.tag("export");
    let raw: Vec<&str> = if tag.is_empty() {
        DEFAULT_EXPORTS.to_vec()
    } else {
        tag.split(',').map(str::trim).collect()
    };
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|t| !t.is_empty() && *t != "-")
        .filter(|t| seen.insert(*t))
        .map(String::from)
        .collect()
}

// =============================================================================
// Encoding and files
// =============================================================================

/// Serialize with `indent` per level, every line after the first starting
/// with `prefix`.
pub(crate) fn encode_with_indent<T: Serialize>(value: &T, prefix: &str, indent: &str) -> ExportResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut ser)?;
    if prefix.is_empty() {
        return Ok(buf);
    }
    let mut out = Vec::with_capacity(buf.len());
    for byte in buf {
        out.push(byte);
        if byte == b'\n' {
            out.extend_from_slice(prefix.as_bytes());
        }
    }
    Ok(out)
}

/// Compact JSON when both `prefix` and `indent` are empty, indented otherwise.
pub fn encode_payload(value: &Value, prefix: &str, indent: &str) -> ExportResult<Vec<u8>> {
    if prefix.is_empty() && indent.is_empty() {
        Ok(serde_json::to_vec(value)?)
    } else {
        encode_with_indent(value, prefix, indent)
    }
}

pub(crate) fn create_parent_dir(path: &Path) -> ExportResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => create_dir(dir),
        _ => Ok(()),
    }
}

fn create_dir(dir: &Path) -> ExportResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

pub(crate) fn write_file(path: &Path, data: &[u8]) -> ExportResult<()> {
    std::fs::write(path, data).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// Export manager
// =============================================================================

/// Files produced for one bean.
#[derive(Debug, Clone, Default)]
pub struct BeanExport {
    pub rows: usize,
    pub files: Vec<PathBuf>,
}

/// Writes bean payloads for one package and accumulates manifests.
pub struct ExportManager<'a> {
    config: &'a Config,
    renderer: &'a dyn TableRenderer,
    manifests: ManifestSet,
    names: HashSet<String>,
}

impl<'a> ExportManager<'a> {
    pub fn new(config: &'a Config, renderer: &'a dyn TableRenderer) -> Self {
        Self {
            config,
            renderer,
            manifests: ManifestSet::new(),
            names: HashSet::new(),
        }
    }

    /// Claim a table name; a name may be exported once per package.
    pub fn register(&mut self, bean: &Bean) -> ExportResult<()> {
        if !self.names.insert(bean.name.clone()) {
            return Err(ExportError::DuplicateBean(bean.name.clone()));
        }
        Ok(())
    }

    /// Export one table sheet to all of the bean's targets.
    pub fn export_bean(&mut self, pkg: &Package, bean: &Bean, sheet: &Sheet) -> ExportResult<BeanExport> {
        let rows = collect_rows(pkg, bean, sheet)?;
        let count = rows.len();
        let targets = export_targets(bean);

        if !is_singleton(bean)? {
            self.render_side_tables(bean, &targets, &rows)?;
        }
        let payload = build_payload(bean, rows)?;
        let data = encode_payload(&payload, self.config.json_prefix(), self.config.json_indent())?;
        let files = self.write_payload(&bean.name, &targets, &data)?;
        Ok(BeanExport { rows: count, files })
    }

    /// Write encoded payload `data` of `bean` into every target directory.
    pub fn write_payload(&mut self, bean: &str, targets: &[String], data: &[u8]) -> ExportResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for target in targets {
            let dir = self.config.export_dir(target);
            create_dir(&dir)?;
            let filename = if self.config.manifest_path(target).is_some() {
                let info = FileInfo::new(bean, data);
                let filename = info.filename.clone();
                self.manifests.add(target, info);
                filename
            } else {
                format!("{}.json", bean)
            };
            let path = dir.join(filename);
            write_file(&path, data)?;
            log_info_indent(format!("{} -> {}", bean, path.display()), 1);
            files.push(path);
        }
        Ok(files)
    }

    fn render_side_tables(&self, bean: &Bean, targets: &[String], rows: &[Value]) -> ExportResult<()> {
        for kind in SIDE_TABLES {
            if self.config.side_table(kind) != bean.name {
                continue;
            }
            for target in targets {
                let Some((template, output)) = self.config.side_table_files(kind, target) else {
                    continue;
                };
                let render_err = |message: String| ExportError::Render {
                    kind: kind.to_string(),
                    message,
                };
                let source = std::fs::read_to_string(&template)
                    .map_err(|e| render_err(format!("{}: {}", template.display(), e)))?;
                let text = self.renderer.render(&source, rows).map_err(render_err)?;
                create_parent_dir(&output)?;
                write_file(&output, text.as_bytes())?;
                log_info_indent(format!("{} {} -> {}", kind, bean.name, output.display()), 1);
            }
        }
        Ok(())
    }

    pub fn manifests(&self) -> &ManifestSet {
        &self.manifests
    }

    /// Write the accumulated manifests.
    pub fn finish(self) -> ExportResult<Vec<PathBuf>> {
        self.manifests.write_all(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BeanKind, Field};
    use tempfile::tempdir;

    fn package(bean: Bean) -> Package {
        Package::new("game").with_file("item.mid", vec![bean])
    }

    fn item() -> Bean {
        Bean::new("Item", BeanKind::Protocol)
            .with_field(Field::new("id", "int"))
            .with_field(Field::new("name", "string"))
    }

    fn sheet(data: &[[&str; 2]]) -> Sheet {
        let mut rows = vec![vec!["id(int)", "name(string)"], vec!["ID", "Name"]];
        rows.extend(data.iter().map(|r| r.to_vec()));
        Sheet::from_rows(rows)
    }

    #[test]
    fn test_item_table_end_to_end() {
        let pkg = package(item());
        let bean = pkg.find_bean("Item").unwrap();
        let rows = collect_rows(&pkg, bean, &sheet(&[["1", "sword"], ["2", "shield"]])).unwrap();
        let payload = build_payload(bean, rows).unwrap();
        let data = encode_payload(&payload, "", "").unwrap();
        assert_eq!(
            String::from_utf8(data).unwrap(),
            r#"{"rows":[{"id":1,"name":"sword"},{"id":2,"name":"shield"}]}"#
        );
    }

    #[test]
    fn test_duplicate_key() {
        let pkg = package(item());
        let bean = pkg.find_bean("Item").unwrap();
        let err = collect_rows(&pkg, bean, &sheet(&[["7", "a"], ["7", "b"]])).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Extract(ExtractError::DuplicateKey { ref key, .. }) if key == "7"
        ));
        assert_eq!(err.to_string(), "id \"7\" duplicated in table Item");
    }

    #[test]
    fn test_rows_without_key_are_skipped() {
        let pkg = package(item());
        let bean = pkg.find_bean("Item").unwrap();
        let rows = collect_rows(&pkg, bean, &sheet(&[["", "ghost"], ["3", "bow"], ["", ""]])).unwrap();
        assert_eq!(rows, vec![json!({"id": 3, "name": "bow"})]);
    }

    #[test]
    fn test_singleton_payloads() {
        let bean = item().with_tag("singleton", "true");
        assert_eq!(build_payload(&bean, vec![]).unwrap(), json!({"row": {}}));
        assert_eq!(
            build_payload(&bean, vec![json!({"id": 1})]).unwrap(),
            json!({"row": {"id": 1}})
        );
        let err = build_payload(&bean, vec![json!({"id": 1}), json!({"id": 2})]).unwrap_err();
        assert_eq!(err.to_string(), "singleton Item has more than one values");

        let not_singleton = item().with_tag("singleton", "0");
        assert_eq!(build_payload(&not_singleton, vec![]).unwrap(), json!({"rows": []}));

        let bad = item().with_tag("singleton", "maybe");
        assert!(matches!(build_payload(&bad, vec![]), Err(ExportError::InvalidTag { .. })));
    }

    #[test]
    fn test_encode_with_prefix() {
        let value = json!({"a": [1]});
        let data = encode_payload(&value, ">", "  ").unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "{\n>  \"a\": [\n>    1\n>  ]\n>}");

        let data = encode_payload(&value, "", "\t").unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "{\n\t\"a\": [\n\t\t1\n\t]\n}");
    }

    #[test]
    fn test_export_targets() {
        assert_eq!(export_targets(&item()), vec!["client", "server"]);
        assert_eq!(
            export_targets(&item().with_tag("export", "client,client,-,,web")),
            vec!["client", "web"]
        );
        assert!(export_targets(&item().with_tag("export", "-")).is_empty());
    }

    #[test]
    fn test_manager_writes_targets_and_manifest() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let manifest = dir.path().join("manifests/client.json");
        let server_dir = dir.path().join("srv");
        let config = Config::new()
            .with("outdir", out.to_str().unwrap())
            .with("exported-server-dir", server_dir.to_str().unwrap())
            .with("manifest-client", manifest.to_str().unwrap());

        let pkg = package(item());
        let bean = pkg.find_bean("Item").unwrap();
        let table = sheet(&[["1", "sword"]]);

        let run = || {
            let mut manager = ExportManager::new(&config, &PlaceholderRenderer);
            manager.register(bean).unwrap();
            let export = manager.export_bean(&pkg, bean, &table).unwrap();
            let info = manager.manifests().files("client")[0].clone();
            manager.finish().unwrap();
            (export, info)
        };

        let (export, info) = run();
        assert_eq!(export.rows, 1);
        assert_eq!(export.files.len(), 2);
        let client_file = out.join("client").join(&info.filename);
        assert!(client_file.exists());
        assert!(server_dir.join("Item.json").exists());
        assert_eq!(info.checksum, checksum(&std::fs::read(&client_file).unwrap()));

        let first = std::fs::read_to_string(&manifest).unwrap();
        let (_, again) = run();
        assert_eq!(again, info);
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), first);
    }

    #[test]
    fn test_duplicate_registration() {
        let config = Config::new();
        let mut manager = ExportManager::new(&config, &PlaceholderRenderer);
        let bean = item();
        manager.register(&bean).unwrap();
        let err = manager.register(&bean).unwrap_err();
        assert_eq!(err.to_string(), "protocol Item duplicated");
    }

    #[test]
    fn test_side_table_rendering() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("errors.tpl");
        std::fs::write(&template, "const ERRORS = {{rows}};").unwrap();
        let output = dir.path().join("gen/errors.ts");
        let config = Config::new()
            .with("outdir", dir.path().join("out").to_str().unwrap())
            .with("errors-table", "Item")
            .with("errors-client-template", template.to_str().unwrap())
            .with("errors-client-output", output.to_str().unwrap());

        let pkg = package(item());
        let bean = pkg.find_bean("Item").unwrap();
        let mut manager = ExportManager::new(&config, &PlaceholderRenderer);
        manager.export_bean(&pkg, bean, &sheet(&[["1", "no gold"]])).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("const ERRORS = ["));
        assert!(text.contains("\"no gold\""));
    }

    #[test]
    fn test_missing_template_is_render_error() {
        let dir = tempdir().unwrap();
        let config = Config::new()
            .with("outdir", dir.path().to_str().unwrap())
            .with("strings-table", "Item")
            .with("strings-server-template", dir.path().join("none.tpl").to_str().unwrap())
            .with("strings-server-output", dir.path().join("s.txt").to_str().unwrap());
        let pkg = package(item());
        let bean = pkg.find_bean("Item").unwrap();
        let mut manager = ExportManager::new(&config, &PlaceholderRenderer);
        let err = manager.export_bean(&pkg, bean, &sheet(&[])).unwrap_err();
        assert!(err.to_string().starts_with("generate strings error"));
    }
}
