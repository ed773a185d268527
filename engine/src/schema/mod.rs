//! Schema model consumed from the IDL compiler.
//!
//! The compiler hands over one [`Package`] per run: ordered files of ordered
//! beans. Beans are looked up package-wide by name.
//!
//! - [`Bean`] - struct, protocol (a table row) or enum
//! - [`Field`] - named, typed, tagged member of a bean
//! - [`FieldType`] - closed union of the layouts the engine understands
//! - [`EnumValue`] - one `{description, value}` choice of an enum bean
//!
//! Packages are exchanged as JSON. Field types are written as strings:
//!
//! ```json
//! { "name": "rewards", "type": "Reward[3]", "comment": "// Rewards" }
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::error::{field_location, SchemaError, SchemaResult};

// =============================================================================
// Types
// =============================================================================

/// Kind of a bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeanKind {
    Struct,
    Protocol,
    Enum,
}

impl BeanKind {
    /// Struct and protocol beans group fields into objects.
    pub fn is_composite(&self) -> bool {
        matches!(self, BeanKind::Struct | BeanKind::Protocol)
    }
}

/// Scalar types a cell can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicType {
    String,
    Int,
    Float,
    Bool,
}

impl BasicType {
    /// Resolve a type name, accepting the IDL's sized aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "byte" => Some(Self::Int),
            "float" | "float32" | "float64" | "double" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }

    /// Canonical name written into header comments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }
}

static ARRAY_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<elem>.+)\[(?P<size>[^\[\]]*)\]$").expect("valid regex"));

static BEAN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Type of a field.
///
/// `Other` keeps IDL types with no column layout (maps, vectors without a
/// size); the header builder rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Basic(BasicType),
    Array { elem: Box<FieldType>, size: String },
    Struct(String),
    Other(String),
}

impl FieldType {
    /// Parse the textual form used in schema documents.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(caps) = ARRAY_TYPE.captures(text) {
            return FieldType::Array {
                elem: Box::new(FieldType::parse(&caps["elem"])),
                size: caps["size"].trim().to_string(),
            };
        }
        if let Some(basic) = BasicType::from_name(text) {
            return FieldType::Basic(basic);
        }
        if BEAN_NAME.is_match(text) {
            return FieldType::Struct(text.to_string());
        }
        FieldType::Other(text.to_string())
    }
}

impl TryFrom<String> for FieldType {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(FieldType::parse(&value))
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Basic(basic) => f.write_str(basic.name()),
            FieldType::Array { elem, size } => write!(f, "{}[{}]", elem, size),
            FieldType::Struct(name) | FieldType::Other(name) => f.write_str(name),
        }
    }
}

// =============================================================================
// Fields and Beans
// =============================================================================

/// A field of a bean. For enum beans, `default` holds the member value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl Field {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: FieldType::parse(ty),
            tags: BTreeMap::new(),
            comment: None,
            default: None,
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Tag value, empty when absent.
    pub fn tag(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or("")
    }

    /// Comment text without the `//` marker, if any remains.
    pub fn comment_content(&self) -> Option<&str> {
        let comment = self.comment.as_deref()?.trim();
        let content = comment.strip_prefix("//").unwrap_or(comment).trim();
        (!content.is_empty()).then_some(content)
    }

    /// Human column label: comment, else `name` tag, else field name.
    pub fn label(&self) -> String {
        if let Some(content) = self.comment_content() {
            return content.to_string();
        }
        match self.tag("name") {
            "" => self.name.clone(),
            tag => tag.to_string(),
        }
    }

    /// Description of an enum member: comment, else member name.
    pub fn description(&self) -> &str {
        self.comment_content().unwrap_or(&self.name)
    }

    /// Integer value of the default expression.
    pub fn default_int(&self) -> Option<i64> {
        self.default.as_deref().and_then(parse_int_expr)
    }
}

/// A named schema type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bean {
    pub name: String,
    pub kind: BeanKind,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Bean {
    pub fn new(name: &str, kind: BeanKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fields: Vec::new(),
            extends: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_extends(mut self, base: &str) -> Self {
        self.extends.push(base.to_string());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Tag value, empty when absent.
    pub fn tag(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or("")
    }

    /// Protocol beans not opted out with `excel=false` are spreadsheet tables.
    pub fn is_table(&self) -> bool {
        self.kind == BeanKind::Protocol && self.tag("excel") != "false"
    }
}

/// One choice of an enum column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub desc: String,
    pub value: i64,
}

// =============================================================================
// Package
// =============================================================================

/// One schema source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub filename: String,
    #[serde(default)]
    pub beans: Vec<Bean>,
}

impl SchemaFile {
    /// File name without directories and extension; names the sheet directory.
    pub fn stem(&self) -> &str {
        let base = self
            .filename
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.filename);
        match base.rfind('.') {
            Some(dot) => &base[..dot],
            None => base,
        }
    }
}

/// A compiled schema package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub files: Vec<SchemaFile>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, filename: &str, beans: Vec<Bean>) -> Self {
        self.files.push(SchemaFile {
            filename: filename.to_string(),
            beans,
        });
        self
    }

    /// Parse a package from its JSON document.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a package JSON document from disk.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// All beans in declaration order.
    pub fn beans(&self) -> impl Iterator<Item = &Bean> {
        self.files.iter().flat_map(|f| f.beans.iter())
    }

    pub fn find_bean(&self, name: &str) -> Option<&Bean> {
        self.beans().find(|b| b.name == name)
    }

    /// Fields of a bean with inherited fields first, base by base.
    pub fn all_fields<'a>(&'a self, bean: &'a Bean) -> SchemaResult<Vec<&'a Field>> {
        let mut fields = Vec::new();
        let mut visiting = HashSet::new();
        self.collect_fields(bean, &mut visiting, &mut fields)?;
        Ok(fields)
    }

    fn collect_fields<'a>(
        &'a self,
        bean: &'a Bean,
        visiting: &mut HashSet<&'a str>,
        out: &mut Vec<&'a Field>,
    ) -> SchemaResult<()> {
        if !visiting.insert(bean.name.as_str()) {
            return Err(SchemaError::CyclicExtends {
                package: self.name.clone(),
                bean: bean.name.clone(),
            });
        }
        for base in &bean.extends {
            let base_bean = self
                .find_bean(base)
                .ok_or_else(|| SchemaError::UnresolvedBase {
                    package: self.name.clone(),
                    bean: bean.name.clone(),
                    base: base.clone(),
                })?;
            self.collect_fields(base_bean, visiting, out)?;
        }
        out.extend(bean.fields.iter());
        visiting.remove(bean.name.as_str());
        Ok(())
    }

    /// Field of a bean (own or inherited) by name.
    pub fn find_field<'a>(&'a self, bean: &'a Bean, name: &str) -> SchemaResult<Option<&'a Field>> {
        Ok(self.all_fields(bean)?.into_iter().find(|f| f.name == name))
    }

    /// The field whose value keys a table row.
    ///
    /// Scanning from the last field: the first `key=true` wins; otherwise the
    /// last-declared field named `id`, `ID` or `Id`; otherwise the first field.
    pub fn key_field<'a>(&'a self, bean: &'a Bean) -> SchemaResult<Option<&'a Field>> {
        let fields = self.all_fields(bean)?;
        let mut id_field = None;
        for field in fields.iter().rev() {
            if field.tag("key") == "true" {
                return Ok(Some(field));
            }
            if id_field.is_none() && matches!(field.name.as_str(), "id" | "ID" | "Id") {
                id_field = Some(*field);
            }
        }
        Ok(id_field.or_else(|| fields.first().copied()))
    }

    /// Choices of an enum bean; every member value must be an integer.
    pub fn enum_values(&self, bean: &Bean) -> SchemaResult<Vec<EnumValue>> {
        bean.fields
            .iter()
            .map(|member| {
                let raw = member.default.as_deref().unwrap_or("");
                let value = parse_int_expr(raw).ok_or_else(|| SchemaError::InvalidEnumValue {
                    location: field_location(&self.name, &bean.name, &member.name),
                    value: raw.to_string(),
                })?;
                Ok(EnumValue {
                    desc: member.description().to_string(),
                    value,
                })
            })
            .collect()
    }
}

// =============================================================================
// Literal parsing
// =============================================================================

/// Integer literal: decimal, `0x` hex, optional sign.
pub fn parse_int_expr(expr: &str) -> Option<i64> {
    let expr = expr.trim();
    let (negative, digits) = match expr.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, expr.strip_prefix('+').unwrap_or(expr)),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Boolean literal in the forms accepted by tag values and bool cells.
pub fn parse_bool_literal(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
