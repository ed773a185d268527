//! Flattened column layout of a table bean.
//!
//! Every leaf value of a bean becomes one column. Its [`Header`] carries the
//! human label and a dotted comment path whose segments annotate types:
//!
//! ```text
//! Item { id int; reward Reward; tags string[2] }     Reward { count int }
//!
//! id(int)   reward(Reward).count(int)   tags(string[]).0   tags(string[]).1
//! ```
//!
//! Splitting a comment on `.` rebuilds the node tree shape, which is what the
//! synchronizer relies on to recognize existing columns.

use serde::Serialize;

use crate::error::{field_location, SchemaError, SchemaResult};
use crate::schema::{BasicType, Bean, BeanKind, EnumValue, Field, FieldType, Package};

/// Valid array sizes.
pub const ARRAY_SIZE_RANGE: std::ops::Range<i64> = 1..128;

/// Choices offered for bool columns.
pub const BOOL_YES: &str = "是";
pub const BOOL_NO: &str = "否";

pub fn bool_enums() -> Vec<EnumValue> {
    vec![
        EnumValue { desc: BOOL_YES.to_string(), value: 1 },
        EnumValue { desc: BOOL_NO.to_string(), value: 0 },
    ]
}

/// One spreadsheet column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    /// Label shown in the label row.
    pub name: String,
    /// Type name of the leaf value.
    #[serde(rename = "type")]
    pub ty: String,
    /// Dotted comment path.
    pub comment: String,
    /// Choices for enum and bool columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumValue>,
}

fn suffix(i: usize) -> String {
    if i == 0 {
        String::new()
    } else {
        format!("_{}", i)
    }
}

/// Build the headers of `bean`.
///
/// `path_prefix` is prepended to comment paths; `name_prefix`/`name_suffix`
/// wrap labels. Top-level calls pass empty strings.
pub fn build_headers(
    pkg: &Package,
    bean: &Bean,
    path_prefix: &str,
    name_prefix: &str,
    name_suffix: &str,
) -> SchemaResult<Vec<Header>> {
    let mut headers = Vec::new();
    let mut chain = Vec::new();
    build_bean(pkg, bean, path_prefix, name_prefix, name_suffix, &mut chain, &mut headers)?;
    Ok(headers)
}

/// Lay out `bean`; `chain` holds the beans being expanded above it.
fn build_bean(
    pkg: &Package,
    bean: &Bean,
    path_prefix: &str,
    name_prefix: &str,
    name_suffix: &str,
    chain: &mut Vec<String>,
    out: &mut Vec<Header>,
) -> SchemaResult<()> {
    chain.push(bean.name.clone());
    for field in pkg.all_fields(bean)? {
        build_field(pkg, bean, field, path_prefix, name_prefix, name_suffix, chain, out)?;
    }
    chain.pop();
    Ok(())
}

fn check_recursion(
    chain: &[String],
    target: &Bean,
    location: impl Fn() -> String,
) -> SchemaResult<()> {
    if chain.iter().any(|name| *name == target.name) {
        return Err(SchemaError::RecursiveType { location: location() });
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_field(
    pkg: &Package,
    bean: &Bean,
    field: &Field,
    path_prefix: &str,
    name_prefix: &str,
    name_suffix: &str,
    chain: &mut Vec<String>,
    out: &mut Vec<Header>,
) -> SchemaResult<()> {
    let location = || field_location(&pkg.name, &bean.name, &field.name);
    let label = field.label();

    match &field.ty {
        FieldType::Basic(basic) => {
            out.push(Header {
                name: format!("{}{}{}", name_prefix, label, name_suffix),
                ty: basic.name().to_string(),
                comment: format!("{}{}({})", path_prefix, field.name, basic.name()),
                enums: if *basic == BasicType::Bool { bool_enums() } else { Vec::new() },
            });
        }
        FieldType::Struct(type_name) => {
            let target = pkg
                .find_bean(type_name)
                .ok_or_else(|| SchemaError::UnresolvedType { location: location() })?;
            match target.kind {
                BeanKind::Enum => out.push(Header {
                    name: format!("{}{}{}", name_prefix, label, name_suffix),
                    ty: target.name.clone(),
                    comment: format!("{}{}({})", path_prefix, field.name, target.name),
                    enums: pkg.enum_values(target)?,
                }),
                BeanKind::Struct | BeanKind::Protocol => {
                    check_recursion(chain, target, location)?;
                    let prefix = format!("{}{}({}).", path_prefix, field.name, target.name);
                    build_bean(
                        pkg,
                        target,
                        &prefix,
                        &format!("{}{}", name_prefix, label),
                        name_suffix,
                        chain,
                        out,
                    )?;
                }
            }
        }
        FieldType::Array { elem, size } => {
            let size = crate::schema::parse_int_expr(size)
                .filter(|n| ARRAY_SIZE_RANGE.contains(n))
                .ok_or_else(|| SchemaError::InvalidArraySize { location: location() })?
                as usize;

            match elem.as_ref() {
                FieldType::Basic(basic) => {
                    let context = format!("{}{}({}[])", path_prefix, field.name, basic.name());
                    for i in 0..size {
                        out.push(Header {
                            name: format!("{}{}{}_{}", name_prefix, label, name_suffix, i + 1),
                            ty: basic.name().to_string(),
                            comment: format!("{}.{}", context, i),
                            enums: if *basic == BasicType::Bool { bool_enums() } else { Vec::new() },
                        });
                    }
                }
                FieldType::Struct(type_name) => {
                    let target = pkg
                        .find_bean(type_name)
                        .ok_or_else(|| SchemaError::UnresolvedElement { location: location() })?;
                    let context = format!("{}{}({}[])", path_prefix, field.name, target.name);
                    let prefix = format!("{}{}", name_prefix, label);
                    match target.kind {
                        BeanKind::Enum => {
                            let enums = pkg.enum_values(target)?;
                            for i in 0..size {
                                out.push(Header {
                                    name: format!("{}{}{}", prefix, name_suffix, suffix(i + 1)),
                                    ty: target.name.clone(),
                                    comment: format!("{}.{}", context, i),
                                    enums: enums.clone(),
                                });
                            }
                        }
                        BeanKind::Struct | BeanKind::Protocol => {
                            check_recursion(chain, target, location)?;
                            for i in 0..size {
                                build_bean(
                                    pkg,
                                    target,
                                    &format!("{}.{}.", context, i),
                                    &prefix,
                                    &format!("{}{}", name_suffix, suffix(i + 1)),
                                    chain,
                                    out,
                                )?;
                            }
                        }
                    }
                }
                FieldType::Array { .. } | FieldType::Other(_) => {
                    return Err(SchemaError::UnsupportedType { location: location() });
                }
            }
        }
        FieldType::Other(_) => {
            return Err(SchemaError::UnsupportedType { location: location() });
        }
    }
    Ok(())
}
