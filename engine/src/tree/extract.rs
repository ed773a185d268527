//! Row values from a node tree.
//!
//! A row is the list of cell texts of one data row; every leaf reads the
//! cell at its own column. Leaves with no column read as empty.

use serde_json::{Map, Value};

use super::{NodeId, NodeKind, NodeTree};
use crate::error::SchemaResult;
use crate::header::BOOL_YES;
use crate::schema::{parse_bool_literal, parse_int_expr, BasicType, Package};

/// Boolean cell: `是`, bool literals, then non-zero integers.
pub fn parse_bool_cell(text: &str) -> bool {
    if text == BOOL_YES {
        return true;
    }
    if let Some(b) = parse_bool_literal(text) {
        return b;
    }
    text.parse::<i64>().map(|n| n != 0).unwrap_or(false)
}

fn cell<'r>(tree: &NodeTree, id: NodeId, row: &'r [String]) -> &'r str {
    tree.node(id)
        .column
        .and_then(|col| row.get(col))
        .map(String::as_str)
        .unwrap_or("")
}

/// Value of node `id` in `row`.
///
/// With `require_non_empty`, non-string leaves with empty text yield `None`
/// and containers left with no members yield `None` as well.
pub fn extract(
    pkg: &Package,
    tree: &NodeTree,
    id: NodeId,
    row: &[String],
    require_non_empty: bool,
) -> Option<Value> {
    let node = tree.node(id);
    match &node.kind {
        NodeKind::Scalar(basic) => {
            let raw = cell(tree, id, row);
            if require_non_empty && raw.is_empty() && *basic != BasicType::String {
                return None;
            }
            let text = raw.trim();
            Some(match basic {
                BasicType::Int => Value::from(text.parse::<i64>().unwrap_or(0)),
                BasicType::Float => Value::from(
                    text.parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
                ),
                BasicType::Bool => Value::Bool(parse_bool_cell(text)),
                BasicType::String => Value::String(raw.to_string()),
            })
        }
        NodeKind::Enum { bean } => {
            let raw = cell(tree, id, row);
            if require_non_empty && raw.is_empty() {
                return None;
            }
            let text = raw.trim();
            if let Ok(n) = text.parse::<i64>() {
                return Some(Value::from(n));
            }
            let by_desc = pkg.find_bean(bean).and_then(|b| {
                b.fields
                    .iter()
                    .find(|member| member.description() == text)
                    .and_then(|member| member.default_int())
            });
            by_desc
                .or_else(|| node.default.as_deref().and_then(parse_int_expr))
                .map(Value::from)
        }
        NodeKind::Opaque { .. } => None,
        NodeKind::Array { .. } => {
            let items: Vec<Value> = node
                .child_ids()
                .into_iter()
                .filter_map(|child| extract(pkg, tree, child, row, require_non_empty))
                .collect();
            if require_non_empty && items.is_empty() {
                None
            } else {
                Some(Value::Array(items))
            }
        }
        NodeKind::Composite { bean } => {
            let bean = pkg.find_bean(bean);
            let mut object = Map::new();
            for child in node.child_ids() {
                let name = tree.node(child).name();
                let field = bean.and_then(|b| pkg.find_field(b, name).ok().flatten());
                let key = match field.map(|f| f.tag("name")) {
                    Some("-") => continue,
                    Some("") | None => name.to_string(),
                    Some(tag) => tag.to_string(),
                };
                if let Some(value) = extract(pkg, tree, child, row, require_non_empty) {
                    object.insert(key, value);
                }
            }
            if require_non_empty && object.is_empty() {
                None
            } else {
                Some(Value::Object(object))
            }
        }
    }
}

/// Key of a row: the key field's value, stringified and trimmed.
///
/// Empty when the key cell is empty or the bean has no fields.
pub fn row_key(pkg: &Package, tree: &NodeTree, row: &[String]) -> SchemaResult<String> {
    let bean = match tree.bean_of(pkg, NodeTree::ROOT) {
        Some(bean) => bean,
        None => return Ok(String::new()),
    };
    let field = match pkg.key_field(bean)? {
        Some(field) => field,
        None => return Ok(String::new()),
    };
    let node = match tree.find_child(NodeTree::ROOT, &field.name) {
        Some(node) => node,
        None => return Ok(String::new()),
    };
    let key = match extract(pkg, tree, node, row, true) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Ok(key.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::build_headers;
    use crate::schema::{Bean, BeanKind, Field};
    use serde_json::json;

    fn package() -> Package {
        Package::new("game").with_file(
            "item.mid",
            vec![
                Bean::new("Color", BeanKind::Enum)
                    .with_field(Field::new("RED", "int").with_default("0").with_comment("// red"))
                    .with_field(Field::new("GREEN", "int").with_default("1").with_comment("// green")),
                Bean::new("Reward", BeanKind::Struct)
                    .with_field(Field::new("kind", "int"))
                    .with_field(Field::new("count", "int").with_tag("name", "n")),
                Bean::new("Item", BeanKind::Protocol)
                    .with_field(Field::new("id", "int"))
                    .with_field(Field::new("name", "string"))
                    .with_field(Field::new("color", "Color").with_default("1"))
                    .with_field(Field::new("tint", "Color"))
                    .with_field(Field::new("rare", "bool"))
                    .with_field(Field::new("weight", "float"))
                    .with_field(Field::new("secret", "string").with_tag("name", "-"))
                    .with_field(Field::new("slots", "int[2]"))
                    .with_field(Field::new("reward", "Reward")),
            ],
        )
    }

    fn tree(pkg: &Package) -> NodeTree {
        let item = pkg.find_bean("Item").unwrap();
        let headers = build_headers(pkg, item, "", "", "").unwrap();
        let comments: Vec<String> = headers.iter().map(|h| h.comment.clone()).collect();
        NodeTree::from_comments(pkg, item, &comments, &[], &headers).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn field_value(pkg: &Package, tree: &NodeTree, name: &str, cells: &[&str], require: bool) -> Option<Value> {
        let id = tree.find_child(NodeTree::ROOT, name).unwrap();
        extract(pkg, tree, id, &row(cells), require)
    }

    #[test]
    fn test_bool_cells() {
        for yes in ["是", "1", "t", "T", "TRUE", "true", "True", "2", "-1"] {
            assert!(parse_bool_cell(yes), "{}", yes);
        }
        for no in ["否", "0", "f", "F", "FALSE", "false", "False", "", "yes", "abc"] {
            assert!(!parse_bool_cell(no), "{}", no);
        }
    }

    #[test]
    fn test_enum_resolution() {
        let pkg = package();
        let tree = tree(&pkg);
        // columns: id name color tint ...
        assert_eq!(field_value(&pkg, &tree, "color", &["", "", "1"], false), Some(json!(1)));
        assert_eq!(field_value(&pkg, &tree, "color", &["", "", "green"], false), Some(json!(1)));
        assert_eq!(field_value(&pkg, &tree, "color", &["", "", "red"], false), Some(json!(0)));
        assert_eq!(field_value(&pkg, &tree, "color", &["", "", "blue"], false), Some(json!(1)));
        assert_eq!(field_value(&pkg, &tree, "tint", &["", "", "", "blue"], false), None);
        assert_eq!(field_value(&pkg, &tree, "color", &[], true), None);
    }

    #[test]
    fn test_scalar_parsing() {
        let pkg = package();
        let tree = tree(&pkg);
        let cells = ["x", " sword ", "", "", "是", "oops"];
        assert_eq!(field_value(&pkg, &tree, "id", &cells, false), Some(json!(0)));
        assert_eq!(field_value(&pkg, &tree, "name", &cells, false), Some(json!(" sword ")));
        assert_eq!(field_value(&pkg, &tree, "rare", &cells, false), Some(json!(true)));
        assert_eq!(field_value(&pkg, &tree, "weight", &cells, false), Some(json!(0.0)));
        assert_eq!(
            field_value(&pkg, &tree, "weight", &["", "", "", "", "", "2.5"], false),
            Some(json!(2.5))
        );
        for odd in ["nan", "inf", "-Infinity"] {
            assert_eq!(
                field_value(&pkg, &tree, "weight", &["", "", "", "", "", odd], false),
                Some(json!(0.0)),
                "{}",
                odd
            );
        }
    }

    #[test]
    fn test_require_non_empty() {
        let pkg = package();
        let tree = tree(&pkg);
        assert_eq!(field_value(&pkg, &tree, "id", &[""], true), None);
        assert_eq!(field_value(&pkg, &tree, "id", &[""], false), Some(json!(0)));
        assert_eq!(field_value(&pkg, &tree, "name", &[], true), Some(json!("")));
        assert_eq!(field_value(&pkg, &tree, "slots", &[], true), None);
        assert_eq!(field_value(&pkg, &tree, "reward", &[], true), None);
        assert_eq!(field_value(&pkg, &tree, "slots", &[], false), Some(json!([0, 0])));
    }

    #[test]
    fn test_whole_row_object() {
        let pkg = package();
        let tree = tree(&pkg);
        // id name color tint rare weight secret slots.0 slots.1 reward.kind reward.count
        let cells = row(&["3", "bow", "red", "1", "否", "1.5", "hidden", "4", "", "2", "9"]);
        let value = extract(&pkg, &tree, NodeTree::ROOT, &cells, true).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "name": "bow",
                "color": 0,
                "tint": 1,
                "rare": false,
                "weight": 1.5,
                "slots": [4],
                "reward": {"kind": 2, "n": 9}
            })
        );
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys[0], "id");
        assert_eq!(keys[7], "reward");
    }

    #[test]
    fn test_arrays_of_structs_and_enums() {
        let pkg = Package::new("game").with_file(
            "loot.mid",
            vec![
                Bean::new("Color", BeanKind::Enum)
                    .with_field(Field::new("RED", "int").with_default("0").with_comment("// red"))
                    .with_field(Field::new("GREEN", "int").with_default("1").with_comment("// green")),
                Bean::new("Reward", BeanKind::Struct)
                    .with_field(Field::new("kind", "int"))
                    .with_field(Field::new("count", "int")),
                Bean::new("Loot", BeanKind::Protocol)
                    .with_field(Field::new("id", "int"))
                    .with_field(Field::new("bonus", "Reward[2]"))
                    .with_field(Field::new("palette", "Color[2]")),
            ],
        );
        let loot = pkg.find_bean("Loot").unwrap();
        let headers = build_headers(&pkg, loot, "", "", "").unwrap();
        let comments: Vec<String> = headers.iter().map(|h| h.comment.clone()).collect();
        let tree = NodeTree::from_comments(&pkg, loot, &comments, &[], &headers).unwrap();

        // id bonus.0.kind bonus.0.count bonus.1.kind bonus.1.count palette.0 palette.1
        let cells = row(&["1", "2", "3", "", "", "green", ""]);
        assert_eq!(
            extract(&pkg, &tree, NodeTree::ROOT, &cells, false).unwrap(),
            json!({
                "id": 1,
                "bonus": [{"kind": 2, "count": 3}, {"kind": 0, "count": 0}],
                "palette": [1]
            })
        );
        assert_eq!(
            extract(&pkg, &tree, NodeTree::ROOT, &cells, true).unwrap(),
            json!({
                "id": 1,
                "bonus": [{"kind": 2, "count": 3}],
                "palette": [1]
            })
        );

        let cells = row(&["1", "", "", "4", "", "0", "red"]);
        assert_eq!(
            extract(&pkg, &tree, NodeTree::ROOT, &cells, true).unwrap(),
            json!({
                "id": 1,
                "bonus": [{"kind": 4}],
                "palette": [0, 0]
            })
        );
    }

    #[test]
    fn test_row_key() {
        let pkg = package();
        let tree = tree(&pkg);
        assert_eq!(row_key(&pkg, &tree, &row(&[" 7 ", "a"])).unwrap(), "7");
        assert_eq!(row_key(&pkg, &tree, &row(&["", "a"])).unwrap(), "");

        let keyed = Package::new("game").with_file(
            "a.mid",
            vec![Bean::new("Word", BeanKind::Protocol)
                .with_field(Field::new("text", "string").with_tag("key", "true"))
                .with_field(Field::new("id", "int"))],
        );
        let bean = keyed.find_bean("Word").unwrap();
        let headers = build_headers(&keyed, bean, "", "", "").unwrap();
        let comments: Vec<String> = headers.iter().map(|h| h.comment.clone()).collect();
        let tree = NodeTree::from_comments(&keyed, bean, &comments, &[], &headers).unwrap();
        assert_eq!(row_key(&keyed, &tree, &row(&[" hello ", "1"])).unwrap(), "hello");
    }
}
