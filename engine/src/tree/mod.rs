//! Node tree mirroring header comment paths.
//!
//! The tree is built once per table, either from the comment row of an
//! existing sheet or from freshly computed headers, and then read-only while
//! rows are extracted. Leaves remember the column they were read from, so a
//! data row is just a slice of cell texts addressed by those columns.
//!
//! Nodes live in an arena owned by [`NodeTree`]; parents and children refer
//! to each other by [`NodeId`].

pub mod extract;

pub use extract::{extract, parse_bool_cell, row_key};

use crate::error::SchemaResult;
use crate::header::Header;
use crate::logs::log_debug;
use crate::schema::{BasicType, Bean, BeanKind, Package};

/// Index of a node in its tree's arena.
pub type NodeId = usize;

/// What a node stands for, resolved from its type annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Struct or protocol value; children keyed by segment text.
    Composite { bean: String },
    /// Fixed-size array; children indexed by position.
    Array { elem: String },
    /// Basic scalar column.
    Scalar(BasicType),
    /// Enum column.
    Enum { bean: String },
    /// Type annotation no longer resolves.
    Opaque { ty: String },
}

/// Column a leaf was found in when the tree was read from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMark {
    pub column: usize,
    pub comment: String,
    pub label: String,
}

#[derive(Debug, Clone)]
enum Children {
    Keyed(Vec<(String, NodeId)>),
    Indexed(Vec<Option<NodeId>>),
}

#[derive(Debug, Clone)]
pub struct Node {
    /// Path segment, e.g. `reward(Reward)` or `0`.
    pub segment: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Default expression of the declaring field.
    pub default: Option<String>,
    /// Sheet column holding this leaf's raw text.
    pub column: Option<usize>,
    /// Where the leaf sat before synchronization.
    pub mark: Option<ColumnMark>,
    /// Current header of the leaf, if the schema still has it.
    pub header: Option<Header>,
    children: Children,
}

impl Node {
    /// Field name part of the segment.
    pub fn name(&self) -> &str {
        name_of_segment(&self.segment)
    }

    /// Leaves map one-to-one to spreadsheet columns. A container without
    /// children counts as a leaf so its column is not dropped.
    pub fn is_leaf(&self) -> bool {
        match self.kind {
            NodeKind::Scalar(_) | NodeKind::Enum { .. } => true,
            _ => self.child_ids().is_empty(),
        }
    }

    /// Children in order; holes of an array are skipped.
    pub fn child_ids(&self) -> Vec<NodeId> {
        match &self.children {
            Children::Keyed(list) => list.iter().map(|(_, id)| *id).collect(),
            Children::Indexed(slots) => slots.iter().flatten().copied().collect(),
        }
    }
}

/// Name before the type annotation: `reward(Reward)` -> `reward`.
pub fn name_of_segment(segment: &str) -> &str {
    match segment.find('(') {
        Some(i) => &segment[..i],
        None => segment,
    }
}

/// Text inside the first parentheses, or the whole segment.
pub fn type_of_segment(segment: &str) -> &str {
    let start = segment.find('(').map(|i| i + 1).unwrap_or(0);
    let end = segment.find(')').unwrap_or(segment.len());
    if start <= end {
        &segment[start..end]
    } else {
        ""
    }
}

/// Arena tree rooted at a table bean.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub const ROOT: NodeId = 0;

    pub fn new(bean: &Bean) -> Self {
        let root = Node {
            segment: bean.name.clone(),
            kind: NodeKind::Composite { bean: bean.name.clone() },
            parent: None,
            default: None,
            column: None,
            mark: None,
            header: None,
            children: Children::Keyed(Vec::new()),
        };
        Self { nodes: vec![root] }
    }

    /// Tree of the comment row of a sheet.
    ///
    /// Columns are read left to right until the first empty comment. Each
    /// leaf records its column and previous label; when `headers` are given,
    /// leaves whose path matches a header are linked to it.
    pub fn from_comments(
        pkg: &Package,
        bean: &Bean,
        comments: &[String],
        labels: &[String],
        headers: &[Header],
    ) -> SchemaResult<Self> {
        let mut tree = Self::new(bean);
        for (column, comment) in comments.iter().enumerate() {
            let comment = comment.trim();
            if comment.is_empty() {
                log_debug(format!(
                    "comment of column {} in '{}' is empty, stop reading",
                    crate::sheet::column_name(column),
                    bean.name
                ));
                break;
            }
            let leaf = tree.insert_path(pkg, comment)?;
            let node = &mut tree.nodes[leaf];
            node.column = Some(column);
            node.mark = Some(ColumnMark {
                column,
                comment: comment.to_string(),
                label: labels.get(column).cloned().unwrap_or_default(),
            });
            if let Some(header) = headers.iter().find(|h| h.comment == comment) {
                node.header = Some(header.clone());
            }
        }
        Ok(tree)
    }

    /// Tree of freshly built headers, no columns attached.
    pub fn from_headers(pkg: &Package, bean: &Bean, headers: &[Header]) -> SchemaResult<Self> {
        let mut tree = Self::new(bean);
        for header in headers {
            tree.graft(pkg, header)?;
        }
        Ok(tree)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Walk or create the nodes along a dotted comment path.
    pub fn insert_path(&mut self, pkg: &Package, comment: &str) -> SchemaResult<NodeId> {
        let mut current = Self::ROOT;
        for segment in comment.split('.') {
            current = self.add_child(pkg, current, segment)?;
        }
        Ok(current)
    }

    /// Graft a header; returns the leaf and whether it was created now.
    pub fn graft(&mut self, pkg: &Package, header: &Header) -> SchemaResult<(NodeId, bool)> {
        let leaf = self.insert_path(pkg, &header.comment)?;
        let node = &mut self.nodes[leaf];
        let is_new = node.mark.is_none() && node.header.is_none();
        if node.header.is_none() {
            node.header = Some(header.clone());
        }
        Ok((leaf, is_new))
    }

    /// Child of `parent` for `segment`, created on first reference.
    pub fn add_child(&mut self, pkg: &Package, parent: NodeId, segment: &str) -> SchemaResult<NodeId> {
        let (kind, default) = match &self.nodes[parent].kind {
            NodeKind::Array { elem } => {
                let elem = elem.clone();
                let default = self.nodes[parent].default.clone();
                (classify(pkg, &elem), default)
            }
            parent_kind => {
                let default = match parent_kind {
                    NodeKind::Composite { bean } => match pkg.find_bean(bean) {
                        Some(b) => pkg
                            .find_field(b, name_of_segment(segment))?
                            .and_then(|f| f.default.clone()),
                        None => None,
                    },
                    _ => None,
                };
                (classify(pkg, type_of_segment(segment)), default)
            }
        };

        let next_id = self.nodes.len();
        let id = match &mut self.nodes[parent].children {
            Children::Indexed(slots) => {
                let index: usize = name_of_segment(segment).trim().parse().unwrap_or(0);
                if slots.len() <= index {
                    slots.resize(index + 1, None);
                }
                match slots[index] {
                    Some(existing) => return Ok(existing),
                    None => {
                        slots[index] = Some(next_id);
                        next_id
                    }
                }
            }
            Children::Keyed(list) => match list.iter().find(|(key, _)| key == segment) {
                Some((_, existing)) => return Ok(*existing),
                None => {
                    list.push((segment.to_string(), next_id));
                    next_id
                }
            },
        };

        log_debug(format!("add child '{}', kind={:?}", segment, kind));
        let children = match kind {
            NodeKind::Array { .. } => Children::Indexed(Vec::new()),
            _ => Children::Keyed(Vec::new()),
        };
        self.nodes.push(Node {
            segment: segment.to_string(),
            kind,
            parent: Some(parent),
            default,
            column: None,
            mark: None,
            header: None,
            children,
        });
        Ok(id)
    }

    /// Reorder composite children into schema field order, recursively.
    ///
    /// Children without a matching field keep their relative order after all
    /// matched ones.
    pub fn sort(&mut self, pkg: &Package) -> SchemaResult<()> {
        for id in 0..self.nodes.len() {
            let bean = match &self.nodes[id].kind {
                NodeKind::Composite { bean } => match pkg.find_bean(bean) {
                    Some(b) if b.kind.is_composite() => b,
                    _ => continue,
                },
                _ => continue,
            };
            let fields = pkg.all_fields(bean)?;
            if let Children::Keyed(list) = &mut self.nodes[id].children {
                let mut ordered: Vec<(usize, (String, NodeId))> = list
                    .drain(..)
                    .enumerate()
                    .map(|(i, entry)| {
                        let name = name_of_segment(&entry.0);
                        let order = fields
                            .iter()
                            .position(|f| f.name == name)
                            .unwrap_or(fields.len() + i);
                        (order, entry)
                    })
                    .collect();
                ordered.sort_by_key(|(order, _)| *order);
                list.extend(ordered.into_iter().map(|(_, entry)| entry));
            }
        }
        Ok(())
    }

    /// Leaves in depth-first order; position in this list is the column
    /// index after synchronization.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in self.root().child_ids() {
            self.collect_leaves(child, &mut out);
        }
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = &self.nodes[id];
        if node.is_leaf() {
            out.push(id);
        }
        for child in node.child_ids() {
            self.collect_leaves(child, out);
        }
    }

    /// Direct child of `parent` whose field name is `name`.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent]
            .child_ids()
            .into_iter()
            .find(|id| self.nodes[*id].name() == name)
    }

    /// Bean a composite or enum node resolves to.
    pub fn bean_of<'a>(&self, pkg: &'a Package, id: NodeId) -> Option<&'a Bean> {
        match &self.nodes[id].kind {
            NodeKind::Composite { bean } | NodeKind::Enum { bean } => pkg.find_bean(bean),
            _ => None,
        }
    }

    /// Dotted path of a node, root excluded.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == Self::ROOT {
                break;
            }
            segments.push(self.nodes[cur].segment.as_str());
            current = self.nodes[cur].parent;
        }
        segments.reverse();
        segments.join(".")
    }
}

/// Node kind of a type annotation.
fn classify(pkg: &Package, ty: &str) -> NodeKind {
    let ty = ty.trim();
    if let Some(elem) = ty.strip_suffix("[]") {
        return NodeKind::Array { elem: elem.to_string() };
    }
    if let Some(basic) = BasicType::from_name(ty) {
        return NodeKind::Scalar(basic);
    }
    match pkg.find_bean(ty) {
        Some(bean) => match bean.kind {
            BeanKind::Enum => NodeKind::Enum { bean: bean.name.clone() },
            BeanKind::Struct | BeanKind::Protocol => NodeKind::Composite { bean: bean.name.clone() },
        },
        None => NodeKind::Opaque { ty: ty.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::build_headers;
    use crate::schema::Field;

    fn package() -> Package {
        Package::new("game").with_file(
            "item.mid",
            vec![
                Bean::new("Color", BeanKind::Enum)
                    .with_field(Field::new("RED", "int").with_default("0"))
                    .with_field(Field::new("GREEN", "int").with_default("1")),
                Bean::new("Reward", BeanKind::Struct)
                    .with_field(Field::new("kind", "int"))
                    .with_field(Field::new("count", "int")),
                Bean::new("Item", BeanKind::Protocol)
                    .with_field(Field::new("id", "int"))
                    .with_field(Field::new("color", "Color").with_default("1"))
                    .with_field(Field::new("reward", "Reward"))
                    .with_field(Field::new("slots", "int[2]"))
                    .with_field(Field::new("bonus", "Reward[2]")),
            ],
        )
    }

    fn leaf_paths(tree: &NodeTree) -> Vec<String> {
        tree.leaves().into_iter().map(|id| tree.path(id)).collect()
    }

    #[test]
    fn test_segment_parts() {
        assert_eq!(name_of_segment("reward(Reward)"), "reward");
        assert_eq!(type_of_segment("reward(Reward)"), "Reward");
        assert_eq!(type_of_segment("bonus(Reward[])"), "Reward[]");
        assert_eq!(name_of_segment("0"), "0");
        assert_eq!(type_of_segment("0"), "0");
    }

    #[test]
    fn test_round_trip_matches_schema_order() {
        let pkg = package();
        let item = pkg.find_bean("Item").unwrap();
        let headers = build_headers(&pkg, item, "", "", "").unwrap();

        // Same comments, scrambled column order
        let mut comments: Vec<String> = headers.iter().map(|h| h.comment.clone()).collect();
        comments.reverse();
        let mut tree = NodeTree::from_comments(&pkg, item, &comments, &[], &headers).unwrap();
        tree.sort(&pkg).unwrap();

        let direct = NodeTree::from_headers(&pkg, item, &headers).unwrap();
        assert_eq!(leaf_paths(&tree), leaf_paths(&direct));
        let expected: Vec<String> = headers.iter().map(|h| h.comment.clone()).collect();
        assert_eq!(leaf_paths(&direct), expected);
    }

    #[test]
    fn test_node_kinds() {
        let pkg = package();
        let item = pkg.find_bean("Item").unwrap();
        let headers = build_headers(&pkg, item, "", "", "").unwrap();
        let tree = NodeTree::from_headers(&pkg, item, &headers).unwrap();

        let color = tree.find_child(NodeTree::ROOT, "color").unwrap();
        assert_eq!(tree.node(color).kind, NodeKind::Enum { bean: "Color".into() });
        assert_eq!(tree.node(color).default.as_deref(), Some("1"));

        let bonus = tree.find_child(NodeTree::ROOT, "bonus").unwrap();
        assert_eq!(tree.node(bonus).kind, NodeKind::Array { elem: "Reward".into() });
        let slot = tree.node(bonus).child_ids()[1];
        assert_eq!(tree.node(slot).kind, NodeKind::Composite { bean: "Reward".into() });
        assert_eq!(tree.node(slot).parent, Some(bonus));

        let slots = tree.find_child(NodeTree::ROOT, "slots").unwrap();
        let first = tree.node(slots).child_ids()[0];
        assert_eq!(tree.node(first).kind, NodeKind::Scalar(BasicType::Int));
    }

    #[test]
    fn test_array_children_are_indexed() {
        let pkg = package();
        let item = pkg.find_bean("Item").unwrap();
        let mut tree = NodeTree::new(item);
        let b = tree.insert_path(&pkg, "slots(int[]).1").unwrap();
        let a = tree.insert_path(&pkg, "slots(int[]).0").unwrap();
        let again = tree.insert_path(&pkg, "slots(int[]).1").unwrap();
        assert_eq!(b, again);

        let slots = tree.find_child(NodeTree::ROOT, "slots").unwrap();
        assert_eq!(tree.node(slots).child_ids(), vec![a, b]);
    }

    #[test]
    fn test_unknown_fields_sort_last() {
        let pkg = package();
        let item = pkg.find_bean("Item").unwrap();
        let comments: Vec<String> = ["legacy(int)", "old(Gone)", "reward(Reward).count(int)", "id(int)"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut tree = NodeTree::from_comments(&pkg, item, &comments, &[], &[]).unwrap();
        tree.sort(&pkg).unwrap();
        assert_eq!(
            leaf_paths(&tree),
            vec!["id(int)", "reward(Reward).count(int)", "legacy(int)", "old(Gone)"]
        );
        let old = tree.find_child(NodeTree::ROOT, "old").unwrap();
        assert_eq!(tree.node(old).kind, NodeKind::Opaque { ty: "Gone".into() });
    }

    #[test]
    fn test_comments_stop_at_first_empty() {
        let pkg = package();
        let item = pkg.find_bean("Item").unwrap();
        let comments: Vec<String> = vec!["id(int)".into(), "".into(), "reward(Reward).kind(int)".into()];
        let tree = NodeTree::from_comments(&pkg, item, &comments, &[], &[]).unwrap();
        assert_eq!(tree.leaves().len(), 1);
    }

    #[test]
    fn test_graft_reports_new_leaves() {
        let pkg = package();
        let item = pkg.find_bean("Item").unwrap();
        let headers = build_headers(&pkg, item, "", "", "").unwrap();
        let comments = vec!["id(int)".to_string()];
        let labels = vec!["ID".to_string()];
        let mut tree = NodeTree::from_comments(&pkg, item, &comments, &labels, &headers).unwrap();

        let (leaf, is_new) = tree.graft(&pkg, &headers[0]).unwrap();
        assert!(!is_new);
        assert_eq!(tree.node(leaf).mark.as_ref().unwrap().label, "ID");

        let (_, is_new) = tree.graft(&pkg, &headers[1]).unwrap();
        assert!(is_new);
    }
}
