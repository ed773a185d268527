//! Header synchronization.
//!
//! Brings the comment and label rows of a sheet in line with the current
//! schema and moves existing data columns along with their headers. A sheet
//! that already matches is left untouched, so repeated runs produce no
//! writes.

use crate::error::SchemaResult;
use crate::header::{build_headers, Header};
use crate::logs::{log_debug, log_info_indent};
use crate::schema::{Bean, Package};
use crate::sheet::{column_name, CellValue, Sheet, COMMENT_ROW, FIRST_DATA_ROW, LABEL_ROW};
use crate::tree::NodeTree;

/// What synchronization did to a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The sheet had no header rows; headers were written fresh.
    Created { columns: usize },
    /// Headers already matched; nothing written.
    Unchanged,
    /// Header rows rewritten and data columns moved.
    Migrated { new_columns: usize, moved_columns: usize },
}

impl SyncOutcome {
    pub fn is_changed(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged)
    }
}

/// Column layout after sorting: what each column should say and where its
/// data used to be.
struct Column {
    comment: String,
    label: String,
    previous: Option<usize>,
}

/// Synchronize the headers of `bean` into `sheet`.
pub fn sync_sheet(pkg: &Package, bean: &Bean, sheet: &mut Sheet) -> SchemaResult<SyncOutcome> {
    let headers = build_headers(pkg, bean, "", "", "")?;

    if sheet.row_count() < FIRST_DATA_ROW {
        sheet.clear();
        write_headers(sheet, &headers);
        log_debug(format!("'{}': wrote {} fresh columns", bean.name, headers.len()));
        return Ok(SyncOutcome::Created { columns: headers.len() });
    }

    let comments = sheet.row_text(COMMENT_ROW);
    let labels = sheet.row_text(LABEL_ROW);
    let mut tree = NodeTree::from_comments(pkg, bean, &comments, &labels, &headers)?;

    let mut new_columns = 0;
    for header in &headers {
        let (_, is_new) = tree.graft(pkg, header)?;
        if is_new {
            new_columns += 1;
        }
    }
    tree.sort(pkg)?;

    let columns: Vec<Column> = tree
        .leaves()
        .into_iter()
        .map(|id| {
            let node = tree.node(id);
            match (&node.header, &node.mark) {
                (Some(header), mark) => Column {
                    comment: header.comment.clone(),
                    label: header.name.clone(),
                    previous: mark.as_ref().map(|m| m.column),
                },
                (None, Some(mark)) => Column {
                    comment: mark.comment.clone(),
                    label: mark.label.clone(),
                    previous: Some(mark.column),
                },
                (None, None) => Column {
                    comment: tree.path(id),
                    label: node.name().to_string(),
                    previous: None,
                },
            }
        })
        .collect();

    let moved: Vec<(usize, usize)> = columns
        .iter()
        .enumerate()
        .filter_map(|(index, col)| match col.previous {
            Some(prev) if prev != index => Some((prev, index)),
            _ => None,
        })
        .collect();

    let relabeled = columns.iter().enumerate().any(|(index, col)| {
        sheet.cell_text(COMMENT_ROW, index) != col.comment
            || sheet.cell_text(LABEL_ROW, index) != col.label
    });

    if new_columns == 0 && moved.is_empty() && !relabeled {
        return Ok(SyncOutcome::Unchanged);
    }

    for (prev, index) in &moved {
        log_info_indent(
            format!(
                "move column {} -> {} ({})",
                column_name(*prev),
                column_name(*index),
                columns[*index].comment
            ),
            1,
        );
    }
    move_data(sheet, &moved);

    sheet.clear_row(COMMENT_ROW);
    sheet.clear_row(LABEL_ROW);
    for (index, col) in columns.iter().enumerate() {
        sheet.set_cell_str(COMMENT_ROW, index, &col.comment);
        sheet.set_cell_str(LABEL_ROW, index, &col.label);
    }

    Ok(SyncOutcome::Migrated {
        new_columns,
        moved_columns: moved.len(),
    })
}

fn write_headers(sheet: &mut Sheet, headers: &[Header]) {
    for (index, header) in headers.iter().enumerate() {
        sheet.set_cell_str(COMMENT_ROW, index, &header.comment);
        sheet.set_cell_str(LABEL_ROW, index, &header.name);
    }
}

/// Apply `(from, to)` column moves to every data row.
///
/// All moves read from a snapshot taken up front, so swaps and chained
/// shifts keep every value.
fn move_data(sheet: &mut Sheet, moves: &[(usize, usize)]) {
    if moves.is_empty() {
        return;
    }
    let snapshot = sheet.rows_text();
    for (row, cells) in snapshot.iter().enumerate().skip(FIRST_DATA_ROW) {
        let text = |col: usize| cells.get(col).map(String::as_str).unwrap_or("");
        for (from, _) in moves {
            if !text(*from).is_empty() {
                sheet.set_cell(row, *from, CellValue::Empty);
            }
        }
        for (from, to) in moves {
            let value = text(*from);
            if !value.is_empty() {
                sheet.set_cell(row, *to, CellValue::infer(value));
            }
        }
    }
}
