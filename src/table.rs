#![forbid(unsafe_code)]

//! Flat tables built from nested API resources.
//!
//! A resource like `{"id": "x", "statistics": {"viewCount": "7"}}` flattens
//! into the record `{"id": "x", "statistics.viewCount": "7"}`; keys are then
//! normalized and the record becomes one row of a [`Table`]. Arrays are leaves
//! and are kept as JSON arrays, the same way objects nest but lists do not.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::normalize::{ColumnRules, normalize_key_with};

/// A flattened, not yet normalized record: dotted key paths in document order.
pub type FlatRecord = Map<String, Value>;

/// Flattens nested objects into dotted keys. Empty objects disappear.
pub fn flatten(value: &Value) -> FlatRecord {
    let mut out = Map::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut FlatRecord) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(inner, &path, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}

/// Ordered rows over a shared, unique column list. Cells missing from a row
/// read as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from API resources: flatten, normalize, append.
    pub fn from_resources<'a, I>(resources: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut table = Self::new();
        for resource in resources {
            table.push_resource(resource);
        }
        table
    }

    pub fn push_resource(&mut self, resource: &Value) {
        self.push_record(normalize_record(flatten(resource), &ColumnRules::DEFAULT));
    }

    /// Appends one row. Columns the table has not seen yet are added at the
    /// end and earlier rows read `null` for them.
    pub fn push_record(&mut self, record: FlatRecord) {
        let mut row = vec![Value::Null; self.columns.len()];
        for (column, value) in record {
            let position = self.column_position_or_insert(column);
            if position >= row.len() {
                row.resize(position + 1, Value::Null);
            }
            row[position] = value;
        }
        self.rows.push(row);
    }

    /// Appends every row of `other`, unioning the column sets.
    pub fn concat(&mut self, other: Table) {
        let Table { columns, rows, .. } = other;
        let positions: Vec<usize> = columns
            .into_iter()
            .map(|column| self.column_position_or_insert(column))
            .collect();
        for row in rows {
            let mut merged = vec![Value::Null; self.columns.len()];
            for (value, &position) in row.into_iter().zip(&positions) {
                merged[position] = value;
            }
            self.rows.push(merged);
        }
    }

    fn column_position_or_insert(&mut self, column: String) -> usize {
        if let Some(&position) = self.index.get(&column) {
            return position;
        }
        let position = self.columns.len();
        self.index.insert(column.clone(), position);
        self.columns.push(column);
        position
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Cell lookup; `None` when the row or column does not exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let position = self.column_index(column)?;
        let row = self.rows.get(row)?;
        Some(row.get(position).unwrap_or(&Value::Null))
    }

    /// Rows padded to the full column width.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        self.rows.iter().map(|cells| RowView {
            cells,
            width: self.columns.len(),
        })
    }

    /// Column values down one column, `null` where a row has no cell.
    pub fn column_values<'a>(&'a self, column: &str) -> Vec<&'a Value> {
        match self.column_index(column) {
            Some(position) => self
                .rows
                .iter()
                .map(|row| row.get(position).unwrap_or(&Value::Null))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Plain-text preview of the first `limit` rows, one line per row.
    pub fn preview(&self, limit: usize) -> String {
        let mut out = self.columns.join(" | ");
        for row in self.rows().take(limit) {
            out.push('\n');
            let line: Vec<String> = row.iter().map(display_cell).collect();
            out.push_str(&line.join(" | "));
        }
        out
    }
}

/// One row as seen through the table's column width.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    cells: &'a [Value],
    width: usize,
}

impl<'a> RowView<'a> {
    pub fn iter(self) -> impl Iterator<Item = &'a Value> + 'a {
        let cells = self.cells;
        (0..self.width).map(move |position| cells.get(position).unwrap_or(&Value::Null))
    }
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => {
            let mut short: String = text.chars().take(40).collect();
            if text.chars().count() > 40 {
                short.push('…');
            }
            short.replace('\n', " ")
        }
        other => other.to_string(),
    }
}

/// Normalizes every key of a flattened record. When two raw keys collapse to
/// the same name the later value wins, and the collision is logged.
pub fn normalize_record(record: FlatRecord, rules: &ColumnRules<'_>) -> FlatRecord {
    let mut out = Map::new();
    let mut origins: HashMap<String, String> = HashMap::new();
    for (raw, value) in record {
        let column = normalize_key_with(&raw, rules);
        if let Some(previous) = origins.get(&column) {
            warn!(
                column = %column,
                first = %previous,
                second = %raw,
                "column name collision after normalization; keeping the later value"
            );
        }
        origins.insert(column.clone(), raw);
        out.insert(column, value);
    }
    out
}
