//! In-memory tabular data and the outer-join merge.
//!
//! A [`Table`] is an ordered list of column names plus rows of string cells.
//! Scraped and API-sourced data arrives as text and leaves as CSV, so cells
//! stay strings throughout; a missing cell is the empty string.

use crate::error::CollectError;
use std::collections::{HashMap, HashSet};

/// Marker appended to a column name when a later table in a merge carries a
/// column that already exists in the accumulated result.
pub const REPEAT_SUFFIX: &str = "__repeated";

/// An ordered sequence of rows sharing one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows (the header is not a row).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Append all rows of `other`. The headers must match exactly — pages of
    /// one screener result may not change shape mid-download.
    pub fn extend_rows(&mut self, other: Table) -> Result<(), CollectError> {
        if other.columns != self.columns {
            return Err(CollectError::Merge(format!(
                "column mismatch: expected {:?}, got {:?}",
                self.columns, other.columns
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell accessor by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Add a column holding the same value on every row (used for capture
    /// timestamps). The name must not already exist.
    pub fn add_column(&mut self, name: &str, value: &str) -> Result<(), CollectError> {
        let values = vec![value.to_string(); self.rows.len()];
        self.push_column(name, values)
    }

    /// Add a column with one value per row.
    pub fn push_column(&mut self, name: &str, values: Vec<String>) -> Result<(), CollectError> {
        if self.column_index(name).is_some() {
            return Err(CollectError::Merge(format!(
                "column '{name}' already exists"
            )));
        }
        if values.len() != self.rows.len() {
            return Err(CollectError::Merge(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Outer join with `other` on the named key column.
    ///
    /// Keeps every key from both sides: rows of `self` first (in order),
    /// then rows of `other` whose key never appears in `self`. Non-key
    /// columns of `other` that collide with an existing column name get
    /// [`REPEAT_SUFFIX`] appended until unique, so no value is silently
    /// overwritten. Cells absent from one side are empty strings.
    pub fn outer_join(&self, other: &Table, key: &str) -> Result<Table, CollectError> {
        let left_key = self.column_index(key).ok_or_else(|| {
            CollectError::Merge(format!("left table is missing join key '{key}'"))
        })?;
        let right_key = other.column_index(key).ok_or_else(|| {
            CollectError::Merge(format!("right table is missing join key '{key}'"))
        })?;

        // Result header: all left columns, then right non-key columns with
        // collision suffixing.
        let mut columns = self.columns.clone();
        let mut right_value_cols: Vec<usize> = Vec::new();
        for (i, name) in other.columns.iter().enumerate() {
            if i == right_key {
                continue;
            }
            let mut out = name.clone();
            while columns.contains(&out) {
                out.push_str(REPEAT_SUFFIX);
            }
            columns.push(out);
            right_value_cols.push(i);
        }

        // Index right rows by key; the first occurrence of a key wins.
        let mut right_by_key: HashMap<&str, usize> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            right_by_key.entry(row[right_key].as_str()).or_insert(i);
        }
        let left_keys: HashSet<&str> =
            self.rows.iter().map(|row| row[left_key].as_str()).collect();

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut out = row.clone();
            match right_by_key.get(row[left_key].as_str()) {
                Some(&ri) => {
                    for &c in &right_value_cols {
                        out.push(other.rows[ri][c].clone());
                    }
                }
                None => {
                    out.resize(out.len() + right_value_cols.len(), String::new());
                }
            }
            rows.push(out);
        }

        // Keys present only on the right, in right order.
        for row in &other.rows {
            if left_keys.contains(row[right_key].as_str()) {
                continue;
            }
            let mut out = vec![String::new(); self.columns.len()];
            out[left_key] = row[right_key].clone();
            for &c in &right_value_cols {
                out.push(row[c].clone());
            }
            rows.push(out);
        }

        Ok(Table { columns, rows })
    }
}
