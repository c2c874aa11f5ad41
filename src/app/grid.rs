//! Grid view model: displayed columns, filter, sort and pagination
//!
//! All transforms are view-state only; the fetched records are never mutated
//! and are replaced wholesale on every reload.

use crate::db::{is_audit_field, normalize_for_display, ColumnDescriptor, Record};
use serde_json::Value;
use std::cmp::Ordering;

/// Synthetic trailing column holding row actions (edit/delete)
pub const ACTIONS_COLUMN: &str = "actions";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
    /// Natural (fetch) order
    #[default]
    None,
}

/// Which rows an export covers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportScope {
    /// Current page after filter and sort
    Visible,
    /// Every row passing the filter, sorted
    Filtered,
}

#[derive(Clone, Debug)]
pub struct ViewModel {
    pub rows: Vec<Record>,
    /// Non-audit columns plus the trailing `actions` column
    pub displayed_columns: Vec<String>,
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    pub filter_text: String,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            displayed_columns: vec![ACTIONS_COLUMN.to_string()],
            sort_key: None,
            sort_direction: SortDirection::None,
            filter_text: String::new(),
            page: 0,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Builds view models from fetched records
pub struct GridProjector;

impl GridProjector {
    pub fn project(records: Vec<Record>, columns: &[ColumnDescriptor], page_size: usize) -> ViewModel {
        let mut displayed_columns: Vec<String> = columns
            .iter()
            .filter(|c| !is_audit_field(&c.name))
            .map(|c| c.name.clone())
            .collect();
        displayed_columns.push(ACTIONS_COLUMN.to_string());

        ViewModel {
            rows: records,
            displayed_columns,
            page_size: page_size.max(1),
            ..ViewModel::default()
        }
    }
}

impl ViewModel {
    /// Data columns (everything but `actions`)
    pub fn data_columns(&self) -> Vec<&str> {
        self.displayed_columns
            .iter()
            .filter(|c| c.as_str() != ACTIONS_COLUMN)
            .map(|c| c.as_str())
            .collect()
    }

    /// Swap in a fresh record set, keeping filter/sort/page size
    pub fn replace_rows(&mut self, rows: Vec<Record>) {
        self.rows = rows;
        let last = self.page_count().saturating_sub(1);
        self.page = self.page.min(last);
    }

    pub fn apply_filter(&mut self, text: &str) {
        self.filter_text = text.trim().to_lowercase();
        self.page = 0;
    }

    pub fn sort(&mut self, column: &str, direction: SortDirection) {
        if direction == SortDirection::None {
            self.sort_key = None;
        } else {
            self.sort_key = Some(column.to_string());
        }
        self.sort_direction = direction;
    }

    /// Zero-based page; a zero size keeps the current size
    pub fn paginate(&mut self, page: usize, size: usize) {
        if size > 0 {
            self.page_size = size;
        }
        let last = self.page_count().saturating_sub(1);
        self.page = page.min(last);
    }

    /// Rows passing the filter, in sort order
    pub fn filtered_rows(&self) -> Vec<&Record> {
        let columns = self.data_columns();
        let mut rows: Vec<&Record> = self
            .rows
            .iter()
            .filter(|r| self.matches_filter(r, &columns))
            .collect();

        if let (Some(key), dir) = (&self.sort_key, self.sort_direction) {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(key), b.get(key));
                match dir {
                    SortDirection::Desc => ord.reverse(),
                    _ => ord,
                }
            });
        }
        rows
    }

    /// Rows of the current page
    pub fn visible_rows(&self) -> Vec<&Record> {
        self.filtered_rows()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    pub fn page_count(&self) -> usize {
        let total = self.filtered_rows().len();
        total.div_ceil(self.page_size.max(1)).max(1)
    }

    pub fn rows_for(&self, scope: ExportScope) -> Vec<&Record> {
        match scope {
            ExportScope::Visible => self.visible_rows(),
            ExportScope::Filtered => self.filtered_rows(),
        }
    }

    fn matches_filter(&self, row: &Record, columns: &[&str]) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        columns.iter().any(|c| {
            row.get(*c)
                .map(|v| normalize_for_display(v).to_lowercase().contains(&self.filter_text))
                .unwrap_or(false)
        })
    }
}

/// Sort key of a cell: blanks, then finite numbers, then text
#[derive(Debug)]
enum SortKey {
    Blank,
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: Option<&Value>) -> Self {
        let text = value.map(normalize_for_display).unwrap_or_default();
        if text.is_empty() {
            return SortKey::Blank;
        }
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => SortKey::Number(n),
            _ => SortKey::Text(text),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Blank => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
            (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    SortKey::of(a).compare(&SortKey::of(b))
}
