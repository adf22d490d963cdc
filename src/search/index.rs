//! The queryable index: owns canonical metadata plus the tries over it.

use std::collections::HashSet;

use log::debug;

use crate::cancel::CancelToken;
use crate::search::fuzzy;
use crate::search::trie::Trie;
use crate::types::{ColumnInfo, TableInfo};
use crate::utils::config::SearchConsts;

/// Matches for one query. Tables and columns are ranked independently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResults {
    pub tables: Vec<TableInfo>,
    pub columns: Vec<ColumnInfo>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty()
    }
}

/// In-memory index over one metadata snapshot.
///
/// Read-only once built; when the underlying table/column set changes,
/// build a fresh index over the new snapshot. Tables are indexed under
/// both their bare and schema-qualified names; columns under the column
/// name. The tries hold positions into the entry vectors.
#[derive(Default)]
pub struct SearchIndex {
    tables: Vec<TableInfo>,
    columns: Vec<ColumnInfo>,
    table_trie: Trie<u32>,
    column_trie: Trie<u32>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a full snapshot in one call.
    pub fn build(tables: Vec<TableInfo>, columns: Vec<ColumnInfo>) -> Self {
        let mut index = Self::new();
        index.extend(tables, columns);
        index
    }

    /// Entries with empty names are dropped here so nothing downstream has
    /// to handle them.
    fn extend(&mut self, tables: Vec<TableInfo>, columns: Vec<ColumnInfo>) {
        for table in tables {
            if table.name.is_empty() {
                debug!("skipping unnamed table in schema {:?}", table.schema);
                continue;
            }
            let idx = self.tables.len() as u32;
            self.table_trie.insert(&table.name, idx);
            self.table_trie.insert(&table.qualified_name(), idx);
            self.tables.push(table);
        }
        for column in columns {
            if column.name.is_empty() {
                debug!(
                    "skipping unnamed column in {}.{}",
                    column.schema, column.table
                );
                continue;
            }
            let idx = self.columns.len() as u32;
            self.column_trie.insert(&column.name, idx);
            self.columns.push(column);
        }
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Run one query. An empty query returns every entry in insertion
    /// order. Otherwise prefix lookup first; when that comes up empty for
    /// a category, a fuzzy scan over that category ranks matches by edit
    /// distance (ties keep insertion order). A cancelled search returns
    /// empty results.
    pub fn search(&self, query: &str, cancel: &CancelToken) -> SearchResults {
        let query = query.trim();
        if query.is_empty() {
            return SearchResults {
                tables: self.tables.clone(),
                columns: self.columns.clone(),
            };
        }
        let table_hits = self.matched_tables(query, cancel);
        let column_hits = self.matched_columns(query, cancel);
        if cancel.is_cancelled() {
            return SearchResults::default();
        }
        SearchResults {
            tables: table_hits
                .iter()
                .map(|&i| self.tables[i as usize].clone())
                .collect(),
            columns: column_hits
                .iter()
                .map(|&i| self.columns[i as usize].clone())
                .collect(),
        }
    }

    /// Table side of [`search`](Self::search) on its own.
    pub fn search_tables(&self, query: &str, cancel: &CancelToken) -> Vec<TableInfo> {
        let query = query.trim();
        if query.is_empty() {
            return self.tables.clone();
        }
        let hits = self.matched_tables(query, cancel);
        if cancel.is_cancelled() {
            return Vec::new();
        }
        hits.iter().map(|&i| self.tables[i as usize].clone()).collect()
    }

    /// Column side of [`search`](Self::search) on its own.
    pub fn search_columns(&self, query: &str, cancel: &CancelToken) -> Vec<ColumnInfo> {
        let query = query.trim();
        if query.is_empty() {
            return self.columns.clone();
        }
        let hits = self.matched_columns(query, cancel);
        if cancel.is_cancelled() {
            return Vec::new();
        }
        hits.iter().map(|&i| self.columns[i as usize].clone()).collect()
    }

    fn matched_tables(&self, query: &str, cancel: &CancelToken) -> Vec<u32> {
        // A table whose bare name prefixes its qualified form sits twice in
        // one payload list, hence the dedup.
        let prefix_hits = dedup_in_order(self.table_trie.search_prefix(query));
        if !prefix_hits.is_empty() {
            return prefix_hits;
        }
        let folded = query.to_lowercase();
        let mut scored: Vec<(usize, u32)> = Vec::new();
        for (idx, table) in self.tables.iter().enumerate() {
            if idx % SearchConsts::CANCEL_POLL_EVERY == 0 && cancel.is_cancelled() {
                return Vec::new();
            }
            let qualified = table.qualified_name();
            if fuzzy::matches(&table.name, query) || fuzzy::matches(&qualified, query) {
                let dist = fuzzy::edit_distance(&table.name.to_lowercase(), &folded)
                    .min(fuzzy::edit_distance(&qualified.to_lowercase(), &folded));
                scored.push((dist, idx as u32));
            }
        }
        scored.sort_by_key(|&(dist, _)| dist);
        scored.into_iter().map(|(_, idx)| idx).collect()
    }

    fn matched_columns(&self, query: &str, cancel: &CancelToken) -> Vec<u32> {
        let prefix_hits = dedup_in_order(self.column_trie.search_prefix(query));
        if !prefix_hits.is_empty() {
            return prefix_hits;
        }
        let folded = query.to_lowercase();
        let mut scored: Vec<(usize, u32)> = Vec::new();
        for (idx, column) in self.columns.iter().enumerate() {
            if idx % SearchConsts::CANCEL_POLL_EVERY == 0 && cancel.is_cancelled() {
                return Vec::new();
            }
            if fuzzy::matches(&column.name, query) {
                let dist = fuzzy::edit_distance(&column.name.to_lowercase(), &folded);
                scored.push((dist, idx as u32));
            }
        }
        scored.sort_by_key(|&(dist, _)| dist);
        scored.into_iter().map(|(_, idx)| idx).collect()
    }
}

/// Drop repeated indices, keeping first occurrences in order.
fn dedup_in_order(hits: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(hits.len());
    hits.iter().copied().filter(|idx| seen.insert(*idx)).collect()
}
