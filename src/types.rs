//! Public types for the schemax API: canonical metadata shapes and load options.
//!
//! Raw driver rows are converted to these shapes exactly once, at the
//! ingestion boundary ([`TableInfo::from_row`] / [`ColumnInfo::from_row`]);
//! everything past that point only ever sees the canonical structs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row as returned by the query-execution boundary: column name → value.
pub type Row = HashMap<String, Value>;

/// Metadata for a single table. Identity key = (schema, name).
/// Immutable once constructed; built from a raw row or cache deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    /// Free-text table comment from the source database ("" when absent).
    pub remarks: String,
}

impl TableInfo {
    /// Build from a raw row. Expects the canonical column aliases the
    /// query builder emits (`table_schema`, `table_name`, `remarks`).
    pub fn from_row(row: &Row) -> Self {
        Self {
            schema: value_str(row, "table_schema"),
            name: value_str(row, "table_name"),
            remarks: value_str(row, "remarks"),
        }
    }

    /// `schema.name`, the form the table trie indexes alongside the bare name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Nullability of a column, normalized at ingestion to a two-value enum.
/// Serializes as `"Y"` / `"N"` on the wire and in cache blobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nulls {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl Nulls {
    /// The one normalization point for the nullable flag. Accepts booleans,
    /// case-variant "Y"/"YES" strings, and 0/1 numbers; anything else is No.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(true)) => Nulls::Yes,
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("y") || s.eq_ignore_ascii_case("yes") {
                    Nulls::Yes
                } else {
                    Nulls::No
                }
            }
            Some(Value::Number(n)) => {
                if n.as_i64() == Some(1) {
                    Nulls::Yes
                } else {
                    Nulls::No
                }
            }
            _ => Nulls::No,
        }
    }

    pub fn is_nullable(self) -> bool {
        matches!(self, Nulls::Yes)
    }
}

/// Metadata for a single column. Identity key = (schema, table, name).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Source type name as reported by the database (e.g. `VARCHAR`).
    pub typename: String,
    /// Declared length/precision, when the source reports one.
    pub length: Option<i64>,
    /// Decimal scale, when the source reports one.
    pub scale: Option<i64>,
    pub nulls: Nulls,
    pub remarks: String,
}

impl ColumnInfo {
    /// Build from a raw row. Expects the canonical column aliases the
    /// query builder emits; nulls normalization happens here and only here.
    pub fn from_row(row: &Row) -> Self {
        Self {
            schema: value_str(row, "table_schema"),
            table: value_str(row, "table_name"),
            name: value_str(row, "column_name"),
            typename: value_str(row, "type_name"),
            length: value_i64(row, "column_size"),
            scale: value_i64(row, "decimal_digits"),
            nulls: Nulls::from_value(row.get("is_nullable")),
            remarks: value_str(row, "remarks"),
        }
    }

    /// Owning table's identity key, used to group columns with their chunk.
    pub fn table_key(&self) -> (&str, &str) {
        (&self.schema, &self.table)
    }
}

/// A schema name with its table count. Derived from the table set, never
/// authoritative; recomputed whenever the underlying tables change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    /// Number of tables seen in this schema (0 when unknown).
    #[serde(rename = "count")]
    pub table_count: usize,
}

/// Group tables by schema and count them, sorted by schema name.
pub fn schemas_from_tables(tables: &[TableInfo]) -> Vec<SchemaInfo> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tables {
        *counts.entry(t.schema.as_str()).or_insert(0) += 1;
    }
    let mut schemas: Vec<SchemaInfo> = counts
        .into_iter()
        .map(|(name, table_count)| SchemaInfo {
            name: name.to_string(),
            table_count,
        })
        .collect();
    schemas.sort_by(|a, b| a.name.cmp(&b.name));
    schemas
}

/// Options for one load run. Mirrors the worker start command minus the
/// executor choice (the caller injects the executor itself).
#[derive(Clone, Debug)]
pub struct LoadRequest {
    /// Restrict the load to one schema. None loads everything.
    pub schema_filter: Option<String>,
    /// Row budget for the first chunk (fast first paint). Capped at
    /// [`LoaderConsts::FIRST_CHUNK_CAP`](crate::utils::config::LoaderConsts::FIRST_CHUNK_CAP).
    pub initial_limit: usize,
    /// Seed for the adaptive page size on subsequent chunks.
    pub batch_size: usize,
    /// Skip rows already delivered in a prior run (resume after restart).
    pub start_offset: usize,
    /// Bypass the cache read; the post-load cache write still happens.
    pub refresh: bool,
}

impl Default for LoadRequest {
    fn default() -> Self {
        Self {
            schema_filter: None,
            initial_limit: crate::utils::config::LoaderConsts::DEFAULT_INITIAL_LIMIT,
            batch_size: crate::utils::config::LoaderConsts::DEFAULT_BATCH_SIZE,
            start_offset: 0,
            refresh: false,
        }
    }
}

/// String value of a row field; "" for null/missing. Numbers and booleans
/// are rendered so a lax driver can't poison the canonical shape.
fn value_str(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Integer value of a row field; None when null, missing, or not numeric.
fn value_i64(row: &Row, key: &str) -> Option<i64> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}
