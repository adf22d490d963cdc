//! Query-execution boundary: SQL strings in, row maps out.
//!
//! The loader never talks to a driver directly; it formats SQL through a
//! [`QueryBuilder`] and hands it to whatever [`QueryExecutor`] the caller
//! injected. The crate ships an ANSI `information_schema` builder and a
//! small in-memory executor for tests and `--mock` runs; a real driver
//! binding implements [`QueryExecutor`] outside this crate.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::{Value, json};

use crate::types::{ColumnInfo, Nulls, Row, TableInfo};

/// Something that can run SQL and return rows as column-name → value maps.
/// `&mut` because drivers typically carry connection state.
pub trait QueryExecutor {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>>;
}

/// Formats the metadata queries for one SQL dialect. Result sets must use
/// the canonical aliases (`table_schema`, `table_name`, `column_name`,
/// `type_name`, `column_size`, `decimal_digits`, `is_nullable`, `remarks`)
/// that the `from_row` constructors expect.
pub trait QueryBuilder {
    /// One page of tables, ordered by (schema, name), optionally filtered
    /// to a single schema.
    fn tables_page_query(
        &self,
        schema_filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> String;

    /// Columns for a set of tables, ordered by table then ordinal position.
    fn columns_query(&self, tables: &[TableInfo]) -> String;

    /// All schema names, ordered.
    fn schemas_query(&self) -> String;
}

/// `information_schema` queries in plain ANSI SQL. Works as-is against
/// PostgreSQL and MySQL; dialects with their own catalogs supply their own
/// [`QueryBuilder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AnsiQueries;

impl QueryBuilder for AnsiQueries {
    fn tables_page_query(
        &self,
        schema_filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> String {
        let filter = match schema_filter {
            Some(schema) => format!(" AND t.table_schema = {}", sql_literal(schema)),
            None => String::new(),
        };
        format!(
            "SELECT t.table_schema AS table_schema, t.table_name AS table_name, \
             '' AS remarks \
             FROM information_schema.tables t \
             WHERE t.table_type = 'BASE TABLE'{filter} \
             ORDER BY t.table_schema, t.table_name \
             LIMIT {limit} OFFSET {offset}"
        )
    }

    fn columns_query(&self, tables: &[TableInfo]) -> String {
        let clauses = if tables.is_empty() {
            "1 = 0".to_string()
        } else {
            tables
                .iter()
                .map(|t| {
                    format!(
                        "(c.table_schema = {} AND c.table_name = {})",
                        sql_literal(&t.schema),
                        sql_literal(&t.name)
                    )
                })
                .collect::<Vec<_>>()
                .join(" OR ")
        };
        format!(
            "SELECT c.table_schema AS table_schema, c.table_name AS table_name, \
             c.column_name AS column_name, c.data_type AS type_name, \
             c.character_maximum_length AS column_size, \
             c.numeric_scale AS decimal_digits, c.is_nullable AS is_nullable, \
             '' AS remarks \
             FROM information_schema.columns c \
             WHERE {clauses} \
             ORDER BY c.table_schema, c.table_name, c.ordinal_position"
        )
    }

    fn schemas_query(&self) -> String {
        "SELECT schema_name AS schema_name \
         FROM information_schema.schemata \
         ORDER BY schema_name"
            .to_string()
    }
}

/// Single-quoted SQL literal with embedded quotes doubled.
fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// In-memory executor over a fixed catalog: two schemas, three tables,
/// seven columns. Understands the SQL shapes [`AnsiQueries`] emits well
/// enough to honor LIMIT/OFFSET paging and schema filters.
pub struct MockExecutor {
    tables: Vec<TableInfo>,
    columns: Vec<ColumnInfo>,
    calls: usize,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        let tables = vec![
            mock_table("AUDIT", "EVENTS", "Append-only audit trail"),
            mock_table("SALES", "CUSTOMERS", "Customer master"),
            mock_table("SALES", "ORDERS", "Order headers"),
        ];
        let columns = vec![
            mock_column("AUDIT", "EVENTS", "EVENT_ID", "INTEGER", None, None, Nulls::No),
            mock_column(
                "AUDIT",
                "EVENTS",
                "PAYLOAD",
                "VARCHAR",
                Some(2000),
                None,
                Nulls::Yes,
            ),
            mock_column("SALES", "CUSTOMERS", "ID", "INTEGER", None, None, Nulls::No),
            mock_column(
                "SALES",
                "CUSTOMERS",
                "NAME",
                "VARCHAR",
                Some(120),
                None,
                Nulls::No,
            ),
            mock_column(
                "SALES",
                "CUSTOMERS",
                "EMAIL",
                "VARCHAR",
                Some(255),
                None,
                Nulls::Yes,
            ),
            mock_column("SALES", "ORDERS", "ID", "INTEGER", None, None, Nulls::No),
            mock_column(
                "SALES",
                "ORDERS",
                "PLACED_AT",
                "TIMESTAMP",
                None,
                None,
                Nulls::Yes,
            ),
        ];
        Self {
            tables,
            columns,
            calls: 0,
        }
    }

    /// How many queries this executor has served. Replay-from-cache tests
    /// assert this stays at zero.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn tables_page(&self, sql: &str) -> Vec<Row> {
        let limit = parse_number_after(sql, "LIMIT").unwrap_or(usize::MAX);
        let offset = parse_number_after(sql, "OFFSET").unwrap_or(0);
        let filter = parse_schema_filter(sql);
        self.tables
            .iter()
            .filter(|t| filter.as_deref().is_none_or(|f| t.schema == f))
            .skip(offset)
            .take(limit)
            .map(table_row)
            .collect()
    }

    fn columns_for(&self, sql: &str) -> Vec<Row> {
        self.columns
            .iter()
            .filter(|c| {
                sql.contains(&sql_literal(&c.schema)) && sql.contains(&sql_literal(&c.table))
            })
            .map(column_row)
            .collect()
    }

    fn schema_rows(&self) -> Vec<Row> {
        let mut names: Vec<&str> = self.tables.iter().map(|t| t.schema.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .map(|name| Row::from([("schema_name".to_string(), json!(name))]))
            .collect()
    }
}

impl QueryExecutor for MockExecutor {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.calls += 1;
        if sql.contains("information_schema.columns") {
            Ok(self.columns_for(sql))
        } else if sql.contains("schemata") {
            Ok(self.schema_rows())
        } else {
            Ok(self.tables_page(sql))
        }
    }
}

fn mock_table(schema: &str, name: &str, remarks: &str) -> TableInfo {
    TableInfo {
        schema: schema.to_string(),
        name: name.to_string(),
        remarks: remarks.to_string(),
    }
}

fn mock_column(
    schema: &str,
    table: &str,
    name: &str,
    typename: &str,
    length: Option<i64>,
    scale: Option<i64>,
    nulls: Nulls,
) -> ColumnInfo {
    ColumnInfo {
        schema: schema.to_string(),
        table: table.to_string(),
        name: name.to_string(),
        typename: typename.to_string(),
        length,
        scale,
        nulls,
        remarks: String::new(),
    }
}

fn table_row(table: &TableInfo) -> Row {
    HashMap::from([
        ("table_schema".to_string(), json!(table.schema)),
        ("table_name".to_string(), json!(table.name)),
        ("remarks".to_string(), json!(table.remarks)),
    ])
}

fn column_row(column: &ColumnInfo) -> Row {
    HashMap::from([
        ("table_schema".to_string(), json!(column.schema)),
        ("table_name".to_string(), json!(column.table)),
        ("column_name".to_string(), json!(column.name)),
        ("type_name".to_string(), json!(column.typename)),
        (
            "column_size".to_string(),
            column.length.map_or(Value::Null, |v| json!(v)),
        ),
        (
            "decimal_digits".to_string(),
            column.scale.map_or(Value::Null, |v| json!(v)),
        ),
        (
            "is_nullable".to_string(),
            json!(if column.nulls.is_nullable() { "YES" } else { "NO" }),
        ),
        ("remarks".to_string(), json!(column.remarks)),
    ])
}

/// First integer following `keyword`, scanning from the end of the text
/// (pagination clauses sit at the tail of the query).
fn parse_number_after(sql: &str, keyword: &str) -> Option<usize> {
    let idx = sql.rfind(keyword)?;
    let rest = sql[idx + keyword.len()..].trim_start();
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn parse_schema_filter(sql: &str) -> Option<String> {
    let marker = "table_schema = '";
    let idx = sql.find(marker)?;
    let rest = &sql[idx + marker.len()..];
    let end = rest.find('\'')?;
    Some(rest[..end].replace("''", "'"))
}
