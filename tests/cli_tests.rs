use std::time::Duration;

use schemax::cancel::CancelToken;
use schemax::cli::{render_search_results, render_summary};
use schemax::loader::{LoadOutcome, LoadedMeta};
use schemax::search::SearchIndex;
use schemax::types::{ColumnInfo, Nulls, SchemaInfo, TableInfo};

fn table(schema: &str, name: &str) -> TableInfo {
    TableInfo {
        schema: schema.to_string(),
        name: name.to_string(),
        remarks: String::new(),
    }
}

fn column(schema: &str, table: &str, name: &str) -> ColumnInfo {
    ColumnInfo {
        schema: schema.to_string(),
        table: table.to_string(),
        name: name.to_string(),
        typename: "INTEGER".to_string(),
        length: None,
        scale: None,
        nulls: Nulls::No,
        remarks: String::new(),
    }
}

fn schema(name: &str, table_count: usize) -> SchemaInfo {
    SchemaInfo {
        name: name.to_string(),
        table_count,
    }
}

// --- load summary ---

#[test]
fn test_summary_for_live_load() {
    let meta = LoadedMeta {
        tables: vec![table("AUDIT", "EVENTS"), table("SALES", "ORDERS")],
        columns: vec![column("SALES", "ORDERS", "ID")],
        schemas: vec![schema("AUDIT", 1), schema("SALES", 1)],
    };
    let outcome = LoadOutcome::Completed { tables: 2 };

    let text = render_summary(&outcome, &meta, Duration::from_millis(400));

    assert_eq!(
        text,
        "loaded 2 tables, 1 columns across 2 schemas in 0.4s\n  AUDIT: 1\n  SALES: 1"
    );
}

#[test]
fn test_summary_for_cache_replay() {
    let meta = LoadedMeta {
        tables: vec![table("SALES", "ORDERS")],
        columns: Vec::new(),
        schemas: vec![schema("SALES", 1)],
    };
    let outcome = LoadOutcome::FromCache { tables: 1 };

    let text = render_summary(&outcome, &meta, Duration::from_millis(100));

    assert!(text.starts_with("replayed 1 tables, 0 columns"));
    assert!(text.contains("from cache in 0.1s"));
}

#[test]
fn test_summary_for_cancelled_run() {
    let meta = LoadedMeta {
        tables: vec![table("SALES", "ORDERS")],
        columns: Vec::new(),
        schemas: Vec::new(),
    };

    let text = render_summary(&LoadOutcome::Cancelled, &meta, Duration::from_secs(9));

    assert_eq!(text, "cancelled after 1 tables, 0 columns");
}

#[test]
fn test_summary_for_failed_run() {
    let outcome = LoadOutcome::Failed {
        message: "connection refused".to_string(),
    };

    let text = render_summary(&outcome, &LoadedMeta::default(), Duration::ZERO);

    assert_eq!(text, "load failed: connection refused");
}

// --- search summary ---

#[test]
fn test_search_results_render_qualified_names() {
    let index = SearchIndex::build(
        vec![table("SALES", "ORDERS")],
        vec![column("SALES", "ORDERS", "ORDER_ID")],
    );
    let results = index.search("order", &CancelToken::new());

    let text = render_search_results("order", &results);

    assert_eq!(
        text,
        "1 tables, 1 columns match \"order\"\n  SALES.ORDERS\n  SALES.ORDERS.ORDER_ID"
    );
}

#[test]
fn test_search_results_render_empty_matches() {
    let index = SearchIndex::build(vec![table("SALES", "ORDERS")], Vec::new());
    let results = index.search("zzz", &CancelToken::new());

    assert_eq!(render_search_results("zzz", &results), "0 tables, 0 columns match \"zzz\"");
}
