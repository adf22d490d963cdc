use schemax::cancel::CancelToken;
use schemax::search::{SearchIndex, Trie, fuzzy};
use schemax::types::{ColumnInfo, Nulls, TableInfo};

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
        typename: "VARCHAR".to_string(),
        length: Some(64),
        scale: None,
        nulls: Nulls::Yes,
        remarks: String::new(),
    }
}

// --- trie ---

#[test]
fn test_trie_prefix_round_trip() {
    let mut trie: Trie<u32> = Trie::new();
    trie.insert("orders", 0);
    trie.insert("order_items", 1);
    trie.insert("customers", 2);

    assert_eq!(trie.search_prefix("o"), &[0, 1]);
    assert_eq!(trie.search_prefix("order"), &[0, 1]);
    assert_eq!(trie.search_prefix("orders"), &[0]);
    assert_eq!(trie.search_prefix("order_"), &[1]);
    assert_eq!(trie.search_prefix("customers"), &[2]);

    // every prefix of an inserted key finds that key's payload
    for (end, _) in "order_items".char_indices() {
        assert!(trie.search_prefix(&"order_items"[..=end]).contains(&1));
    }
}

#[test]
fn test_trie_case_insensitive() {
    let mut trie: Trie<u32> = Trie::new();
    trie.insert("Orders", 1);

    assert_eq!(trie.search_prefix("ORD"), &[1]);
    assert_eq!(trie.search_prefix("ord"), &[1]);
    assert_eq!(trie.search_prefix("OrDeRs"), &[1]);
}

#[test]
fn test_trie_idempotent_insert() {
    let mut trie: Trie<u32> = Trie::new();
    trie.insert("orders", 7);
    trie.insert("orders", 7);
    trie.insert("ORDERS", 7);

    assert_eq!(trie.search_prefix("orders"), &[7]);
    assert_eq!(trie.len(), 1);
}

#[test]
fn test_trie_same_key_distinct_payloads() {
    let mut trie: Trie<u32> = Trie::new();
    trie.insert("id", 1);
    trie.insert("id", 2);

    assert_eq!(trie.search_prefix("id"), &[1, 2]);
    assert_eq!(trie.len(), 2);
}

#[test]
fn test_trie_empty_prefix_returns_all() {
    let mut trie: Trie<u32> = Trie::new();
    trie.insert("a", 0);
    trie.insert("b", 1);

    assert_eq!(trie.search_prefix(""), &[0, 1]);
}

#[test]
fn test_trie_unknown_prefix_is_empty() {
    let mut trie: Trie<u32> = Trie::new();
    trie.insert("orders", 0);

    assert!(trie.search_prefix("z").is_empty());
    assert!(trie.search_prefix("orderss").is_empty());
    let empty: Trie<u32> = Trie::new();
    assert!(empty.search_prefix("anything").is_empty());
}

// --- fuzzy matches ---

#[test]
fn test_fuzzy_empty_query_matches_everything() {
    assert!(fuzzy::matches("anything", ""));
    assert!(fuzzy::matches("", ""));
}

#[test]
fn test_fuzzy_equality_ignores_case() {
    assert!(fuzzy::matches("ORDERS", "orders"));
    assert!(fuzzy::matches("orders", "ORDERS"));
}

#[test]
fn test_fuzzy_substring() {
    assert!(fuzzy::matches("customer_orders", "tomer"));
    assert!(fuzzy::matches("CUSTOMER_ORDERS", "r_o"));
}

#[test]
fn test_fuzzy_token_prefix_snake_case() {
    assert!(fuzzy::matches("order_items", "ite"));
    assert!(fuzzy::matches("order_line_items", "lin"));
}

#[test]
fn test_fuzzy_token_prefix_camel_case() {
    assert!(fuzzy::matches("customerOrders", "ord"));
    assert!(fuzzy::matches("placedAt", "at"));
}

#[test]
fn test_fuzzy_rejects_unrelated() {
    assert!(!fuzzy::matches("orders", "xyz"));
    assert!(!fuzzy::matches("", "a"));
}

// --- fuzzy edit distance ---

#[test]
fn test_edit_distance_zero_iff_equal() {
    assert_eq!(fuzzy::edit_distance("orders", "orders"), 0);
    assert_ne!(fuzzy::edit_distance("orders", "order"), 0);
}

#[test]
fn test_edit_distance_symmetric() {
    for (a, b) in [("kitten", "sitting"), ("", "abc"), ("order", "orders")] {
        assert_eq!(fuzzy::edit_distance(a, b), fuzzy::edit_distance(b, a));
    }
}

#[test]
fn test_edit_distance_known_values() {
    assert_eq!(fuzzy::edit_distance("kitten", "sitting"), 3);
    assert_eq!(fuzzy::edit_distance("", "abc"), 3);
    assert_eq!(fuzzy::edit_distance("order", "orders"), 1);
}

// --- search index ---

#[test]
fn test_search_prefix_matches_tables_and_columns() {
    let index = SearchIndex::build(
        vec![
            table("SALES", "ORDERS"),
            table("SALES", "ORDER_ITEMS"),
            table("AUDIT", "EVENTS"),
        ],
        vec![
            column("SALES", "ORDERS", "ORDER_ID"),
            column("AUDIT", "EVENTS", "EVENT_ID"),
        ],
    );
    let results = index.search("order", &CancelToken::new());

    let names: Vec<&str> = results.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["ORDERS", "ORDER_ITEMS"]);
    let cols: Vec<&str> = results.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cols, vec!["ORDER_ID"]);
}

#[test]
fn test_search_per_category_agrees_with_combined() {
    let index = SearchIndex::build(
        vec![table("SALES", "ORDERS"), table("AUDIT", "EVENTS")],
        vec![
            column("SALES", "ORDERS", "ORDER_ID"),
            column("AUDIT", "EVENTS", "EVENT_ID"),
        ],
    );
    let cancel = CancelToken::new();

    let combined = index.search("order", &cancel);
    assert_eq!(index.search_tables("order", &cancel), combined.tables);
    assert_eq!(index.search_columns("order", &cancel), combined.columns);

    assert_eq!(index.search_tables("  ", &cancel).len(), 2);
    assert_eq!(index.search_columns("", &cancel).len(), 2);
}

#[test]
fn test_search_qualified_name_prefix() {
    let index = SearchIndex::build(
        vec![
            table("SALES", "ORDERS"),
            table("SALES", "CUSTOMERS"),
            table("AUDIT", "EVENTS"),
        ],
        Vec::new(),
    );

    let results = index.search("sales.", &CancelToken::new());
    let names: Vec<&str> = results.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["ORDERS", "CUSTOMERS"]);

    let results = index.search("audit", &CancelToken::new());
    let names: Vec<&str> = results.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["EVENTS"]);
}

#[test]
fn test_search_dedups_bare_and_qualified_hit() {
    // "orders" is both the bare name and a prefix of "orders_dw.orders".
    let index = SearchIndex::build(vec![table("ORDERS_DW", "ORDERS")], Vec::new());
    let results = index.search("orders", &CancelToken::new());

    assert_eq!(results.tables.len(), 1);
    assert_eq!(results.tables[0].name, "ORDERS");
}

#[test]
fn test_search_fuzzy_fallback_ranks_by_distance() {
    // No name starts with "ustom", so the fuzzy pass takes over; the
    // shorter name is closer by edit distance and must come first even
    // though it was inserted second.
    let index = SearchIndex::build(
        vec![
            table("SALES", "CUSTOMER_ADDRESSES"),
            table("SALES", "CUSTOMERS"),
        ],
        Vec::new(),
    );
    let results = index.search("ustom", &CancelToken::new());

    let names: Vec<&str> = results.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["CUSTOMERS", "CUSTOMER_ADDRESSES"]);
}

#[test]
fn test_search_fuzzy_tie_keeps_insertion_order() {
    let index = SearchIndex::build(
        vec![table("S", "XORDER"), table("S", "YORDER")],
        Vec::new(),
    );
    let results = index.search("order", &CancelToken::new());

    let names: Vec<&str> = results.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["XORDER", "YORDER"]);
}

#[test]
fn test_search_empty_query_returns_everything() {
    let index = SearchIndex::build(
        vec![table("SALES", "ORDERS"), table("AUDIT", "EVENTS")],
        vec![column("SALES", "ORDERS", "ORDER_ID")],
    );

    let results = index.search("", &CancelToken::new());
    let names: Vec<&str> = results.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["ORDERS", "EVENTS"]);
    assert_eq!(results.columns.len(), 1);

    let padded = index.search("   ", &CancelToken::new());
    assert_eq!(padded, results);
}

#[test]
fn test_search_empty_index_is_safe() {
    let index = SearchIndex::new();
    let results = index.search("anything", &CancelToken::new());

    assert!(results.tables.is_empty());
    assert!(results.columns.is_empty());
}

#[test]
fn test_search_cancelled_returns_empty() {
    let index = SearchIndex::build(
        vec![table("SALES", "ORDERS")],
        vec![column("SALES", "ORDERS", "ORDER_ID")],
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    assert!(index.search("order", &cancel).is_empty());
}

#[test]
fn test_index_skips_unnamed_entries() {
    let index = SearchIndex::build(
        vec![table("SALES", ""), table("SALES", "ORDERS")],
        vec![column("SALES", "ORDERS", "")],
    );

    assert_eq!(index.table_count(), 1);
    assert_eq!(index.column_count(), 0);
    let results = index.search("orders", &CancelToken::new());
    assert_eq!(results.tables.len(), 1);
}

#[test]
fn test_index_rebuild_picks_up_new_entries() {
    let index = SearchIndex::build(vec![table("SALES", "ORDERS")], Vec::new());
    assert_eq!(index.search("order", &CancelToken::new()).tables.len(), 1);

    let index = SearchIndex::build(
        vec![table("SALES", "ORDERS"), table("SALES", "ORDER_ITEMS")],
        vec![column("SALES", "ORDER_ITEMS", "ORDER_ID")],
    );

    assert_eq!(index.table_count(), 2);
    let results = index.search("order", &CancelToken::new());
    assert_eq!(results.tables.len(), 2);
    assert_eq!(results.columns.len(), 1);
}
