//! Tests for SQLite PRAGMA introspection

mod common;

use common::{sqlite_column, users_sqlite};
use lifeguard_schema::introspect::{introspect, AdapterKind, ReferentialAction};
use lifeguard_schema::mock::MockConnection;
use lifeguard_schema::{infer_schema, row, CanonicalType, DefaultValue, SchemaError};

#[test]
fn test_users_table() {
    let conn = users_sqlite("sqlite://app.db");
    let schema = infer_schema(&conn, "users").unwrap();

    assert_eq!(schema.adapter, AdapterKind::Sqlite);
    assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["id", "email", "name"]);
    assert_eq!(schema.primary_key.fields, vec!["id".to_string()]);
    assert_eq!(schema.find_field("id").unwrap().ty, CanonicalType::Identity);
    assert!(!schema.find_field("id").unwrap().meta.nullable);
    assert!(schema.find_field("name").unwrap().meta.nullable);
    assert_eq!(
        schema.indices.unique_single_field("email").unwrap().name,
        "sqlite_autoindex_users_1"
    );

    assert!(conn
        .executed()
        .iter()
        .any(|q| q == r#"PRAGMA table_info("users")"#));
}

#[test]
fn test_columns_follow_cid_order_and_composite_key_follows_pk_order() {
    let conn = MockConnection::sqlite("sqlite://app.db").on_query(
        "table_info",
        vec![
            sqlite_column(2, "tag", "TEXT", true, None, 1),
            sqlite_column(0, "post_id", "INTEGER", true, None, 2),
            sqlite_column(1, "note", "TEXT", false, Some("''"), 0),
        ],
    );

    let table = introspect(&conn, "post_tags").unwrap();
    let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["post_id", "note", "tag"]);
    assert_eq!(table.primary_key.columns, vec!["tag".to_string(), "post_id".to_string()]);

    let schema = infer_schema(&conn, "post_tags").unwrap();
    assert!(schema.composite_primary_key());
    assert_eq!(
        schema.find_field("note").unwrap().meta.default,
        Some(DefaultValue::String(String::new()))
    );
}

#[test]
fn test_foreign_keys_grouped_by_pragma_id() {
    let conn = MockConnection::sqlite("sqlite://app.db")
        .on_query(
            "table_info",
            vec![
                sqlite_column(0, "id", "INTEGER", true, None, 1),
                sqlite_column(1, "order_id", "INTEGER", true, None, 0),
                sqlite_column(2, "line_no", "INTEGER", true, None, 0),
                sqlite_column(3, "customer_id", "INTEGER", false, None, 0),
            ],
        )
        .on_query(
            "foreign_key_list",
            vec![
                row! {
                    "id" => 1, "seq" => 0, "table" => "customers", "from" => "customer_id",
                    "to" => lifeguard_schema::DbValue::Null, "on_update" => "NO ACTION",
                    "on_delete" => "SET NULL", "match" => "NONE",
                },
                row! {
                    "id" => 0, "seq" => 1, "table" => "order_lines", "from" => "line_no",
                    "to" => "line_no", "on_update" => "NO ACTION", "on_delete" => "CASCADE",
                    "match" => "NONE",
                },
                row! {
                    "id" => 0, "seq" => 0, "table" => "order_lines", "from" => "order_id",
                    "to" => "order_id", "on_update" => "NO ACTION", "on_delete" => "CASCADE",
                    "match" => "NONE",
                },
            ],
        );

    let table = introspect(&conn, "shipments").unwrap();
    assert_eq!(table.foreign_keys.len(), 2);

    let lines = &table.foreign_keys[0];
    assert_eq!(lines.name, None);
    assert_eq!(lines.columns, vec!["order_id".to_string(), "line_no".to_string()]);
    assert_eq!(lines.referenced_columns, vec!["order_id".to_string(), "line_no".to_string()]);
    assert_eq!(lines.on_delete, ReferentialAction::Cascade);

    let customer = &table.foreign_keys[1];
    assert_eq!(customer.referenced_table, "customers");
    assert!(customer.referenced_columns.is_empty());
    assert_eq!(customer.on_delete, ReferentialAction::SetNull);

    assert!(table.column("customer_id").unwrap().meta.foreign_key);
    let schema = infer_schema(&conn, "shipments").unwrap();
    assert_eq!(schema.find_field("customer_id").unwrap().ty, CanonicalType::Identity);
}

#[test]
fn test_indices_skip_primary_key_and_keep_list_order() {
    let conn = MockConnection::sqlite("sqlite://app.db")
        .on_query(
            "table_info",
            vec![
                sqlite_column(0, "code", "TEXT", true, None, 1),
                sqlite_column(1, "region", "TEXT", true, None, 0),
                sqlite_column(2, "city", "TEXT", false, None, 0),
            ],
        )
        .on_query(
            "index_list",
            vec![
                row! { "seq" => 2, "name" => "sqlite_autoindex_stores_1", "unique" => 1, "origin" => "pk", "partial" => 0 },
                row! { "seq" => 1, "name" => "idx_stores_city", "unique" => 0, "origin" => "c", "partial" => 0 },
                row! { "seq" => 0, "name" => "idx_stores_region_city", "unique" => 1, "origin" => "c", "partial" => 0 },
            ],
        )
        .on_query(
            r#"index_info("idx_stores_region_city")"#,
            vec![
                row! { "seqno" => 1, "cid" => 2, "name" => "city" },
                row! { "seqno" => 0, "cid" => 1, "name" => "region" },
            ],
        )
        .on_query(
            r#"index_info("idx_stores_city")"#,
            vec![row! { "seqno" => 0, "cid" => 2, "name" => "city" }],
        );

    let table = introspect(&conn, "stores").unwrap();
    let names: Vec<_> = table.indices.iter().map(|ix| ix.name.as_str()).collect();
    assert_eq!(names, vec!["idx_stores_region_city", "idx_stores_city"]);
    assert_eq!(
        table.indices[0].columns,
        vec!["region".to_string(), "city".to_string()]
    );
    assert!(table.indices[0].unique);

    // First covering index in list order wins.
    assert_eq!(
        table.column("city").unwrap().meta.index_name.as_deref(),
        Some("idx_stores_region_city")
    );
    assert!(!table.column("code").unwrap().meta.index);
}

#[test]
fn test_check_constraints_from_create_statement() {
    let conn = MockConnection::sqlite("sqlite://app.db")
        .on_query(
            "table_info",
            vec![
                sqlite_column(0, "id", "INTEGER", true, None, 1),
                sqlite_column(1, "price", "REAL", true, None, 0),
                sqlite_column(2, "active", "INTEGER", true, Some("TRUE"), 0),
            ],
        )
        .on_query(
            "sqlite_master",
            vec![row! {
                "sql" => "CREATE TABLE products (id INTEGER PRIMARY KEY, price REAL NOT NULL CHECK (price > 0), active INTEGER NOT NULL DEFAULT TRUE)",
            }],
        );

    let table = introspect(&conn, "products").unwrap();
    assert_eq!(
        table.column("price").unwrap().meta.check_constraints,
        vec!["price > 0".to_string()]
    );
    assert!(table.column("active").unwrap().meta.check_constraints.is_empty());

    let schema = infer_schema(&conn, "products").unwrap();
    assert_eq!(schema.find_field("price").unwrap().ty, CanonicalType::Float);
    assert_eq!(schema.find_field("active").unwrap().ty, CanonicalType::Boolean);
}

#[test]
fn test_pragma_failure_is_reported() {
    let conn = users_sqlite("sqlite://app.db").fail_on("foreign_key_list", "database is locked");
    assert!(matches!(
        introspect(&conn, "users"),
        Err(SchemaError::IntrospectionFailed { .. })
    ));
}

#[test]
fn test_engine_aliases() {
    let conn = MockConnection::new("SQLite3", "sqlite://app.db").on_query(
        "table_info",
        vec![sqlite_column(0, "id", "INTEGER", true, None, 1)],
    );
    assert_eq!(introspect(&conn, "t").unwrap().adapter, AdapterKind::Sqlite);
}
