//! Shared catalog fixtures

#![allow(dead_code)]

use lifeguard_schema::connection::{DbValue, Row};
use lifeguard_schema::mock::MockConnection;
use lifeguard_schema::row;

/// `users(id INTEGER PRIMARY KEY, email TEXT UNIQUE, name TEXT)` on Postgres
pub fn users_postgres(identity: &str) -> MockConnection {
    MockConnection::postgres(identity)
        .on_query(
            "information_schema.columns",
            vec![
                base_column("id", "int4", false, Some("nextval('users_id_seq'::regclass)")),
                base_column("email", "text", false, None),
                base_column("name", "text", true, None),
            ],
        )
        .on_query("pk_column", vec![row! { "pk_column" => "id" }])
        .on_query(
            "index_name",
            vec![row! {
                "index_name" => "users_email_key",
                "column_name" => "email",
                "is_unique" => true,
                "index_type" => "btree",
            }],
        )
}

/// Column row for a built-in (non-array, non-enum) Postgres type
pub fn base_column(name: &str, udt: &str, nullable: bool, default: Option<&str>) -> Row {
    row! {
        "column_name" => name,
        "data_type" => udt,
        "udt_name" => udt,
        "is_nullable" => if nullable { "YES" } else { "NO" },
        "column_default" => default,
        "is_identity" => "NO",
        "identity_generation" => DbValue::Null,
    }
}

/// `PRAGMA table_info` row
pub fn sqlite_column(cid: i64, name: &str, ty: &str, not_null: bool, default: Option<&str>, pk: i64) -> Row {
    row! {
        "cid" => cid,
        "name" => name,
        "type" => ty,
        "notnull" => if not_null { 1 } else { 0 },
        "dflt_value" => default,
        "pk" => pk,
    }
}

/// `users` on SQLite, same shape as [`users_postgres`]
pub fn users_sqlite(identity: &str) -> MockConnection {
    MockConnection::sqlite(identity)
        .on_query(
            "table_info",
            vec![
                sqlite_column(0, "id", "INTEGER", false, None, 1),
                sqlite_column(1, "email", "TEXT", true, None, 0),
                sqlite_column(2, "name", "TEXT", false, None, 0),
            ],
        )
        .on_query(
            "index_list",
            vec![row! {
                "seq" => 0,
                "name" => "sqlite_autoindex_users_1",
                "unique" => 1,
                "origin" => "u",
                "partial" => 0,
            }],
        )
        .on_query(
            "index_info",
            vec![row! { "seqno" => 0, "cid" => 1, "name" => "email" }],
        )
}
