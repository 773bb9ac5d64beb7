//! Postgres catalog introspection
//!
//! Columns come from `information_schema.columns`; keys, indices and check
//! constraints from `pg_catalog`, which keeps multi-column constraints in key
//! order via `unnest(...) WITH ORDINALITY`.

use super::{Adapter, AdapterKind, Column, ColumnMeta, RawCheck, RawForeignKey, RawIndex, ReferentialAction, TableRef};
use crate::connection::{Connection, ConnectionError, DbValue, Row};

const DEFAULT_SCHEMA: &str = "public";

/// Raw default reported for identity columns, which have no `column_default`
const IDENTITY_DEFAULT: &str = "GENERATED BY DEFAULT AS IDENTITY";

const COLUMNS_QUERY: &str = r#"
SELECT
    c.column_name,
    c.data_type,
    c.udt_name,
    c.is_nullable,
    c.column_default,
    c.is_identity,
    c.identity_generation,
    c.udt_schema,
    et.typtype::text AS element_kind,
    en.nspname AS element_schema,
    c.ordinal_position
FROM information_schema.columns c
LEFT JOIN pg_catalog.pg_namespace un ON un.nspname = c.udt_schema
LEFT JOIN pg_catalog.pg_type ut ON ut.typnamespace = un.oid AND ut.typname = c.udt_name
LEFT JOIN pg_catalog.pg_type et ON et.oid = ut.typelem AND ut.typcategory = 'A'
LEFT JOIN pg_catalog.pg_namespace en ON en.oid = et.typnamespace
WHERE c.table_schema = $1 AND c.table_name = $2
ORDER BY c.ordinal_position
"#;

const ENUM_LABELS_QUERY: &str = r#"
SELECT e.enumlabel AS label
FROM pg_catalog.pg_type t
JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
WHERE n.nspname = $1 AND t.typname = $2
ORDER BY e.enumsortorder
"#;

const PRIMARY_KEY_QUERY: &str = r#"
SELECT a.attname AS pk_column
FROM pg_catalog.pg_index ix
JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, position) ON TRUE
JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE n.nspname = $1 AND t.relname = $2 AND ix.indisprimary
ORDER BY k.position
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
SELECT
    con.conname AS constraint_name,
    src.attname AS column_name,
    ref_table.relname AS referenced_table,
    ref_col.attname AS referenced_column,
    con.confdeltype::text AS on_delete,
    con.confupdtype::text AS on_update
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
JOIN pg_catalog.pg_class ref_table ON ref_table.oid = con.confrelid
JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(src_attnum, ref_attnum, position) ON TRUE
JOIN pg_catalog.pg_attribute src ON src.attrelid = con.conrelid AND src.attnum = k.src_attnum
JOIN pg_catalog.pg_attribute ref_col ON ref_col.attrelid = con.confrelid AND ref_col.attnum = k.ref_attnum
WHERE n.nspname = $1 AND t.relname = $2 AND con.contype = 'f'
ORDER BY con.conname, k.position
"#;

const INDICES_QUERY: &str = r#"
SELECT
    i.relname AS index_name,
    a.attname AS column_name,
    ix.indisunique AS is_unique,
    am.amname AS index_type
FROM pg_catalog.pg_index ix
JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
JOIN pg_catalog.pg_am am ON am.oid = i.relam
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, position) ON TRUE
JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary
ORDER BY i.relname, k.position
"#;

const CHECKS_QUERY: &str = r#"
SELECT
    con.conname AS constraint_name,
    a.attname AS column_name,
    pg_catalog.pg_get_constraintdef(con.oid) AS definition
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
LEFT JOIN LATERAL unnest(con.conkey) AS k(attnum) ON TRUE
LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
WHERE n.nspname = $1 AND t.relname = $2 AND con.contype = 'c'
ORDER BY con.conname, a.attnum
"#;

/// Adapter for Postgres and wire-compatible engines
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter;

impl PostgresAdapter {
    fn params(target: &TableRef) -> [DbValue; 2] {
        [
            DbValue::from(target.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)),
            DbValue::from(target.name.as_str()),
        ]
    }

    /// Labels of the enum `type_name` declared in `type_schema`
    fn enum_labels(
        &self,
        conn: &dyn Connection,
        type_schema: &str,
        type_name: &str,
    ) -> Result<Option<Vec<String>>, ConnectionError> {
        let rows = conn.query_all(ENUM_LABELS_QUERY, &[DbValue::from(type_schema), DbValue::from(type_name)])?;
        if rows.is_empty() {
            // Domains and composite types are user-defined too.
            return Ok(None);
        }
        let labels = rows
            .iter()
            .map(|row| row.text("label"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(labels))
    }

    fn column_from_row(&self, conn: &dyn Connection, row: &Row, namespace: &str) -> Result<Column, ConnectionError> {
        let name = row.text("column_name")?;
        let data_type = row.text("data_type")?;
        let udt_name = row.text("udt_name")?;
        let optional = |column: &str| row.opt_text(column).ok().flatten();
        let udt_schema = optional("udt_schema").unwrap_or_else(|| namespace.to_string());

        let mut enum_values = None;
        let raw_type = match data_type.as_str() {
            "ARRAY" => {
                let element = udt_name.trim_start_matches('_');
                if optional("element_kind").as_deref() == Some("e") {
                    let element_schema = optional("element_schema").unwrap_or_else(|| udt_schema.clone());
                    enum_values = self.enum_labels(conn, &element_schema, element)?;
                }
                format!("{element}[]")
            }
            "USER-DEFINED" => {
                enum_values = self.enum_labels(conn, &udt_schema, &udt_name)?;
                udt_name
            }
            _ => udt_name,
        };

        let mut default = row.opt_text("column_default")?;
        if default.is_none() && row.bool("is_identity").unwrap_or(false) {
            default = Some(match row.opt_text("identity_generation").ok().flatten() {
                Some(generation) => format!("GENERATED {} AS IDENTITY", generation.to_ascii_uppercase()),
                None => IDENTITY_DEFAULT.to_string(),
            });
        }

        Ok(Column {
            name,
            raw_type,
            meta: ColumnMeta {
                nullable: row.bool("is_nullable")?,
                default,
                enum_values,
                ..ColumnMeta::default()
            },
        })
    }
}

impl Adapter for PostgresAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Postgres
    }

    fn namespace(&self, target: &TableRef) -> Option<String> {
        Some(target.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.to_string()))
    }

    fn columns(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<Column>, ConnectionError> {
        let rows = conn.query_all(COLUMNS_QUERY, &Self::params(target))?;
        let namespace = target.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        rows.iter().map(|row| self.column_from_row(conn, row, namespace)).collect()
    }

    fn primary_key(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<String>, ConnectionError> {
        conn.query_all(PRIMARY_KEY_QUERY, &Self::params(target))?
            .iter()
            .map(|row| row.text("pk_column"))
            .collect()
    }

    fn foreign_keys(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawForeignKey>, ConnectionError> {
        let rows = conn.query_all(FOREIGN_KEYS_QUERY, &Self::params(target))?;

        let mut keys: Vec<RawForeignKey> = Vec::new();
        for row in &rows {
            let name = row.text("constraint_name")?;
            let column = row.text("column_name")?;
            let referenced_column = row.text("referenced_column")?;

            match keys.iter_mut().find(|fk| fk.name.as_deref() == Some(name.as_str())) {
                Some(fk) => {
                    fk.columns.push(column);
                    fk.referenced_columns.push(referenced_column);
                }
                None => keys.push(RawForeignKey {
                    name: Some(name),
                    columns: vec![column],
                    referenced_table: row.text("referenced_table")?,
                    referenced_columns: vec![referenced_column],
                    on_delete: action_from_code(&row.opt_text("on_delete")?.unwrap_or_default()),
                    on_update: action_from_code(&row.opt_text("on_update")?.unwrap_or_default()),
                }),
            }
        }
        Ok(keys)
    }

    fn indices(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawIndex>, ConnectionError> {
        let rows = conn.query_all(INDICES_QUERY, &Self::params(target))?;

        let mut indices: Vec<RawIndex> = Vec::new();
        for row in &rows {
            let name = row.text("index_name")?;
            let column = row.text("column_name")?;

            match indices.iter_mut().find(|ix| ix.name == name) {
                Some(ix) => ix.columns.push(column),
                None => indices.push(RawIndex {
                    name,
                    columns: vec![column],
                    unique: row.bool("is_unique")?,
                    kind: row.opt_text("index_type")?,
                }),
            }
        }
        Ok(indices)
    }

    fn check_constraints(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawCheck>, ConnectionError> {
        let rows = conn.query_all(CHECKS_QUERY, &Self::params(target))?;

        let mut checks: Vec<(String, RawCheck)> = Vec::new();
        for row in &rows {
            let name = row.text("constraint_name")?;
            let column = row.opt_text("column_name")?;

            let index = match checks.iter().position(|(n, _)| *n == name) {
                Some(index) => index,
                None => {
                    checks.push((
                        name,
                        RawCheck {
                            columns: Vec::new(),
                            expression: row.text("definition")?,
                        },
                    ));
                    checks.len() - 1
                }
            };
            if let Some(column) = column {
                checks[index].1.columns.push(column);
            }
        }
        Ok(checks.into_iter().map(|(_, check)| check).collect())
    }
}

/// `pg_constraint.confdeltype` / `confupdtype` codes
fn action_from_code(code: &str) -> ReferentialAction {
    match code.trim() {
        "r" => ReferentialAction::Restrict,
        "c" => ReferentialAction::Cascade,
        "n" => ReferentialAction::SetNull,
        "d" => ReferentialAction::SetDefault,
        _ => ReferentialAction::NoAction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes() {
        assert_eq!(action_from_code("a"), ReferentialAction::NoAction);
        assert_eq!(action_from_code("r"), ReferentialAction::Restrict);
        assert_eq!(action_from_code("c"), ReferentialAction::Cascade);
        assert_eq!(action_from_code("n"), ReferentialAction::SetNull);
        assert_eq!(action_from_code("d"), ReferentialAction::SetDefault);
    }

    #[test]
    fn test_params_default_to_public() {
        let params = PostgresAdapter::params(&TableRef::parse("users"));
        assert_eq!(params[0], DbValue::from("public"));
        assert_eq!(params[1], DbValue::from("users"));

        let params = PostgresAdapter::params(&TableRef::parse("billing.invoices"));
        assert_eq!(params[0], DbValue::from("billing"));
    }
}
