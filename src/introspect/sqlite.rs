//! SQLite PRAGMA introspection
//!
//! SQLite does not name foreign keys: `PRAGMA foreign_key_list` only groups
//! the columns of one constraint under a shared `id`, so composite keys are
//! rebuilt from that ordinal and carry no name. Check constraints are not
//! exposed by any PRAGMA and are read from the `CREATE TABLE` text instead.

use super::{quote_ident, Adapter, AdapterKind, Column, ColumnMeta, RawCheck, RawForeignKey, RawIndex, ReferentialAction, TableRef};
use crate::connection::{Connection, ConnectionError, DbValue, Row};
use once_cell::sync::Lazy;
use regex::Regex;

static CHECK_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcheck\s*\(").unwrap());

/// Adapter for SQLite databases
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteAdapter;

impl SqliteAdapter {
    /// `PRAGMA [schema.]name("arg")`
    fn pragma(target: &TableRef, pragma: &str, arg: &str) -> String {
        match &target.schema {
            Some(schema) => format!("PRAGMA {}.{}({})", quote_ident(schema), pragma, quote_ident(arg)),
            None => format!("PRAGMA {}({})", pragma, quote_ident(arg)),
        }
    }

    fn table_info(conn: &dyn Connection, target: &TableRef) -> Result<Vec<Row>, ConnectionError> {
        let mut rows = conn.query_all(&Self::pragma(target, "table_info", &target.name), &[])?;
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows.drain(..) {
            keyed.push((row.int("cid")?, row));
        }
        keyed.sort_by_key(|(cid, _)| *cid);
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    fn index_columns(conn: &dyn Connection, target: &TableRef, index: &str) -> Result<Vec<String>, ConnectionError> {
        let rows = conn.query_all(&Self::pragma(target, "index_info", index), &[])?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            // Expression index terms have no column name.
            if let Some(name) = row.opt_text("name")? {
                columns.push((row.int("seqno")?, name));
            }
        }
        columns.sort_by_key(|(seqno, _)| *seqno);
        Ok(columns.into_iter().map(|(_, name)| name).collect())
    }
}

impl Adapter for SqliteAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Sqlite
    }

    fn columns(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<Column>, ConnectionError> {
        Self::table_info(conn, target)?
            .iter()
            .map(|row| {
                let not_null = row.bool("notnull")?;
                let in_pk = row.int("pk")? > 0;
                Ok(Column {
                    name: row.text("name")?,
                    raw_type: row.opt_text("type")?.unwrap_or_default(),
                    meta: ColumnMeta {
                        nullable: !not_null && !in_pk,
                        default: row.opt_text("dflt_value")?,
                        ..ColumnMeta::default()
                    },
                })
            })
            .collect()
    }

    fn primary_key(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<String>, ConnectionError> {
        let mut keyed = Vec::new();
        for row in Self::table_info(conn, target)? {
            let position = row.int("pk")?;
            if position > 0 {
                keyed.push((position, row.text("name")?));
            }
        }
        keyed.sort_by_key(|(position, _)| *position);
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    fn foreign_keys(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawForeignKey>, ConnectionError> {
        let rows = conn.query_all(&Self::pragma(target, "foreign_key_list", &target.name), &[])?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push((row.int("id")?, row.int("seq")?, row));
        }
        entries.sort_by_key(|(id, seq, _)| (*id, *seq));

        let mut keys: Vec<(i64, RawForeignKey)> = Vec::new();
        for (id, _, row) in entries {
            let column = row.text("from")?;
            // NULL `to` references the parent's primary key.
            let referenced = row.opt_text("to")?;

            match keys.last_mut() {
                Some((last_id, fk)) if *last_id == id => {
                    fk.columns.push(column);
                    fk.referenced_columns.extend(referenced);
                }
                _ => keys.push((
                    id,
                    RawForeignKey {
                        name: None,
                        columns: vec![column],
                        referenced_table: row.text("table")?,
                        referenced_columns: referenced.into_iter().collect(),
                        on_delete: ReferentialAction::from_sql(&row.opt_text("on_delete")?.unwrap_or_default()),
                        on_update: ReferentialAction::from_sql(&row.opt_text("on_update")?.unwrap_or_default()),
                    },
                )),
            }
        }
        Ok(keys.into_iter().map(|(_, fk)| fk).collect())
    }

    fn indices(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawIndex>, ConnectionError> {
        let rows = conn.query_all(&Self::pragma(target, "index_list", &target.name), &[])?;

        let mut listed = Vec::with_capacity(rows.len());
        for row in &rows {
            let origin = row.opt_text("origin")?.unwrap_or_default();
            if origin == "pk" {
                continue;
            }
            listed.push((row.int("seq")?, row.text("name")?, row.bool("unique")?));
        }
        listed.sort_by_key(|(seq, _, _)| *seq);

        let mut indices = Vec::with_capacity(listed.len());
        for (_, name, unique) in listed {
            let columns = Self::index_columns(conn, target, &name)?;
            indices.push(RawIndex {
                name,
                columns,
                unique,
                kind: None,
            });
        }
        Ok(indices)
    }

    fn check_constraints(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawCheck>, ConnectionError> {
        let master = match &target.schema {
            Some(schema) => format!("{}.sqlite_master", quote_ident(schema)),
            None => "sqlite_master".to_string(),
        };
        let query = format!("SELECT sql FROM {} WHERE type = 'table' AND name = ?1", master);
        let rows = conn.query_all(&query, &[DbValue::from(target.name.as_str())])?;

        let mut checks = Vec::new();
        for row in &rows {
            if let Some(sql) = row.opt_text("sql")? {
                checks.extend(extract_checks(&sql).into_iter().map(|expression| RawCheck {
                    columns: Vec::new(),
                    expression,
                }));
            }
        }
        Ok(checks)
    }
}

/// Bodies of every `CHECK (...)` clause in a `CREATE TABLE` statement
fn extract_checks(sql: &str) -> Vec<String> {
    let mut checks = Vec::new();
    for m in CHECK_KEYWORD.find_iter(sql) {
        // The match ends just past the opening parenthesis.
        if let Some(body) = balanced_body(&sql[m.end()..]) {
            checks.push(body.trim().to_string());
        }
    }
    checks
}

/// Text up to the parenthesis closing an already opened one
fn balanced_body(s: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..i]);
                }
            }
            _ => {}
        }
    }
    None
}
