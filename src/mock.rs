//! Scripted connection for tests
//!
//! [`MockConnection`] answers queries from a list of `(fragment, response)`
//! rules: the first rule whose fragment occurs in the query text wins. Unmatched
//! queries return no rows. Every executed query is recorded.

use crate::connection::{Connection, ConnectionError, DbValue, Row};
use std::path::PathBuf;
use std::sync::Mutex;

enum Response {
    Rows(Vec<Row>),
    Error(String),
}

struct Rule {
    fragment: String,
    response: Response,
}

/// A [`Connection`] that replays scripted catalog responses
pub struct MockConnection {
    engine: String,
    identity: String,
    migrations_dir: Option<PathBuf>,
    rules: Vec<Rule>,
    log: Mutex<Vec<(String, Vec<DbValue>)>>,
}

impl MockConnection {
    pub fn new(engine: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            identity: identity.into(),
            migrations_dir: None,
            rules: Vec::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn postgres(identity: impl Into<String>) -> Self {
        Self::new("postgres", identity)
    }

    pub fn sqlite(identity: impl Into<String>) -> Self {
        Self::new("sqlite", identity)
    }

    /// Associate a migration directory with this connection
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = Some(dir.into());
        self
    }

    /// Answer queries containing `fragment` with `rows`
    pub fn on_query(mut self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
        self.rules.push(Rule {
            fragment: fragment.into(),
            response: Response::Rows(rows),
        });
        self
    }

    /// Fail queries containing `fragment`
    pub fn fail_on(mut self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(Rule {
            fragment: fragment.into(),
            response: Response::Error(message.into()),
        });
        self
    }

    /// Queries executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.lock_log().iter().map(|(q, _)| q.clone()).collect()
    }

    /// Parameters bound to the `n`th executed query
    pub fn params_of(&self, n: usize) -> Option<Vec<DbValue>> {
        self.lock_log().get(n).map(|(_, p)| p.clone())
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<DbValue>)>> {
        // A panicking test thread must not hide the log from the others.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connection for MockConnection {
    fn engine(&self) -> &str {
        &self.engine
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn query_all(&self, query: &str, params: &[DbValue]) -> Result<Vec<Row>, ConnectionError> {
        self.lock_log().push((query.to_string(), params.to_vec()));

        match self.rules.iter().find(|rule| query.contains(&rule.fragment)) {
            Some(Rule {
                response: Response::Rows(rows),
                ..
            }) => Ok(rows.clone()),
            Some(Rule {
                response: Response::Error(message),
                ..
            }) => Err(ConnectionError::Query(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn migrations_dir(&self) -> Option<PathBuf> {
        self.migrations_dir.clone()
    }
}

/// Build a [`Row`] from `name => value` pairs
///
/// ```
/// use lifeguard_schema::row;
///
/// let r = row! { "name" => "id", "pk" => 1 };
/// assert_eq!(r.text("name").unwrap(), "id");
/// ```
#[macro_export]
macro_rules! row {
    ($($name:expr => $value:expr),* $(,)?) => {{
        let mut row = $crate::connection::Row::new();
        $(row.push($name, $value);)*
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_rule_wins() {
        let conn = MockConnection::postgres("pg://test")
            .on_query("information_schema.columns", vec![crate::row! { "column_name" => "id" }])
            .fail_on("pg_index", "permission denied");

        let rows = conn
            .query_all("SELECT * FROM information_schema.columns", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);

        let err = conn.query_all("SELECT * FROM pg_index", &[]).unwrap_err();
        assert_eq!(err, ConnectionError::Query("permission denied".to_string()));

        assert!(conn.query_all("SELECT 1", &[]).unwrap().is_empty());
        assert_eq!(conn.executed().len(), 3);
    }
}
