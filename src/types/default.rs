//! Default-value classifier
//!
//! Layers run in order on the trimmed default; the first match wins:
//!
//! 1. `NULL` → no default
//! 2. now/current-timestamp shapes → timestamp, date or time sentinel
//! 3. sequence, identity or autoincrement syntax → [`DefaultValue::AutoIncrement`]
//! 4. quoted literal → unquoted string
//! 5. bare integer or decimal → number
//! 6. `true` / `false` → boolean
//! 7. anything else → [`DefaultValue::Expression`]
//!
//! Casts (`'x'::text`, `NULL::character varying`) and parentheses wrapping the
//! whole expression are peeled off before the layers run.

use super::DefaultValue;
use crate::introspect::AdapterKind;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

static CAST_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[A-Za-z_][\w\s"\.]*(\(\s*\d+(\s*,\s*\d+)?\s*\))?(\[\])*$"#).unwrap());

static PG_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(now\(\)|current_timestamp(\(\d*\))?|localtimestamp(\(\d*\))?|transaction_timestamp\(\)|statement_timestamp\(\)|clock_timestamp\(\)|timezone\('utc'(::text)?,\s*now\(\)\)|now\(\)\s+at\s+time\s+zone\s+'utc')$",
    )
    .unwrap()
});
static PG_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^current_date$").unwrap());
static PG_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(current_time|localtime)(\(\d*\))?$").unwrap());

static SQLITE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(current_timestamp|datetime\('now'(\s*,\s*'[^']*')*\)|strftime\('[^']*',\s*'now'\))$")
        .unwrap()
});
static SQLITE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(current_date|date\('now'(\s*,\s*'[^']*')*\))$").unwrap());
static SQLITE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(current_time|time\('now'(\s*,\s*'[^']*')*\))$").unwrap());

static AUTO_INCREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(nextval\(.+\)|generated\s+(always|by\s+default)\s+as\s+identity.*|autoincrement|auto_increment)$")
        .unwrap()
});

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^'((?:[^']|'')*)'$").unwrap());
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d+$").unwrap());
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d*\.\d+$").unwrap());

/// Classify a raw default expression
///
/// `None` means "no default": either the column has none or the default is an
/// explicit `NULL`.
pub fn compile_default(adapter: AdapterKind, raw: &str) -> Option<DefaultValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let core = peel(trimmed);

    if core.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Some(sentinel) = timestamp_sentinel(adapter, core) {
        return Some(sentinel);
    }

    if AUTO_INCREMENT.is_match(core) {
        return Some(DefaultValue::AutoIncrement);
    }

    if let Some(caps) = QUOTED.captures(core) {
        return Some(DefaultValue::String(caps[1].replace("''", "'")));
    }

    if INTEGER.is_match(core) {
        return Some(match core.parse::<i64>() {
            Ok(n) => DefaultValue::Integer(n),
            Err(_) => match Decimal::from_str(core) {
                Ok(d) => DefaultValue::Decimal(d),
                Err(_) => DefaultValue::Expression(trimmed.to_string()),
            },
        });
    }

    if DECIMAL.is_match(core) {
        if let Ok(d) = Decimal::from_str(core) {
            return Some(DefaultValue::Decimal(d));
        }
    }

    if core.eq_ignore_ascii_case("true") {
        return Some(DefaultValue::Boolean(true));
    }
    if core.eq_ignore_ascii_case("false") {
        return Some(DefaultValue::Boolean(false));
    }

    Some(DefaultValue::Expression(trimmed.to_string()))
}

fn timestamp_sentinel(adapter: AdapterKind, core: &str) -> Option<DefaultValue> {
    let (timestamp, date, time) = match adapter {
        AdapterKind::Postgres => (&*PG_TIMESTAMP, &*PG_DATE, &*PG_TIME),
        AdapterKind::Sqlite => (&*SQLITE_TIMESTAMP, &*SQLITE_DATE, &*SQLITE_TIME),
    };

    if timestamp.is_match(core) {
        Some(DefaultValue::CurrentTimestamp)
    } else if date.is_match(core) {
        Some(DefaultValue::CurrentDate)
    } else if time.is_match(core) {
        Some(DefaultValue::CurrentTime)
    } else {
        None
    }
}

/// Strip wrapping parentheses and trailing casts until neither applies
fn peel(mut s: &str) -> &str {
    loop {
        let next = strip_cast(strip_parens(s)).trim();
        if next == s {
            return s;
        }
        s = next;
    }
}

/// `(expr)` → `expr` when the outer pair encloses the whole string
fn strip_parens(s: &str) -> &str {
    if !(s.starts_with('(') && s.ends_with(')')) {
        return s;
    }

    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != s.len() - 1 {
                    // `(a) + (b)`: the first paren closes early.
                    return s;
                }
            }
            _ => {}
        }
    }
    s[1..s.len() - 1].trim()
}

/// `expr::type` → `expr`, ignoring `::` inside quotes
fn strip_cast(s: &str) -> &str {
    let mut in_quote = false;
    let mut depth = 0usize;
    let mut last_cast = None;
    let bytes = s.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth = depth.saturating_sub(1),
            b':' if !in_quote && depth == 0 && i > 0 && bytes[i - 1] == b':' => {
                last_cast = Some(i - 1);
            }
            _ => {}
        }
    }

    match last_cast {
        Some(pos) if pos > 0 && CAST_SUFFIX.is_match(s[pos + 2..].trim()) => s[..pos].trim_end(),
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg(raw: &str) -> Option<DefaultValue> {
        compile_default(AdapterKind::Postgres, raw)
    }

    fn lite(raw: &str) -> Option<DefaultValue> {
        compile_default(AdapterKind::Sqlite, raw)
    }

    #[test]
    fn test_null_defaults() {
        assert_eq!(pg("NULL"), None);
        assert_eq!(pg("NULL::character varying"), None);
        assert_eq!(lite("null"), None);
        assert_eq!(pg("   "), None);
    }

    #[test]
    fn test_timestamp_sentinels() {
        assert_eq!(pg("now()"), Some(DefaultValue::CurrentTimestamp));
        assert_eq!(pg("CURRENT_TIMESTAMP"), Some(DefaultValue::CurrentTimestamp));
        assert_eq!(pg("timezone('utc'::text, now())"), Some(DefaultValue::CurrentTimestamp));
        assert_eq!(pg("CURRENT_DATE"), Some(DefaultValue::CurrentDate));
        assert_eq!(pg("CURRENT_TIME(0)"), Some(DefaultValue::CurrentTime));
        assert_eq!(lite("CURRENT_TIMESTAMP"), Some(DefaultValue::CurrentTimestamp));
        assert_eq!(lite("(datetime('now'))"), Some(DefaultValue::CurrentTimestamp));
        assert_eq!(lite("date('now')"), Some(DefaultValue::CurrentDate));
    }

    #[test]
    fn test_generated_values() {
        assert_eq!(
            pg("nextval('users_id_seq'::regclass)"),
            Some(DefaultValue::AutoIncrement)
        );
        assert_eq!(
            pg("GENERATED BY DEFAULT AS IDENTITY"),
            Some(DefaultValue::AutoIncrement)
        );
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(pg("'USD'::bpchar"), Some(DefaultValue::String("USD".to_string())));
        assert_eq!(
            pg("'it''s'::character varying"),
            Some(DefaultValue::String("it's".to_string()))
        );
        assert_eq!(pg("'{}'::jsonb"), Some(DefaultValue::String("{}".to_string())));
        assert_eq!(lite("'draft'"), Some(DefaultValue::String("draft".to_string())));
        assert_eq!(pg("'a::b'"), Some(DefaultValue::String("a::b".to_string())));
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(pg("0"), Some(DefaultValue::Integer(0)));
        assert_eq!(pg("(-1)"), Some(DefaultValue::Integer(-1)));
        assert_eq!(
            pg("0.00"),
            Some(DefaultValue::Decimal(Decimal::from_str("0.00").unwrap()))
        );
        assert_eq!(
            pg("99999999999999999999"),
            Some(DefaultValue::Decimal(Decimal::from_str("99999999999999999999").unwrap()))
        );
    }

    #[test]
    fn test_boolean_literals() {
        assert_eq!(pg("true"), Some(DefaultValue::Boolean(true)));
        assert_eq!(lite("FALSE"), Some(DefaultValue::Boolean(false)));
    }

    #[test]
    fn test_unknown_expression_kept_verbatim() {
        assert_eq!(
            pg(" gen_random_uuid() "),
            Some(DefaultValue::Expression("gen_random_uuid()".to_string()))
        );
        assert_eq!(
            pg("(a) + (b)"),
            Some(DefaultValue::Expression("(a) + (b)".to_string()))
        );
    }
}
