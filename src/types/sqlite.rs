//! SQLite type tokens
//!
//! SQLite accepts any declared type and assigns a storage affinity from
//! substrings of it. Common declared names are matched exactly first so that
//! dates, booleans and UUIDs keep their intent; everything else goes through
//! the affinity rules.

use super::CanonicalType;

pub(super) fn compile(token: &str) -> Option<CanonicalType> {
    let exact = match token {
        "boolean" | "bool" => Some(CanonicalType::Boolean),
        "date" => Some(CanonicalType::Date),
        "time" => Some(CanonicalType::Time),
        "datetime" | "timestamp" => Some(CanonicalType::NaiveDateTime),
        "timestamptz" => Some(CanonicalType::UtcDateTime),
        "uuid" | "guid" => Some(CanonicalType::Uuid),
        "json" | "jsonb" => Some(CanonicalType::Map),
        "decimal" | "numeric" => Some(CanonicalType::Decimal),
        // Untyped columns have BLOB affinity.
        "" | "blob" => Some(CanonicalType::Binary),
        _ => None,
    };
    exact.or_else(|| affinity(token))
}

/// SQLite's declared-type affinity rules, in their documented precedence
fn affinity(token: &str) -> Option<CanonicalType> {
    if token.contains("int") {
        Some(CanonicalType::Integer)
    } else if token.contains("char") || token.contains("clob") || token.contains("text") {
        Some(CanonicalType::String)
    } else if token.contains("blob") {
        Some(CanonicalType::Binary)
    } else if token.contains("real") || token.contains("floa") || token.contains("doub") {
        Some(CanonicalType::Float)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_rules() {
        assert_eq!(compile("integer"), Some(CanonicalType::Integer));
        assert_eq!(compile("unsigned big int"), Some(CanonicalType::Integer));
        assert_eq!(compile("varchar"), Some(CanonicalType::String));
        assert_eq!(compile("double precision"), Some(CanonicalType::Float));
        assert_eq!(compile(""), Some(CanonicalType::Binary));
    }

    #[test]
    fn test_declared_names_beat_affinity() {
        assert_eq!(compile("boolean"), Some(CanonicalType::Boolean));
        assert_eq!(compile("datetime"), Some(CanonicalType::NaiveDateTime));
        assert_eq!(compile("uuid"), Some(CanonicalType::Uuid));
        assert_eq!(compile("geometry"), None);
    }
}
