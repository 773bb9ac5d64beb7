//! Postgres type tokens
//!
//! Tokens arrive lowercased with modifiers stripped, so both `udt_name`
//! spellings (`int4`, `varchar`) and `data_type` spellings (`integer`,
//! `character varying`) are accepted.

use super::CanonicalType;

pub(super) fn compile(token: &str) -> Option<CanonicalType> {
    let ty = match token {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "int" | "bigint" | "smallserial"
        | "serial" | "bigserial" | "serial2" | "serial4" | "serial8" | "oid" => {
            CanonicalType::Integer
        }
        "float4" | "float8" | "real" | "double precision" | "float" => CanonicalType::Float,
        "numeric" | "decimal" | "money" => CanonicalType::Decimal,
        "bool" | "boolean" => CanonicalType::Boolean,
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "name"
        | "citext" | "inet" | "cidr" | "macaddr" | "xml" => CanonicalType::String,
        "bytea" => CanonicalType::Binary,
        "date" => CanonicalType::Date,
        "time" | "timetz" | "time without time zone" | "time with time zone" => {
            CanonicalType::Time
        }
        "timestamp" | "timestamp without time zone" => CanonicalType::NaiveDateTime,
        "timestamptz" | "timestamp with time zone" => CanonicalType::UtcDateTime,
        "json" | "jsonb" => CanonicalType::Map,
        "uuid" => CanonicalType::Uuid,
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udt_and_data_type_spellings_agree() {
        assert_eq!(compile("int4"), compile("integer"));
        assert_eq!(compile("varchar"), compile("character varying"));
        assert_eq!(compile("timestamptz"), compile("timestamp with time zone"));
    }

    #[test]
    fn test_known_tokens() {
        assert_eq!(compile("jsonb"), Some(CanonicalType::Map));
        assert_eq!(compile("uuid"), Some(CanonicalType::Uuid));
        assert_eq!(compile("bigserial"), Some(CanonicalType::Integer));
        assert_eq!(compile("timestamp"), Some(CanonicalType::NaiveDateTime));
        assert_eq!(compile("point"), None);
    }
}
