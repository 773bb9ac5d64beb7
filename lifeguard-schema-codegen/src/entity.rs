//! Rendered entity structures

use crate::error::{CodegenError, Result};
use lifeguard_schema::{AdapterKind, CanonicalType, Field};
use syn::{Ident, ItemStruct};

/// Entity definition rendered from a [`lifeguard_schema::Schema`]
///
/// Attributes are stored as the text between `#[` and `]`, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntity {
    pub name: String,
    pub table_name: String,
    pub attributes: Vec<String>,
    pub fields: Vec<RenderedField>,
}

/// Field declaration within a rendered entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedField {
    pub ident: String,
    pub ty: String,
    pub attributes: Vec<String>,
}

impl RenderedEntity {
    /// Source text of the struct, from the first attribute to the closing brace
    ///
    /// Every line after the first is prefixed with `indent`.
    pub fn struct_source(&self, indent: &str) -> String {
        let mut lines: Vec<String> = self
            .attributes
            .iter()
            .map(|attr| format!("#[{attr}]"))
            .collect();

        if self.fields.is_empty() {
            lines.push(format!("pub struct {} {{}}", self.name));
        } else {
            lines.push(format!("pub struct {} {{", self.name));
            for field in &self.fields {
                for attr in &field.attributes {
                    lines.push(format!("    #[{attr}]"));
                }
                lines.push(format!("    pub {}: {},", field.ident, field.ty));
            }
            lines.push("}".to_string());
        }

        let separator = format!("\n{indent}");
        lines.join(&separator)
    }

    /// Parse the rendered struct back into a `syn` item
    pub fn to_item(&self) -> Result<ItemStruct> {
        syn::parse_str::<ItemStruct>(&self.struct_source("")).map_err(|err| {
            CodegenError::Generation(format!("rendered `{}` is not valid Rust: {err}", self.name))
        })
    }

    pub fn field(&self, ident: &str) -> Option<&RenderedField> {
        self.fields.iter().find(|f| f.ident == ident)
    }

    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.iter().any(|a| a == attr)
    }
}

impl RenderedField {
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.iter().any(|a| a == attr)
    }
}

/// Struct name for a table: last path segment, singularised, PascalCase
pub fn struct_name(table: &str) -> String {
    let base = table.rsplit('.').next().unwrap_or(table);
    let pascal = to_pascal_case(&singularize(base));
    if pascal.starts_with(|c: char| c.is_ascii_digit()) {
        format!("T{pascal}")
    } else if pascal.is_empty() {
        "Entity".to_string()
    } else {
        pascal
    }
}

/// Convert snake_case to PascalCase
pub fn to_pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// English plural to singular for the common table-name shapes
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if let Some(stem) = word.strip_suffix("ies").filter(|_| lower.len() > 3) {
        return format!("{stem}y");
    }
    for suffix in ["sses", "xes", "ches", "shes", "zes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Rust identifier for a column name
///
/// Invalid characters become `_`, keywords become raw identifiers and the
/// path keywords that cannot be raw (`self`, `super`, `crate`, `Self`) get a
/// trailing underscore.
pub fn field_ident(column: &str) -> Result<String> {
    let mut ident: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if ident.is_empty() || ident.chars().all(|c| c == '_') {
        ident = format!("field{ident}");
    }

    if syn::parse_str::<Ident>(&ident).is_ok() {
        return Ok(ident);
    }
    if matches!(ident.as_str(), "self" | "super" | "crate" | "Self") {
        return Ok(format!("{ident}_"));
    }
    let raw = format!("r#{ident}");
    if syn::parse_str::<Ident>(&raw).is_ok() {
        return Ok(raw);
    }
    Err(CodegenError::Generation(format!(
        "column `{column}` has no valid Rust identifier"
    )))
}

/// Rust type for a field, wrapped in `Option` when nullable
pub fn field_type(adapter: AdapterKind, field: &Field) -> String {
    let inner = rust_type(adapter, &field.ty, &field.meta.source_type);
    if field.meta.nullable && !field.meta.primary_key {
        format!("Option<{inner}>")
    } else {
        inner
    }
}

/// Rust type for a canonical type
///
/// `source_type` narrows integer and float widths on Postgres; SQLite storage
/// classes are always 64-bit.
pub fn rust_type(adapter: AdapterKind, ty: &CanonicalType, source_type: &str) -> String {
    match ty {
        CanonicalType::Identity | CanonicalType::Integer => integer_type(adapter, source_type).to_string(),
        CanonicalType::Guid | CanonicalType::Uuid => "uuid::Uuid".to_string(),
        CanonicalType::Float => match (adapter, source_type.to_ascii_lowercase().as_str()) {
            (AdapterKind::Postgres, "float4" | "real") => "f32".to_string(),
            _ => "f64".to_string(),
        },
        CanonicalType::Decimal => "rust_decimal::Decimal".to_string(),
        CanonicalType::Boolean => "bool".to_string(),
        CanonicalType::String | CanonicalType::Enum(_) => "String".to_string(),
        CanonicalType::Binary => "Vec<u8>".to_string(),
        CanonicalType::Date => "chrono::NaiveDate".to_string(),
        CanonicalType::Time => "chrono::NaiveTime".to_string(),
        CanonicalType::NaiveDateTime => "chrono::NaiveDateTime".to_string(),
        CanonicalType::UtcDateTime => "chrono::DateTime<chrono::Utc>".to_string(),
        CanonicalType::Map => "serde_json::Value".to_string(),
        CanonicalType::Array(inner) => {
            let element = source_type.strip_suffix("[]").unwrap_or(source_type);
            format!("Vec<{}>", rust_type(adapter, inner, element))
        }
    }
}

fn integer_type(adapter: AdapterKind, source_type: &str) -> &'static str {
    if adapter == AdapterKind::Sqlite {
        return "i64";
    }
    match source_type.to_ascii_lowercase().as_str() {
        "int2" | "smallint" | "smallserial" => "i16",
        "int4" | "int" | "integer" | "serial" => "i32",
        _ => "i64",
    }
}
