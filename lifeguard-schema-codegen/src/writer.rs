//! Code generation writer

use crate::entity::{field_ident, field_type, struct_name, RenderedEntity, RenderedField};
use crate::error::{CodegenError, Result};
use lifeguard_schema::{CanonicalType, DefaultValue, ForeignKey, ReferentialAction, Schema};
use std::collections::HashMap;

/// Fields maintained by `#[timestamps]`
pub const TIMESTAMP_FIELDS: [&str; 2] = ["inserted_at", "updated_at"];

/// Struct-level attribute names owned by the generator
///
/// Sync regeneration replaces these and keeps every other attribute.
pub const OWNED_ATTRIBUTES: [&str; 9] = [
    "derive",
    "table_name",
    "schema_name",
    "primary_key",
    "foreign_key_type",
    "timestamps",
    "index",
    "unique_index",
    "composite_foreign_key",
];

/// Derives every generated entity carries, in order
pub const GENERATED_DERIVES: [&str; 3] = ["Debug", "Clone", "LifeModel"];

pub const DERIVE: &str = "derive(Debug, Clone, LifeModel)";

/// The generated derive list followed by `extra`
pub fn derive_with(extra: &[String]) -> String {
    if extra.is_empty() {
        return DERIVE.to_string();
    }
    format!("derive({}, {})", GENERATED_DERIVES.join(", "), extra.join(", "))
}

#[derive(Debug, Default)]
pub struct EntityWriter;

impl EntityWriter {
    pub fn new() -> Self {
        Self
    }

    /// Render a schema into an entity definition
    pub fn render(&self, schema: &Schema) -> Result<RenderedEntity> {
        let table = schema.table_name();
        let timestamps = TIMESTAMP_FIELDS.iter().all(|name| schema.find_field(name).is_some());

        let mut attributes = vec![DERIVE.to_string(), format!("table_name = {}", quoted(table))];
        if let Some((namespace, _)) = schema.source.rsplit_once('.') {
            attributes.push(format!("schema_name = {}", quoted(namespace)));
        }
        if uses_guid_foreign_keys(schema) {
            attributes.push("foreign_key_type = \"uuid::Uuid\"".to_string());
        }
        if timestamps {
            attributes.push("timestamps".to_string());
        }
        for index in &schema.indices {
            let covered_by_field = index.unique && !index.is_composite();
            if covered_by_field || index.fields == schema.primary_key.fields {
                continue;
            }
            let kind = if index.unique { "unique_index" } else { "index" };
            let definition = format!("{}({})", index.name, index.fields.join(", "));
            attributes.push(format!("{kind} = {}", quoted(&definition)));
        }
        for fk in schema.foreign_keys.iter().filter(|fk| fk.is_composite()) {
            let definition = format!("({}) REFERENCES {}", fk.fields.join(", "), reference(fk));
            attributes.push(format!("composite_foreign_key = {}", quoted(&definition)));
        }

        let mut fields = Vec::new();
        let mut columns: HashMap<String, &str> = HashMap::new();
        for field in schema.fields() {
            if timestamps && TIMESTAMP_FIELDS.contains(&field.name.as_str()) {
                continue;
            }
            let ident = field_ident(&field.name)?;
            if let Some(previous) = columns.insert(ident.clone(), &field.name) {
                return Err(CodegenError::Generation(format!(
                    "columns `{previous}` and `{}` of {} both map to field `{ident}`",
                    field.name, schema.source
                )));
            }
            let mut attrs = Vec::new();
            if field.meta.primary_key {
                attrs.push("primary_key".to_string());
            }
            if ident != field.name {
                attrs.push(format!("column_name = {}", quoted(&field.name)));
            }
            if !field.meta.primary_key && schema.indices.unique_single_field(&field.name).is_some() {
                attrs.push("unique".to_string());
            }
            if let Some(fk) = schema.foreign_key_for(&field.name).filter(|fk| !fk.is_composite()) {
                attrs.push(format!("foreign_key = {}", quoted(&reference(fk))));
            }
            match &field.meta.default {
                Some(DefaultValue::AutoIncrement) => attrs.push("auto_increment".to_string()),
                Some(default) => attrs.push(default_attribute(default)),
                None => {}
            }
            if let CanonicalType::Enum(values) = &field.ty {
                if !field.meta.source_type.is_empty() {
                    attrs.push(format!("enum_name = {}", quoted(&field.meta.source_type)));
                }
                attrs.push(format!("enum_values = {}", quoted(&values.join(", "))));
            }
            fields.push(RenderedField {
                ident,
                ty: field_type(schema.adapter, field),
                attributes: attrs,
            });
        }

        log::debug!(
            "rendered {} with {} of {} fields",
            schema.source,
            fields.len(),
            schema.len()
        );
        Ok(RenderedEntity {
            name: struct_name(table),
            table_name: table.to_string(),
            attributes,
            fields,
        })
    }

    /// Complete source file for a freshly generated entity module
    pub fn render_file(&self, schema: &Schema) -> Result<String> {
        let entity = self.render(schema)?;
        Ok(format!(
            "//! `{}` entity, generated from the `{}` schema.\n\
             //!\n\
             //! Sync regeneration rewrites the `{}` struct and keeps the rest of this file.\n\
             \n\
             use lifeguard_derive::LifeModel;\n\
             \n\
             {}\n",
            entity.name,
            schema.source,
            entity.name,
            entity.struct_source("")
        ))
    }
}

fn uses_guid_foreign_keys(schema: &Schema) -> bool {
    schema
        .fields()
        .any(|f| f.meta.foreign_key && f.ty == CanonicalType::Guid)
}

/// `table(col, ..) ON DELETE .. ON UPDATE ..`, omitting `NO ACTION` clauses
fn reference(fk: &ForeignKey) -> String {
    let mut definition = fk.references_table.clone();
    if !fk.references_fields.is_empty() {
        definition.push_str(&format!("({})", fk.references_fields.join(", ")));
    }
    if fk.on_delete != ReferentialAction::NoAction {
        definition.push_str(&format!(" ON DELETE {}", fk.on_delete.as_sql()));
    }
    if fk.on_update != ReferentialAction::NoAction {
        definition.push_str(&format!(" ON UPDATE {}", fk.on_update.as_sql()));
    }
    definition
}

/// `default_value` carries SQL literals, `default_expr` carries expressions
fn default_attribute(default: &DefaultValue) -> String {
    let (name, sql) = match default {
        DefaultValue::CurrentTimestamp => ("default_expr", "CURRENT_TIMESTAMP".to_string()),
        DefaultValue::CurrentDate => ("default_expr", "CURRENT_DATE".to_string()),
        DefaultValue::CurrentTime => ("default_expr", "CURRENT_TIME".to_string()),
        DefaultValue::Expression(expr) => ("default_expr", expr.clone()),
        DefaultValue::String(s) => ("default_value", format!("'{}'", s.replace('\'', "''"))),
        DefaultValue::Integer(n) => ("default_value", n.to_string()),
        DefaultValue::Decimal(d) => ("default_value", d.to_string()),
        DefaultValue::Boolean(b) => ("default_value", b.to_string()),
        DefaultValue::AutoIncrement => ("auto_increment", String::new()),
    };
    if sql.is_empty() {
        name.to_string()
    } else {
        format!("{name} = {}", quoted(&sql))
    }
}

/// Rust string literal
fn quoted(text: &str) -> String {
    format!("{text:?}")
}
