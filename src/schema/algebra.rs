//! Merge, projection and field overrides

use super::{Field, FieldMeta, Schema};
use crate::error::SchemaError;
use crate::types::{CanonicalType, DefaultValue};

impl Schema {
    /// Overlay `overlay` on top of `self`
    ///
    /// Same-named fields are replaced in place, new fields are appended in
    /// overlay order. The overlay's primary key, foreign keys and indices
    /// replace the base's when non-empty.
    pub fn merge(&self, overlay: &Schema) -> Schema {
        let mut merged = self.clone();

        for field in overlay.fields() {
            merged.insert_field(field.clone());
        }

        if !overlay.primary_key.is_empty() {
            merged.primary_key = overlay.primary_key.clone();
        }
        if !overlay.foreign_keys.is_empty() {
            merged.foreign_keys = overlay.foreign_keys.clone();
        }
        if !overlay.indices.is_empty() {
            merged.indices = overlay.indices.clone();
        }

        merged
    }

    /// Keep only `names`, in source order
    ///
    /// Primary-key fields outside the projection leave the key. Foreign keys
    /// and indices touching a dropped field are dropped whole.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownField` for the first requested name the
    /// schema does not have.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Schema, SchemaError> {
        let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        if let Some(missing) = names.iter().find(|n| self.find_field(n).is_none()) {
            return Err(SchemaError::UnknownField {
                schema: self.source.clone(),
                field: missing.to_string(),
            });
        }
        let keep = |field: &str| names.contains(&field);

        let mut projected = Schema::new(self.source.clone(), self.adapter);
        for field in self.fields().filter(|f| keep(f.name.as_str())) {
            projected.insert_field(field.clone());
        }

        projected.primary_key.fields = self
            .primary_key
            .fields
            .iter()
            .filter(|f| keep(f.as_str()))
            .cloned()
            .collect();
        projected.foreign_keys = self
            .foreign_keys
            .iter()
            .filter(|fk| fk.fields.iter().all(|f| keep(f.as_str())))
            .cloned()
            .collect();
        projected.indices = self.indices.clone();
        projected.indices.retain(|ix| ix.fields.iter().all(|f| keep(f.as_str())));

        Ok(projected)
    }

    /// Projection published under another source name
    pub fn view<S: AsRef<str>>(&self, name: &str, fields: &[S]) -> Result<Schema, SchemaError> {
        let mut view = self.project(fields)?;
        view.source = name.to_string();
        Ok(view)
    }

    /// Apply caller-declared field customisations over an inferred schema
    ///
    /// An override for an existing field patches only what it sets. An
    /// override for a new field needs a type and is appended.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownField` when an override names a field the
    /// schema does not have and carries no type to create it with.
    pub fn apply_overrides(&self, overrides: &[FieldOverride]) -> Result<Schema, SchemaError> {
        let mut overlay = Schema::new(self.source.clone(), self.adapter);

        for o in overrides {
            let base = match (self.find_field(&o.name), &o.ty) {
                (Some(existing), _) => existing.clone(),
                (None, Some(ty)) => Field::new(o.name.clone(), ty.clone()).with_meta(FieldMeta {
                    nullable: true,
                    ..FieldMeta::default()
                }),
                (None, None) => {
                    return Err(SchemaError::UnknownField {
                        schema: self.source.clone(),
                        field: o.name.clone(),
                    })
                }
            };
            overlay.insert_field(o.apply(base));
        }

        Ok(self.merge(&overlay))
    }
}

/// Custom replacement for one inferred field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOverride {
    pub name: String,
    pub ty: Option<CanonicalType>,
    pub nullable: Option<bool>,
    /// `Some(None)` removes the inferred default
    pub default: Option<Option<DefaultValue>>,
}

impl FieldOverride {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            nullable: None,
            default: None,
        }
    }

    pub fn with_type(mut self, ty: CanonicalType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_default(mut self, default: Option<DefaultValue>) -> Self {
        self.default = Some(default);
        self
    }

    fn apply(&self, mut field: Field) -> Field {
        if let Some(ty) = &self.ty {
            field.ty = ty.clone();
        }
        if let Some(nullable) = self.nullable {
            field.meta.nullable = nullable;
        }
        if let Some(default) = &self.default {
            field.meta.default = default.clone();
        }
        field
    }
}
