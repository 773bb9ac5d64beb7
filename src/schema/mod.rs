//! Canonical schema model
//!
//! A [`Schema`] is the adapter-independent description of one table: ordered,
//! uniquely named fields with canonical types, plus primary key, foreign keys
//! and indices referencing those fields by name.

mod algebra;
mod compile;

pub use algebra::FieldOverride;

use crate::introspect::{AdapterKind, ReferentialAction};
use crate::types::{CanonicalType, DefaultValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field metadata carried over from introspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check_constraints: Vec<String>,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub index: bool,
    pub index_name: Option<String>,
    /// Raw type as the database reported it
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: CanonicalType,
    pub meta: FieldMeta,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: CanonicalType) -> Self {
        Self {
            name: name.into(),
            ty,
            meta: FieldMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: FieldMeta) -> Self {
        self.meta = meta;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub fields: Vec<String>,
}

impl PrimaryKey {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn includes_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub fields: Vec<String>,
    pub references_table: String,
    /// Empty when the key references the parent's primary key implicitly
    pub references_fields: Vec<String>,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

impl ForeignKey {
    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn includes_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Index {
    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn includes_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

/// Ordered set of indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Indices(Vec<Index>);

impl Indices {
    pub fn new(indices: Vec<Index>) -> Self {
        Self(indices)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Index> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, index: Index) {
        self.0.push(index);
    }

    pub fn find(&self, name: &str) -> Option<&Index> {
        self.0.iter().find(|ix| ix.name == name)
    }

    /// Unique index covering exactly `field`
    pub fn unique_single_field(&self, field: &str) -> Option<&Index> {
        self.0
            .iter()
            .find(|ix| ix.unique && ix.fields.len() == 1 && ix.fields[0] == field)
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&Index) -> bool) {
        self.0.retain(f);
    }
}

impl<'a> IntoIterator for &'a Indices {
    type Item = &'a Index;
    type IntoIter = std::slice::Iter<'a, Index>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Canonical description of one table
///
/// Field order is significant: it is the introspection order, and equality
/// compares fields in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Source table, `schema.table` outside the engine's default namespace
    pub source: String,
    pub adapter: AdapterKind,
    pub primary_key: PrimaryKey,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(with = "field_list")]
    fields: IndexMap<String, Field>,
    #[serde(default)]
    pub indices: Indices,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.adapter == other.adapter
            && self.primary_key == other.primary_key
            && self.foreign_keys == other.foreign_keys
            && self.indices == other.indices
            && self.fields.len() == other.fields.len()
            && self.fields.values().eq(other.fields.values())
    }
}

impl Eq for Schema {}

impl Schema {
    pub fn new(source: impl Into<String>, adapter: AdapterKind) -> Self {
        Self {
            source: source.into(),
            adapter,
            primary_key: PrimaryKey::default(),
            foreign_keys: Vec::new(),
            fields: IndexMap::new(),
            indices: Indices::default(),
        }
    }

    /// Append a field, or replace the same-named one in place
    pub fn with_field(mut self, field: Field) -> Self {
        self.insert_field(field);
        self
    }

    pub fn with_primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    pub fn insert_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    /// The one lookup by field name
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn composite_primary_key(&self) -> bool {
        self.primary_key.is_composite()
    }

    /// Fields marked primary in their metadata, in field order
    pub fn primary_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().filter(|f| f.meta.primary_key)
    }

    /// The foreign key whose source columns include `field`
    pub fn foreign_key_for(&self, field: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.includes_field(field))
    }

    /// Table name without namespace
    pub fn table_name(&self) -> &str {
        self.source.rsplit('.').next().unwrap_or(&self.source)
    }
}

/// Serialise fields as an ordered list, rejecting duplicate names on read
mod field_list {
    use super::Field;
    use indexmap::IndexMap;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(fields: &IndexMap<String, Field>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(fields.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<IndexMap<String, Field>, D::Error> {
        let list = Vec::<Field>::deserialize(deserializer)?;
        let mut fields = IndexMap::with_capacity(list.len());
        for field in list {
            let name = field.name.clone();
            if fields.insert(name.clone(), field).is_some() {
                return Err(D::Error::custom(format!("duplicate field '{}'", name)));
            }
        }
        Ok(fields)
    }
}
