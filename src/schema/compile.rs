//! `Table` → `Schema`

use super::{Field, FieldMeta, ForeignKey, Index, Indices, PrimaryKey, Schema};
use crate::introspect::{AdapterKind, Table};
use crate::types::compile_column;

impl Schema {
    /// Compile an introspected table
    ///
    /// Pure; compiling the same table twice yields equal schemas.
    pub fn from_table(table: &Table) -> Schema {
        let mut schema = Schema::new(source_name(table), table.adapter);

        for column in &table.columns {
            let (ty, default) = compile_column(table.adapter, column);
            schema.insert_field(Field {
                name: column.name.clone(),
                ty,
                meta: FieldMeta {
                    nullable: column.meta.nullable,
                    default,
                    check_constraints: column.meta.check_constraints.clone(),
                    primary_key: column.meta.primary_key,
                    foreign_key: column.meta.foreign_key,
                    index: column.meta.index,
                    index_name: column.meta.index_name.clone(),
                    source_type: column.raw_type.clone(),
                },
            });
        }

        schema.primary_key = PrimaryKey::new(table.primary_key.columns.iter().cloned());

        schema.foreign_keys = table
            .foreign_keys
            .iter()
            .map(|fk| ForeignKey {
                name: fk.name.clone(),
                fields: fk.columns.clone(),
                references_table: fk.referenced_table.clone(),
                references_fields: fk.referenced_columns.clone(),
                on_delete: fk.on_delete,
                on_update: fk.on_update,
            })
            .collect();

        schema.indices = Indices::new(
            table
                .indices
                .iter()
                .map(|ix| Index {
                    name: ix.name.clone(),
                    fields: ix.columns.clone(),
                    unique: ix.unique,
                    kind: ix.kind.clone(),
                })
                .collect(),
        );

        schema
    }
}

/// Table name, qualified only outside the engine's default namespace
fn source_name(table: &Table) -> String {
    let default_namespace = match table.adapter {
        AdapterKind::Postgres => "public",
        AdapterKind::Sqlite => "main",
    };
    match table.schema.as_deref() {
        Some(schema) if schema != default_namespace => format!("{}.{}", schema, table.name),
        _ => table.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{Column, ColumnMeta, RawForeignKey, RawIndex, RawPrimaryKey, ReferentialAction};
    use crate::types::{CanonicalType, DefaultValue};

    fn posts() -> Table {
        let col = |name: &str, raw: &str, meta: ColumnMeta| Column {
            name: name.to_string(),
            raw_type: raw.to_string(),
            meta,
        };
        Table {
            name: "posts".to_string(),
            schema: Some("public".to_string()),
            adapter: AdapterKind::Postgres,
            columns: vec![
                col(
                    "id",
                    "int8",
                    ColumnMeta {
                        primary_key: true,
                        default: Some("nextval('posts_id_seq'::regclass)".to_string()),
                        ..ColumnMeta::default()
                    },
                ),
                col(
                    "author_id",
                    "uuid",
                    ColumnMeta {
                        foreign_key: true,
                        index: true,
                        index_name: Some("idx_posts_author".to_string()),
                        ..ColumnMeta::default()
                    },
                ),
                col(
                    "tags",
                    "text[]",
                    ColumnMeta {
                        nullable: true,
                        ..ColumnMeta::default()
                    },
                ),
            ],
            primary_key: RawPrimaryKey {
                columns: vec!["id".to_string()],
            },
            foreign_keys: vec![RawForeignKey {
                name: Some("posts_author_id_fkey".to_string()),
                columns: vec!["author_id".to_string()],
                referenced_table: "authors".to_string(),
                referenced_columns: vec!["id".to_string()],
                on_delete: ReferentialAction::Cascade,
                on_update: ReferentialAction::NoAction,
            }],
            indices: vec![RawIndex {
                name: "idx_posts_author".to_string(),
                columns: vec!["author_id".to_string()],
                unique: false,
                kind: Some("btree".to_string()),
            }],
        }
    }

    #[test]
    fn test_from_table() {
        let schema = Schema::from_table(&posts());

        assert_eq!(schema.source, "posts");
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["id", "author_id", "tags"]);

        let id = schema.find_field("id").unwrap();
        assert_eq!(id.ty, CanonicalType::Identity);
        assert_eq!(id.meta.default, Some(DefaultValue::AutoIncrement));
        assert_eq!(id.meta.source_type, "int8");

        assert_eq!(schema.find_field("author_id").unwrap().ty, CanonicalType::Guid);
        assert_eq!(
            schema.find_field("tags").unwrap().ty,
            CanonicalType::array_of(CanonicalType::String)
        );
        assert_eq!(schema.foreign_keys[0].on_delete, ReferentialAction::Cascade);
        assert_eq!(schema.indices.len(), 1);
    }

    #[test]
    fn test_from_table_is_idempotent() {
        let table = posts();
        assert_eq!(Schema::from_table(&table), Schema::from_table(&table));
    }

    #[test]
    fn test_non_default_namespace_qualifies_source() {
        let mut table = posts();
        table.schema = Some("blog".to_string());
        assert_eq!(Schema::from_table(&table).source, "blog.posts");
    }
}
