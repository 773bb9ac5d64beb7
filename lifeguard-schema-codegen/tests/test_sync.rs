//! Tests for sync regeneration of existing entity files

use lifeguard_schema::introspect::AdapterKind;
use lifeguard_schema::{CanonicalType, DefaultValue, Field, FieldMeta, Index, PrimaryKey, Schema};
use lifeguard_schema_codegen::{
    generate_source, locate, write_entity, CodegenError, EntityWriter, RenderMode, WriteOutcome,
};
use std::fs;
use tempfile::TempDir;

fn users(with_name: bool) -> Schema {
    let mut schema = Schema::new("users", AdapterKind::Postgres)
        .with_field(Field::new("id", CanonicalType::Identity).with_meta(FieldMeta {
            primary_key: true,
            default: Some(DefaultValue::AutoIncrement),
            source_type: "int4".to_string(),
            ..FieldMeta::default()
        }))
        .with_field(Field::new("email", CanonicalType::String).with_meta(FieldMeta {
            source_type: "text".to_string(),
            ..FieldMeta::default()
        }))
        .with_primary_key(PrimaryKey::new(["id"]))
        .with_index(Index {
            name: "users_email_key".to_string(),
            fields: vec!["email".to_string()],
            unique: true,
            kind: Some("btree".to_string()),
        });
    if with_name {
        schema.insert_field(Field::new("name", CanonicalType::String).with_meta(FieldMeta {
            nullable: true,
            ..FieldMeta::default()
        }));
    }
    schema
}

const EXISTING: &str = r#"//! Users, with a hand-written helper.

use lifeguard_derive::LifeModel;

/// A registered user.
#[derive(Debug, Clone, LifeModel)]
#[table_name = "users"]
pub struct User {
    #[primary_key]
    #[auto_increment]
    pub id: i32,
    #[unique]
    pub email: String,
}

impl User {
    // Keep this comment exactly as written.
    pub fn domain(&self) -> &str {
        self.email.split('@').nth(1).unwrap_or("")
    }
}
"#;

fn sync(existing: &str, schema: &Schema) -> String {
    generate_source(schema, RenderMode::Sync, Some(existing)).unwrap()
}

#[test]
fn test_sync_without_changes_is_a_no_op() {
    assert_eq!(sync(EXISTING, &users(false)), EXISTING);
}

#[test]
fn test_sync_rewrites_only_the_struct() {
    let out = sync(EXISTING, &users(true));
    let expected = EXISTING.replacen(
        "    pub email: String,\n",
        "    pub email: String,\n    pub name: Option<String>,\n",
        1,
    );
    assert_eq!(out, expected);

    let region = locate(EXISTING, "users").unwrap();
    assert!(out.starts_with(&EXISTING[..region.start]));
    assert!(out.ends_with(&EXISTING[region.end..]));
    assert!(EXISTING[..region.start].ends_with("/// A registered user.\n"));
    assert!(EXISTING[region.end..].starts_with("\n\nimpl User {"));

    // Second pass with the same schema is byte-identical.
    assert_eq!(sync(&out, &users(true)), out);
}

#[test]
fn test_region_matches_rendered_struct() {
    let region = locate(EXISTING, "users").unwrap();
    let entity = EntityWriter::new().render(&users(false)).unwrap();
    assert_eq!(&EXISTING[region.start..region.end], entity.struct_source(""));
}

#[test]
fn test_unowned_attributes_are_kept() {
    let existing = concat!(
        "use lifeguard_derive::LifeModel;\n",
        "\n",
        "#[derive(Debug, Clone, LifeModel)]\n",
        "#[allow(dead_code)]\n",
        "#[table_name = \"users\"]\n",
        "pub struct User {\n",
        "    pub legacy: i32,\n",
        "}\n",
    );
    let out = sync(existing, &users(false));
    assert_eq!(
        out,
        concat!(
            "use lifeguard_derive::LifeModel;\n",
            "\n",
            "#[derive(Debug, Clone, LifeModel)]\n",
            "#[table_name = \"users\"]\n",
            "#[allow(dead_code)]\n",
            "pub struct User {\n",
            "    #[primary_key]\n",
            "    #[auto_increment]\n",
            "    pub id: i32,\n",
            "    #[unique]\n",
            "    pub email: String,\n",
            "}\n",
        )
    );
    assert_eq!(sync(&out, &users(false)), out);
}

#[test]
fn test_hand_added_derives_are_kept() {
    let existing = concat!(
        "use lifeguard_derive::LifeModel;\n",
        "\n",
        "#[derive(Debug, Clone, PartialEq, serde::Serialize, LifeModel)]\n",
        "#[table_name = \"users\"]\n",
        "pub struct User {}\n",
    );
    let out = sync(existing, &users(false));
    assert_eq!(
        out,
        concat!(
            "use lifeguard_derive::LifeModel;\n",
            "\n",
            "#[derive(Debug, Clone, LifeModel, PartialEq, serde::Serialize)]\n",
            "#[table_name = \"users\"]\n",
            "pub struct User {\n",
            "    #[primary_key]\n",
            "    #[auto_increment]\n",
            "    pub id: i32,\n",
            "    #[unique]\n",
            "    pub email: String,\n",
            "}\n",
        )
    );
    assert_eq!(sync(&out, &users(false)), out);
}

#[test]
fn test_legacy_struct_level_primary_key_is_replaced() {
    let existing = EXISTING.replacen("#[table_name = \"users\"]\n", "#[table_name = \"users\"]\n#[primary_key(id)]\n", 1);
    assert_eq!(sync(&existing, &users(false)), EXISTING);
}

#[test]
fn test_struct_inside_module_keeps_indentation() {
    let existing = concat!(
        "pub mod entities {\n",
        "    use lifeguard_derive::LifeModel;\n",
        "\n",
        "    #[derive(Debug, Clone, LifeModel)]\n",
        "    #[table_name = \"users\"]\n",
        "    pub struct User {}\n",
        "}\n",
    );
    let out = sync(existing, &users(false));
    assert_eq!(
        out,
        concat!(
            "pub mod entities {\n",
            "    use lifeguard_derive::LifeModel;\n",
            "\n",
            "    #[derive(Debug, Clone, LifeModel)]\n",
            "    #[table_name = \"users\"]\n",
            "    pub struct User {\n",
            "        #[primary_key]\n",
            "        #[auto_increment]\n",
            "        pub id: i32,\n",
            "        #[unique]\n",
            "        pub email: String,\n",
            "    }\n",
            "}\n",
        )
    );
    assert_eq!(sync(&out, &users(false)), out);
}

#[test]
fn test_byte_order_mark_is_preserved() {
    let existing = format!("\u{feff}{EXISTING}");
    let out = sync(&existing, &users(true));
    assert!(out.starts_with('\u{feff}'));
    assert_eq!(&out['\u{feff}'.len_utf8()..], sync(EXISTING, &users(true)));
}

#[test]
fn test_missing_region_is_an_error() {
    let other_table = concat!(
        "#[derive(Debug, Clone, LifeModel)]\n",
        "#[table_name = \"accounts\"]\n",
        "pub struct Account {}\n",
    );
    let not_an_entity = "#[table_name = \"users\"]\npub struct User {}\n";

    for existing in [other_table, not_an_entity] {
        let err = generate_source(&users(false), RenderMode::Sync, Some(existing)).unwrap_err();
        assert!(matches!(err, CodegenError::CodeRegionNotFound { ref table } if table == "users"));
    }

    let err = generate_source(&users(false), RenderMode::Sync, None).unwrap_err();
    assert!(matches!(err, CodegenError::CodeRegionNotFound { .. }));
}

#[test]
fn test_unparsable_source_is_an_error() {
    let err = generate_source(&users(false), RenderMode::Sync, Some("pub struct User {\n")).unwrap_err();
    assert!(matches!(err, CodegenError::SourceParse { .. }));

    // Replace never looks at the existing text.
    assert!(generate_source(&users(false), RenderMode::Replace, Some("pub struct User {\n")).is_ok());
}

#[test]
fn test_write_entity_outcomes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("entities").join("user.rs");

    assert_eq!(write_entity(&path, &users(false), RenderMode::Sync).unwrap(), WriteOutcome::Created);
    assert_eq!(write_entity(&path, &users(false), RenderMode::Sync).unwrap(), WriteOutcome::Unchanged);
    assert_eq!(write_entity(&path, &users(false), RenderMode::Replace).unwrap(), WriteOutcome::Unchanged);

    let custom = "\nimpl User {\n    pub fn is_staff(&self) -> bool {\n        self.email.ends_with(\"@example.com\")\n    }\n}\n";
    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str(custom);
    fs::write(&path, &text).unwrap();

    assert_eq!(write_entity(&path, &users(true), RenderMode::Sync).unwrap(), WriteOutcome::Updated);
    let synced = fs::read_to_string(&path).unwrap();
    assert!(synced.contains("pub name: Option<String>,"));
    assert!(synced.ends_with(custom));
    assert_eq!(write_entity(&path, &users(true), RenderMode::Sync).unwrap(), WriteOutcome::Unchanged);

    assert_eq!(write_entity(&path, &users(true), RenderMode::Replace).unwrap(), WriteOutcome::Updated);
    assert!(!fs::read_to_string(&path).unwrap().contains("is_staff"));
}
