//! Snapshot file loading, writing and merging tests

use std::fs;

use pretty_assertions::assert_eq;

use rust_schematic::layer::SchemaLayer;
use rust_schematic::model::{
    DatabaseCheck, DatabaseColumn, DatabaseIndex, DatabaseKey, DatabaseRelationalKey,
    DatabaseRoutine, DatabaseSequence, DatabaseView,
};
use rust_schematic::snapshot::{load_snapshot, write_snapshot, write_snapshot_file};
use rust_schematic::{
    load_layered_database, merge_snapshots, IdentifierComparisonMode, MergeOptions, MergeSummary,
    SchematicError,
};

use crate::common::{id, layer, TestContext};

const BASE_SNAPSHOT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<SchemaSnapshot name="base" server="prod" database="shop" schema="dbo">
  <Table schema="dbo" name="Users">
    <Comment>Registered users</Comment>
    <Column name="Id" type="int" nullable="false" identity="true"/>
    <Column name="Email" type="nvarchar(256)" nullable="false"/>
    <Column name="EmailLower" type="nvarchar(256)" computed="LOWER([Email])"/>
    <PrimaryKey name="PK_Users"><KeyColumn name="Id"/></PrimaryKey>
    <UniqueKey name="UQ_Users_Email"><KeyColumn name="Email"/></UniqueKey>
    <Index name="IX_Users_EmailLower" unique="true">
      <KeyColumn name="EmailLower"/>
      <IncludedColumn name="Id"/>
    </Index>
    <Check name="CK_Users_Email" definition="LEN([Email]) &gt; 3"/>
  </Table>
  <Table schema="dbo" name="Orders">
    <Column name="Id" type="int" nullable="false"/>
    <Column name="UserId" type="int" nullable="false"/>
    <ForeignKey name="FK_Orders_Users" parentSchema="dbo" parentName="Users">
      <ColumnPair column="UserId" parentColumn="Id"/>
    </ForeignKey>
  </Table>
  <View schema="dbo" name="ActiveUsers">
    <Definition>SELECT Id FROM dbo.Users</Definition>
  </View>
  <Sequence schema="dbo" name="OrderNumbers" start="1000" increment="5" cycle="true"/>
  <Synonym schema="dbo" name="People" targetSchema="dbo" targetName="Users"/>
  <Routine schema="dbo" name="GetUser"><Definition>SELECT 1</Definition></Routine>
</SchemaSnapshot>
"#;

const OVERRIDE_SNAPSHOT: &str = r#"<SchemaSnapshot name="patch">
  <Table schema="dbo" name="Users">
    <Column name="Id" type="bigint" nullable="false"/>
  </Table>
  <Table schema="audit" name="Log">
    <Column name="Message" type="text"/>
  </Table>
</SchemaSnapshot>
"#;

// ============================================================================
// Loading Tests
// ============================================================================

#[test]
fn test_load_snapshot_reads_all_object_kinds() {
    let ctx = TestContext::new();
    let path = ctx.write("base.xml", BASE_SNAPSHOT);
    let layer = load_snapshot(&path).unwrap();

    assert_eq!(layer.name(), "base");
    let defaults = layer.identifier_defaults();
    assert_eq!(defaults.server.as_deref(), Some("prod"));
    assert_eq!(defaults.database.as_deref(), Some("shop"));
    assert_eq!(defaults.schema.as_deref(), Some("dbo"));

    assert_eq!(layer.tables.len(), 2);
    assert_eq!(layer.views.len(), 1);
    assert_eq!(layer.sequences.len(), 1);
    assert_eq!(layer.synonyms.len(), 1);
    assert_eq!(layer.routines.len(), 1);

    let users = layer.find_table(&id("Users")).unwrap().unwrap();
    assert_eq!(users.comment.as_deref(), Some("Registered users"));
    assert_eq!(users.columns.len(), 3);
    assert!(users.column("Id").unwrap().is_identity);
    assert!(!users.column("Email").unwrap().is_nullable);
    assert!(users.column("EmailLower").unwrap().is_computed());
    assert_eq!(
        users.primary_key,
        Some(DatabaseKey {
            name: Some("PK_Users".to_string()),
            columns: vec!["Id".to_string()],
        })
    );
    assert_eq!(users.unique_keys.len(), 1);
    assert_eq!(
        users.indexes,
        vec![DatabaseIndex {
            name: "IX_Users_EmailLower".to_string(),
            columns: vec!["EmailLower".to_string()],
            included_columns: vec!["Id".to_string()],
            is_unique: true,
        }]
    );
    assert_eq!(
        users.checks,
        vec![DatabaseCheck {
            name: Some("CK_Users_Email".to_string()),
            definition: "LEN([Email]) > 3".to_string(),
        }]
    );

    let orders = layer.find_table(&id("dbo.Orders")).unwrap().unwrap();
    let fk = &orders.foreign_keys[0];
    assert_eq!(fk.parent_table, id("dbo.Users"));
    assert_eq!(fk.column_pairs().collect::<Vec<_>>(), vec![("UserId", "Id")]);

    let sequence = layer.find_sequence(&id("OrderNumbers")).unwrap().unwrap();
    assert_eq!(sequence.start, 1000);
    assert_eq!(sequence.increment, 5);
    assert!(sequence.cycle);
}

#[test]
fn test_load_snapshot_with_bom_and_windows_1252() {
    let ctx = TestContext::new();

    let bom = format!("\u{feff}{}", OVERRIDE_SNAPSHOT);
    let layer = load_snapshot(&ctx.write("bom.xml", &bom)).unwrap();
    assert_eq!(layer.tables.len(), 2);

    // "Café" encoded as Windows-1252 (0xE9) is not valid UTF-8.
    let mut bytes = br#"<SchemaSnapshot><Table schema="dbo" name="Caf"#.to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(br#""/></SchemaSnapshot>"#);
    let path = ctx.path("cp1252.xml");
    fs::write(&path, bytes).unwrap();

    let layer = load_snapshot(&path).unwrap();
    assert_eq!(layer.tables[0].name.local(), "Café");
}

#[test]
fn test_load_missing_file_is_read_error() {
    let ctx = TestContext::new();
    let result = load_snapshot(&ctx.path("missing.xml"));
    assert!(matches!(
        result,
        Err(SchematicError::SnapshotReadError { .. })
    ));
}

#[test]
fn test_malformed_xml_is_parse_error() {
    let ctx = TestContext::new();
    let path = ctx.write("broken.xml", "<SchemaSnapshot><Table>");
    assert!(matches!(
        load_snapshot(&path),
        Err(SchematicError::SnapshotParseError { .. })
    ));
}

#[test]
fn test_bad_attribute_values_rejected() {
    let ctx = TestContext::new();
    let path = ctx.write(
        "bad.xml",
        r#"<SchemaSnapshot><Sequence name="S" start="one"/></SchemaSnapshot>"#,
    );
    assert!(matches!(
        load_snapshot(&path),
        Err(SchematicError::InvalidSnapshotFormat { .. })
    ));

    let path = ctx.write(
        "bad_flag.xml",
        r#"<SchemaSnapshot><View name="V" materialized="yes"/></SchemaSnapshot>"#,
    );
    assert!(matches!(
        load_snapshot(&path),
        Err(SchematicError::InvalidSnapshotFormat { .. })
    ));
}

// ============================================================================
// Writing Tests
// ============================================================================

#[test]
fn test_written_snapshot_reloads_identically() {
    let mut users = rust_schematic::model::DatabaseTable::new(id("dbo.Users"))
        .with_column(DatabaseColumn::new("Id", "int").not_null())
        .with_column(DatabaseColumn::new("Name", "nvarchar(50)"));
    users.primary_key = Some(DatabaseKey {
        name: Some("PK_Users".to_string()),
        columns: vec!["Id".to_string()],
    });
    users.foreign_keys.push(DatabaseRelationalKey {
        name: None,
        child_columns: vec!["Id".to_string()],
        parent_table: id("hr.dbo.People"),
        parent_columns: vec!["PersonId".to_string()],
    });
    users.comment = Some("A <quoted> & escaped comment".to_string());
    let mut flag = DatabaseColumn::new("IsActive", "bit");
    flag.computed_definition = Some("CASE\n  WHEN [Id] > 0 THEN 1\n\tELSE 0\nEND".to_string());
    flag.default_value = Some("(\n  1\n)".to_string());
    flag.comment = Some(String::new());
    users.columns.push(flag);
    users.checks.push(DatabaseCheck {
        name: Some("CK_Users_Id".to_string()),
        definition: "[Id]\t> 0\n".to_string(),
    });

    let mut view = DatabaseView::new(id("dbo.V"), "SELECT Name FROM dbo.Users WHERE Id > 0");
    view.is_materialized = true;

    let original = layer("original")
        .with_table(users)
        .with_view(view)
        .with_sequence(DatabaseSequence::new(id("dbo.S")))
        .with_routine(DatabaseRoutine {
            name: id("dbo.P"),
            definition: "SELECT 'x' AS Value".to_string(),
        });

    let ctx = TestContext::new();
    let path = write_snapshot_file(&original, "original", &ctx.path("out.xml")).unwrap();
    let reloaded = load_snapshot(&path).unwrap();

    assert_eq!(reloaded.identifier_defaults(), original.identifier_defaults());
    assert_eq!(reloaded.tables, original.tables);
    let reloaded_users = &reloaded.tables[0];
    assert_eq!(
        reloaded_users.column("IsActive").unwrap().computed_definition.as_deref(),
        Some("CASE\n  WHEN [Id] > 0 THEN 1\n\tELSE 0\nEND")
    );
    assert_eq!(reloaded_users.checks[0].definition, "[Id]\t> 0\n");
    assert_eq!(reloaded.views, original.views);
    assert_eq!(reloaded.sequences, original.sequences);
    assert_eq!(reloaded.routines, original.routines);
}

#[test]
fn test_write_snapshot_output_shape() {
    let original = layer("shape").with_sequence(DatabaseSequence::new(id("dbo.S")));
    let mut buffer = Vec::new();
    write_snapshot(&original, "shape", &mut buffer).unwrap();
    let xml = String::from_utf8(buffer).unwrap();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<SchemaSnapshot name=\"shape\" schema=\"dbo\">"));
    assert!(xml.contains("<Sequence schema=\"dbo\" name=\"S\" start=\"1\" increment=\"1\"/>"));
}

// ============================================================================
// Merge Tests
// ============================================================================

#[test]
fn test_later_snapshot_overrides_earlier() {
    let ctx = TestContext::new();
    let base = ctx.write("base.xml", BASE_SNAPSHOT);
    let patch = ctx.write("patch.xml", OVERRIDE_SNAPSHOT);

    let database =
        load_layered_database(&[base, patch], IdentifierComparisonMode::Ordinal).unwrap();

    assert_eq!(database.identifier_defaults().database.as_deref(), Some("shop"));
    // The patch file declares no default schema, so it is queried by the
    // qualified name.
    let users = database.find_table(&id("dbo.Users")).unwrap().unwrap();
    assert_eq!(users.column("Id").unwrap().data_type, "bigint");

    let names: Vec<String> = database
        .all_tables()
        .unwrap()
        .iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(names, vec!["audit.Log", "dbo.Orders", "dbo.Users"]);
}

#[test]
fn test_merge_snapshots_writes_combined_file() {
    let ctx = TestContext::new();
    let base = ctx.write("base.xml", BASE_SNAPSHOT);
    let patch = ctx.write("patch.xml", OVERRIDE_SNAPSHOT);
    let output = ctx.path("merged.xml");

    let summary = merge_snapshots(MergeOptions {
        layer_paths: vec![base, patch],
        output_path: output.clone(),
        comparison_mode: IdentifierComparisonMode::Ordinal,
    })
    .unwrap();

    assert_eq!(
        summary,
        MergeSummary {
            tables: 3,
            views: 1,
            sequences: 1,
            synonyms: 1,
            routines: 1,
        }
    );

    let merged = load_snapshot(&output).unwrap();
    assert_eq!(merged.name(), "merged");
    assert_eq!(merged.identifier_defaults().schema.as_deref(), Some("dbo"));
    let users = merged.find_table(&id("dbo.Users")).unwrap().unwrap();
    assert_eq!(users.column("Id").unwrap().data_type, "bigint");
    assert_eq!(users.columns.len(), 1);
    let synonym = merged.find_synonym(&id("People")).unwrap().unwrap();
    assert_eq!(synonym.target, id("dbo.Users"));
}

#[test]
fn test_merge_without_layers_fails() {
    let ctx = TestContext::new();
    let result = merge_snapshots(MergeOptions {
        layer_paths: vec![],
        output_path: ctx.path("merged.xml"),
        comparison_mode: IdentifierComparisonMode::Ordinal,
    });
    assert!(result.is_err());
    assert!(!ctx.path("merged.xml").exists());
}
