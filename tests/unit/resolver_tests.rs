//! Layered schema resolution tests

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rust_schematic::layer::SchemaLayer;
use rust_schematic::model::{DatabaseSequence, DatabaseSynonym, DatabaseView};
use rust_schematic::{
    IdentifierComparisonMode, LayeredDatabase, LayeredDatabaseBuilder, SchematicError,
};

use super::common::{id, layer, layer_in_schema, origin, table, FailingLayer, SlowLayer};

/// L2 holds T and U; L1 holds T and is added last, so it wins.
fn two_layer_database() -> LayeredDatabase {
    let l2 = layer("L2")
        .with_table(table("dbo.T", "L2"))
        .with_table(table("dbo.U", "L2"));
    let l1 = layer("L1").with_table(table("dbo.T", "L1"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(l2).override_with(l1);
    builder.build().unwrap()
}

// ============================================================================
// Point Lookup Tests
// ============================================================================

#[test]
fn test_find_prefers_most_recent_override() {
    let database = two_layer_database();
    let t = database.find_table(&id("dbo.T")).unwrap().unwrap();
    assert_eq!(origin(&t), "L1");

    let u = database.find_table(&id("dbo.U")).unwrap().unwrap();
    assert_eq!(origin(&u), "L2");
}

#[test]
fn test_find_missing_object_is_none() {
    let database = two_layer_database();
    assert!(database.find_table(&id("dbo.Missing")).unwrap().is_none());
    assert!(database.find_view(&id("dbo.T")).unwrap().is_none());
}

#[test]
fn test_find_uses_default_schema_for_partial_name() {
    let database = two_layer_database();
    let t = database.find_table(&id("T")).unwrap().unwrap();
    assert_eq!(origin(&t), "L1");
}

#[test]
fn test_override_layer_completes_name_with_own_schema() {
    let base = layer_in_schema("base", Some("dbo"));
    let over = layer_in_schema("override", Some("sales")).with_table(table("sales.T", "override"));
    assert!(over.find_table(&id("T")).unwrap().is_some());

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(base).override_with(over);
    let database = builder.build().unwrap();

    let t = database.find_table(&id("T")).unwrap().unwrap();
    assert_eq!(t.name, id("sales.T"));
    assert_eq!(origin(&t), "override");
}

#[test]
fn test_layers_with_different_schemas_resolve_by_priority() {
    let base = layer_in_schema("base", Some("dbo")).with_table(table("dbo.T", "base"));
    let over = layer_in_schema("override", Some("sales")).with_table(table("sales.T", "override"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(base).override_with(over);
    let database = builder.build().unwrap();

    assert_eq!(origin(&database.find_table(&id("T")).unwrap().unwrap()), "override");
    assert_eq!(origin(&database.find_table(&id("dbo.T")).unwrap().unwrap()), "base");
    assert_eq!(database.all_tables().unwrap().len(), 2);
}

#[test]
fn test_point_lookup_agrees_with_enumeration_for_unqualified_override() {
    let base = layer_in_schema("base", Some("dbo")).with_table(table("dbo.T", "base"));
    let over = layer_in_schema("override", None).with_table(table("T", "override"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(base).override_with(over);
    let database = builder.build().unwrap();

    let found = database.find_table(&id("T")).unwrap().unwrap();
    let all = database.all_tables().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(origin(&found), "override");
    assert_eq!(origin(&all[0]), origin(&found));
}

#[test]
fn test_direct_construction_takes_priority_order() {
    let high = layer("high").with_table(table("dbo.T", "high"));
    let low = layer("low").with_table(table("dbo.T", "low"));
    let database = LayeredDatabase::from_priority_order(vec![
        Arc::new(high) as Arc<dyn SchemaLayer>,
        Arc::new(low) as Arc<dyn SchemaLayer>,
    ])
    .unwrap();

    assert_eq!(database.base_layer().name(), "low");
    let t = database.find_table(&id("dbo.T")).unwrap().unwrap();
    assert_eq!(origin(&t), "high");
}

#[test]
fn test_slow_high_priority_layer_still_wins() {
    let slow = SlowLayer::new(
        layer("slow").with_table(table("dbo.T", "slow")),
        Duration::from_millis(50),
    );
    let requests = slow.table_requests.clone();
    let fast = layer("fast").with_table(table("dbo.T", "fast"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(fast).override_with(slow);
    let database = builder.build().unwrap();

    let t = database.find_table(&id("dbo.T")).unwrap().unwrap();
    assert_eq!(origin(&t), "slow");
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[test]
fn test_layer_failure_propagates_from_lookup() {
    let mut builder = LayeredDatabaseBuilder::new();
    builder
        .override_with(FailingLayer::new())
        .override_with(layer("healthy").with_table(table("dbo.T", "healthy")));
    let database = builder.build().unwrap();

    match database.find_table(&id("dbo.T")) {
        Err(SchematicError::LayerFailure { layer, .. }) => assert_eq!(layer, "failing"),
        other => panic!("expected LayerFailure, got {:?}", other),
    }
}

#[test]
fn test_each_object_kind_resolves() {
    let base = layer("base")
        .with_view(DatabaseView::new(id("dbo.V"), "SELECT 1"))
        .with_sequence(DatabaseSequence::new(id("dbo.S")))
        .with_synonym(DatabaseSynonym {
            name: id("dbo.Syn"),
            target: id("remote.sales.dbo.Orders"),
        });

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(base);
    let database = builder.build().unwrap();

    assert!(database.find_view(&id("V")).unwrap().is_some());
    assert!(database.find_sequence(&id("dbo.S")).unwrap().is_some());
    let synonym = database.find_synonym(&id("Syn")).unwrap().unwrap();
    assert_eq!(synonym.target.server(), Some("remote"));
    assert!(database.find_routine(&id("dbo.P")).unwrap().is_none());
}

// ============================================================================
// Enumeration Tests
// ============================================================================

#[test]
fn test_all_tables_deduplicates_by_priority_and_sorts() {
    let database = two_layer_database();
    let tables = database.all_tables().unwrap();

    let names: Vec<String> = tables.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["dbo.T", "dbo.U"]);
    assert_eq!(origin(&tables[0]), "L1");
    assert_eq!(origin(&tables[1]), "L2");
}

#[test]
fn test_enumeration_sorts_by_schema_then_name() {
    let base = layer("base")
        .with_table(table("sales.Alpha", "base"))
        .with_table(table("dbo.Zulu", "base"))
        .with_table(table("dbo.Alpha", "base"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(base);
    let database = builder.build().unwrap();

    let names: Vec<String> = database
        .all_tables()
        .unwrap()
        .iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(names, vec!["dbo.Alpha", "dbo.Zulu", "sales.Alpha"]);
}

#[test]
fn test_enumeration_dedup_honours_default_schema() {
    let base = layer("base").with_table(table("dbo.T", "base"));
    let over = layer("override").with_table(table("T", "override"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(base).override_with(over);
    let tables = builder.build().unwrap().all_tables().unwrap();

    assert_eq!(tables.len(), 1);
    assert_eq!(origin(&tables[0]), "override");
}

#[test]
fn test_enumeration_dedup_honours_comparison_mode() {
    let base = layer("base").with_table(table("dbo.Users", "base"));
    let over = layer("override").with_table(table("DBO.USERS", "override"));

    let mut builder = LayeredDatabaseBuilder::new();
    builder
        .comparison_mode(IdentifierComparisonMode::OrdinalIgnoreCase)
        .override_with(base)
        .override_with(over);
    let tables = builder.build().unwrap().all_tables().unwrap();

    assert_eq!(tables.len(), 1);
    assert_eq!(origin(&tables[0]), "override");
}

#[test]
fn test_enumeration_requeries_layers_each_call() {
    let slow = SlowLayer::new(
        layer("slow").with_table(table("dbo.T", "slow")),
        Duration::from_millis(1),
    );
    let requests = slow.table_requests.clone();

    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(slow);
    let database = builder.build().unwrap();

    let first = database.all_tables().unwrap();
    let second = database.all_tables().unwrap();
    assert_eq!(first, second);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[test]
fn test_layer_failure_fails_whole_enumeration() {
    let mut builder = LayeredDatabaseBuilder::new();
    builder
        .override_with(layer("healthy").with_table(table("dbo.T", "healthy")))
        .override_with(FailingLayer::new());
    let database = builder.build().unwrap();

    assert!(matches!(
        database.all_tables(),
        Err(SchematicError::LayerFailure { .. })
    ));
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_build_leaves_builder_reusable() {
    let mut builder = LayeredDatabaseBuilder::new();
    builder.override_with(layer("base").with_table(table("dbo.T", "base")));
    let first = builder.build().unwrap();

    builder.override_with(layer("patch").with_table(table("dbo.T", "patch")));
    let second = builder.build().unwrap();

    assert_eq!(builder.len(), 2);
    assert_eq!(first.layer_count(), 1);
    assert_eq!(second.layer_count(), 2);

    let t = first.find_table(&id("dbo.T")).unwrap().unwrap();
    assert_eq!(origin(&t), "base");
    let t = second.find_table(&id("dbo.T")).unwrap().unwrap();
    assert_eq!(origin(&t), "patch");
}

#[test]
fn test_layered_database_nests_as_layer() {
    let inner = two_layer_database();
    let mut builder = LayeredDatabaseBuilder::new();
    builder
        .override_with(inner)
        .override_with(layer("top").with_table(table("dbo.U", "top")));
    let database = builder.build().unwrap();

    let tables = database.all_tables().unwrap();
    assert_eq!(origin(&tables[0]), "L1");
    assert_eq!(origin(&tables[1]), "top");
}
