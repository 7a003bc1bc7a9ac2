//! rust-schematic: database schema metadata toolkit
//!
//! This library models qualified database object names, merges several
//! schema sources into one logical database with a defined precedence, and
//! renders small parametrized SQL fragments for different dialects.

pub mod comparer;
pub mod dialect;
pub mod error;
pub mod expression;
pub mod identifier;
pub mod layer;
pub mod model;
pub mod resolver;
pub mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub use comparer::{IdentifierComparer, IdentifierComparisonMode};
pub use dialect::{Dialect, DialectKind};
pub use error::SchematicError;
pub use expression::{ColumnRef, ParameterValue, Parameters, SqlExpression};
pub use identifier::{Identifier, IdentifierDefaults, IdentifierLevel, IdentifierPart};
pub use layer::{InMemoryLayer, SchemaLayer};
pub use resolver::{LayeredDatabase, LayeredDatabaseBuilder};

/// Options for merging snapshot files
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Snapshot files, base first; each file overrides the ones before it
    pub layer_paths: Vec<PathBuf>,
    /// Output path for the merged snapshot
    pub output_path: PathBuf,
    /// How object names are matched across layers
    pub comparison_mode: IdentifierComparisonMode,
}

/// Object counts of a merged snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub tables: usize,
    pub views: usize,
    pub sequences: usize,
    pub synonyms: usize,
    pub routines: usize,
}

/// Load snapshot files (base first) into a layered database.
pub fn load_layered_database(
    layer_paths: &[PathBuf],
    comparison_mode: IdentifierComparisonMode,
) -> Result<LayeredDatabase> {
    let mut builder = LayeredDatabaseBuilder::new();
    builder.comparison_mode(comparison_mode);
    for path in layer_paths {
        let layer = snapshot::load_snapshot(path)?;
        builder.override_with_shared(Arc::new(layer));
    }
    Ok(builder.build()?)
}

/// Merge snapshot files and write the result as a single snapshot
pub fn merge_snapshots(options: MergeOptions) -> Result<MergeSummary> {
    info!(layers = options.layer_paths.len(), "Merging snapshots");

    let database = load_layered_database(&options.layer_paths, options.comparison_mode)?;

    let summary = MergeSummary {
        tables: database.all_tables()?.len(),
        views: database.all_views()?.len(),
        sequences: database.all_sequences()?.len(),
        synonyms: database.all_synonyms()?.len(),
        routines: database.all_routines()?.len(),
    };

    let name = options
        .output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("merged")
        .to_string();
    snapshot::write_snapshot_file(&database, &name, &options.output_path)?;

    info!(
        output = %options.output_path.display(),
        tables = summary.tables,
        views = summary.views,
        "Wrote merged snapshot"
    );

    Ok(summary)
}
