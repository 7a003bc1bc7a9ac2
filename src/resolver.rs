//! Layered schema resolution.
//!
//! A [`LayeredDatabase`] presents several [`SchemaLayer`]s as one logical
//! database. Every request is sent to all layers in parallel; once all have
//! answered, results are ranked by layer priority, so the answer never
//! depends on which layer responded first.
//!
//! Priority order is always explicit. [`LayeredDatabase::from_priority_order`]
//! takes layers highest-priority first, while [`LayeredDatabaseBuilder`]
//! takes them base-first (each call overrides everything before it) and
//! reverses them on [`build`](LayeredDatabaseBuilder::build).

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::comparer::{IdentifierComparer, IdentifierComparisonMode};
use crate::error::{Result, SchematicError};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::layer::{LayerResult, SchemaLayer};
use crate::model::{
    DatabaseRoutine, DatabaseSequence, DatabaseSynonym, DatabaseTable, DatabaseView, SchemaObject,
};

/// Immutable, priority-ordered stack of schema layers
#[derive(Clone)]
pub struct LayeredDatabase {
    /// Highest priority first; the last entry is the base layer.
    layers: Vec<Arc<dyn SchemaLayer>>,
    comparer: IdentifierComparer,
}

impl std::fmt::Debug for LayeredDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredDatabase")
            .field(
                "layers",
                &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .field("comparer", &self.comparer)
            .finish()
    }
}

impl LayeredDatabase {
    /// Build from layers ordered highest priority first.
    ///
    /// The last layer is the base layer: it supplies the identifier defaults
    /// and the default schema used when matching names across layers.
    pub fn from_priority_order(layers: Vec<Arc<dyn SchemaLayer>>) -> Result<Self> {
        Self::with_comparison_mode(layers, IdentifierComparisonMode::Ordinal)
    }

    pub fn with_comparison_mode(
        layers: Vec<Arc<dyn SchemaLayer>>,
        mode: IdentifierComparisonMode,
    ) -> Result<Self> {
        let base = layers.last().ok_or_else(|| {
            SchematicError::invalid_argument("a layered database needs at least one layer")
        })?;
        let comparer = IdentifierComparer::new(mode, base.identifier_defaults().schema.as_deref());

        debug!(
            layers = layers.len(),
            base = base.name(),
            "Created layered database"
        );

        Ok(Self { layers, comparer })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Lowest-priority layer
    pub fn base_layer(&self) -> &Arc<dyn SchemaLayer> {
        // Construction rejects an empty layer list.
        &self.layers[self.layers.len() - 1]
    }

    /// Layers in priority order, highest first
    pub fn layers(&self) -> &[Arc<dyn SchemaLayer>] {
        &self.layers
    }

    pub fn comparer(&self) -> &IdentifierComparer {
        &self.comparer
    }

    pub fn identifier_defaults(&self) -> &IdentifierDefaults {
        self.base_layer().identifier_defaults()
    }

    pub fn find_table(&self, name: &Identifier) -> Result<Option<DatabaseTable>> {
        self.find_first(name, |layer, name| layer.find_table(name))
    }

    pub fn find_view(&self, name: &Identifier) -> Result<Option<DatabaseView>> {
        self.find_first(name, |layer, name| layer.find_view(name))
    }

    pub fn find_sequence(&self, name: &Identifier) -> Result<Option<DatabaseSequence>> {
        self.find_first(name, |layer, name| layer.find_sequence(name))
    }

    pub fn find_synonym(&self, name: &Identifier) -> Result<Option<DatabaseSynonym>> {
        self.find_first(name, |layer, name| layer.find_synonym(name))
    }

    pub fn find_routine(&self, name: &Identifier) -> Result<Option<DatabaseRoutine>> {
        self.find_first(name, |layer, name| layer.find_routine(name))
    }

    pub fn all_tables(&self) -> Result<Vec<DatabaseTable>> {
        self.merge_all(|layer| layer.all_tables())
    }

    pub fn all_views(&self) -> Result<Vec<DatabaseView>> {
        self.merge_all(|layer| layer.all_views())
    }

    pub fn all_sequences(&self) -> Result<Vec<DatabaseSequence>> {
        self.merge_all(|layer| layer.all_sequences())
    }

    pub fn all_synonyms(&self) -> Result<Vec<DatabaseSynonym>> {
        self.merge_all(|layer| layer.all_synonyms())
    }

    pub fn all_routines(&self) -> Result<Vec<DatabaseRoutine>> {
        self.merge_all(|layer| layer.all_routines())
    }

    /// Query every layer, then return the highest-priority hit.
    ///
    /// Each layer receives `name` as given and completes it from its own
    /// identifier defaults. Any layer failure fails the lookup, even when
    /// another layer found the object.
    fn find_first<T, F>(&self, name: &Identifier, lookup: F) -> Result<Option<T>>
    where
        T: SchemaObject,
        F: Fn(&dyn SchemaLayer, &Identifier) -> LayerResult<Option<T>> + Send + Sync,
    {
        let results: Vec<LayerResult<Option<T>>> = self
            .layers
            .par_iter()
            .map(|layer| lookup(layer.as_ref(), name))
            .collect();

        let mut found = None;
        for (layer, result) in self.layers.iter().zip(results) {
            match result {
                Ok(Some(object)) if found.is_none() => {
                    debug!(kind = T::KIND, name = %name, layer = layer.name(), "Resolved object");
                    found = Some(object);
                }
                Ok(_) => {}
                Err(source) => {
                    return Err(SchematicError::LayerFailure {
                        layer: layer.name().to_string(),
                        source,
                    })
                }
            }
        }

        if found.is_none() {
            debug!(kind = T::KIND, name = %name, "Object not found in any layer");
        }
        Ok(found)
    }

    /// Concatenate every layer's objects in priority order, keep the first
    /// object seen for each name, and sort by schema then local name.
    fn merge_all<T, F>(&self, fetch: F) -> Result<Vec<T>>
    where
        T: SchemaObject,
        F: Fn(&dyn SchemaLayer) -> LayerResult<Vec<T>> + Send + Sync,
    {
        let results: Vec<LayerResult<Vec<T>>> = self
            .layers
            .par_iter()
            .map(|layer| fetch(layer.as_ref()))
            .collect();

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (layer, result) in self.layers.iter().zip(results) {
            let objects = result.map_err(|source| SchematicError::LayerFailure {
                layer: layer.name().to_string(),
                source,
            })?;
            for object in objects {
                if seen.insert(self.comparer.key(object.name())) {
                    merged.push(object);
                }
            }
        }

        merged.sort_by(|a, b| {
            (a.name().schema(), a.name().local()).cmp(&(b.name().schema(), b.name().local()))
        });

        debug!(
            kind = T::KIND,
            count = merged.len(),
            layers = self.layers.len(),
            "Merged layer objects"
        );
        Ok(merged)
    }
}

/// A layered database is itself a layer, so stacks can be nested or written
/// out as a snapshot.
impl SchemaLayer for LayeredDatabase {
    fn name(&self) -> &str {
        "layered"
    }

    fn identifier_defaults(&self) -> &IdentifierDefaults {
        LayeredDatabase::identifier_defaults(self)
    }

    fn find_table(&self, name: &Identifier) -> LayerResult<Option<DatabaseTable>> {
        Ok(LayeredDatabase::find_table(self, name)?)
    }

    fn find_view(&self, name: &Identifier) -> LayerResult<Option<DatabaseView>> {
        Ok(LayeredDatabase::find_view(self, name)?)
    }

    fn find_sequence(&self, name: &Identifier) -> LayerResult<Option<DatabaseSequence>> {
        Ok(LayeredDatabase::find_sequence(self, name)?)
    }

    fn find_synonym(&self, name: &Identifier) -> LayerResult<Option<DatabaseSynonym>> {
        Ok(LayeredDatabase::find_synonym(self, name)?)
    }

    fn find_routine(&self, name: &Identifier) -> LayerResult<Option<DatabaseRoutine>> {
        Ok(LayeredDatabase::find_routine(self, name)?)
    }

    fn all_tables(&self) -> LayerResult<Vec<DatabaseTable>> {
        Ok(LayeredDatabase::all_tables(self)?)
    }

    fn all_views(&self) -> LayerResult<Vec<DatabaseView>> {
        Ok(LayeredDatabase::all_views(self)?)
    }

    fn all_sequences(&self) -> LayerResult<Vec<DatabaseSequence>> {
        Ok(LayeredDatabase::all_sequences(self)?)
    }

    fn all_synonyms(&self) -> LayerResult<Vec<DatabaseSynonym>> {
        Ok(LayeredDatabase::all_synonyms(self)?)
    }

    fn all_routines(&self) -> LayerResult<Vec<DatabaseRoutine>> {
        Ok(LayeredDatabase::all_routines(self)?)
    }
}

/// Accumulates layers base-first; each added layer overrides all earlier ones.
#[derive(Clone, Default)]
pub struct LayeredDatabaseBuilder {
    /// Base layer first, most recent override last.
    layers: Vec<Arc<dyn SchemaLayer>>,
    mode: IdentifierComparisonMode,
}

impl LayeredDatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comparison_mode(&mut self, mode: IdentifierComparisonMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Add a layer that takes precedence over every layer added so far.
    /// The first layer added is the base layer.
    pub fn override_with<L: SchemaLayer + 'static>(&mut self, layer: L) -> &mut Self {
        self.override_with_shared(Arc::new(layer))
    }

    pub fn override_with_shared(&mut self, layer: Arc<dyn SchemaLayer>) -> &mut Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Snapshot the layers added so far. The builder is left unchanged and
    /// can keep accumulating overrides.
    pub fn build(&self) -> Result<LayeredDatabase> {
        let priority_order: Vec<Arc<dyn SchemaLayer>> =
            self.layers.iter().rev().cloned().collect();
        LayeredDatabase::with_comparison_mode(priority_order, self.mode)
    }
}
