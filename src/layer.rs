//! Schema layers: independent sources of schema metadata.
//!
//! A layer answers point lookups and full enumerations for each object kind.
//! Lookups return `Ok(None)` when the object does not exist; an `Err` is only
//! for genuine failures of the backing store, and is never treated as
//! absence by the resolver.

use crate::comparer::{IdentifierComparer, IdentifierComparisonMode};
use crate::error::LayerError;
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{
    DatabaseRoutine, DatabaseSequence, DatabaseSynonym, DatabaseTable, DatabaseView, SchemaObject,
};

pub type LayerResult<T> = std::result::Result<T, LayerError>;

/// One independent source of schema metadata
pub trait SchemaLayer: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str {
        "layer"
    }

    /// Server/database/schema used to complete partially qualified names
    fn identifier_defaults(&self) -> &IdentifierDefaults;

    fn find_table(&self, name: &Identifier) -> LayerResult<Option<DatabaseTable>>;
    fn find_view(&self, name: &Identifier) -> LayerResult<Option<DatabaseView>>;
    fn find_sequence(&self, name: &Identifier) -> LayerResult<Option<DatabaseSequence>>;
    fn find_synonym(&self, name: &Identifier) -> LayerResult<Option<DatabaseSynonym>>;
    fn find_routine(&self, name: &Identifier) -> LayerResult<Option<DatabaseRoutine>>;

    fn all_tables(&self) -> LayerResult<Vec<DatabaseTable>>;
    fn all_views(&self) -> LayerResult<Vec<DatabaseView>>;
    fn all_sequences(&self) -> LayerResult<Vec<DatabaseSequence>>;
    fn all_synonyms(&self) -> LayerResult<Vec<DatabaseSynonym>>;
    fn all_routines(&self) -> LayerResult<Vec<DatabaseRoutine>>;
}

/// Layer holding its objects in memory.
///
/// Lookups match on schema and local name using the layer's comparer, whose
/// default schema comes from the layer's identifier defaults.
#[derive(Debug, Clone)]
pub struct InMemoryLayer {
    name: String,
    defaults: IdentifierDefaults,
    comparer: IdentifierComparer,
    pub tables: Vec<DatabaseTable>,
    pub views: Vec<DatabaseView>,
    pub sequences: Vec<DatabaseSequence>,
    pub synonyms: Vec<DatabaseSynonym>,
    pub routines: Vec<DatabaseRoutine>,
}

impl InMemoryLayer {
    pub fn new(name: impl Into<String>, defaults: IdentifierDefaults) -> Self {
        let comparer =
            IdentifierComparer::new(IdentifierComparisonMode::Ordinal, defaults.schema.as_deref());
        Self {
            name: name.into(),
            defaults,
            comparer,
            tables: Vec::new(),
            views: Vec::new(),
            sequences: Vec::new(),
            synonyms: Vec::new(),
            routines: Vec::new(),
        }
    }

    pub fn with_comparison_mode(mut self, mode: IdentifierComparisonMode) -> Self {
        self.comparer = IdentifierComparer::new(mode, self.defaults.schema.as_deref());
        self
    }

    pub fn with_table(mut self, table: DatabaseTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_view(mut self, view: DatabaseView) -> Self {
        self.views.push(view);
        self
    }

    pub fn with_sequence(mut self, sequence: DatabaseSequence) -> Self {
        self.sequences.push(sequence);
        self
    }

    pub fn with_synonym(mut self, synonym: DatabaseSynonym) -> Self {
        self.synonyms.push(synonym);
        self
    }

    pub fn with_routine(mut self, routine: DatabaseRoutine) -> Self {
        self.routines.push(routine);
        self
    }

    fn find_in<T: SchemaObject>(&self, items: &[T], name: &Identifier) -> Option<T> {
        items
            .iter()
            .find(|item| self.comparer.equals(Some(item.name()), Some(name)))
            .cloned()
    }
}

impl SchemaLayer for InMemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn identifier_defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    fn find_table(&self, name: &Identifier) -> LayerResult<Option<DatabaseTable>> {
        Ok(self.find_in(&self.tables, name))
    }

    fn find_view(&self, name: &Identifier) -> LayerResult<Option<DatabaseView>> {
        Ok(self.find_in(&self.views, name))
    }

    fn find_sequence(&self, name: &Identifier) -> LayerResult<Option<DatabaseSequence>> {
        Ok(self.find_in(&self.sequences, name))
    }

    fn find_synonym(&self, name: &Identifier) -> LayerResult<Option<DatabaseSynonym>> {
        Ok(self.find_in(&self.synonyms, name))
    }

    fn find_routine(&self, name: &Identifier) -> LayerResult<Option<DatabaseRoutine>> {
        Ok(self.find_in(&self.routines, name))
    }

    fn all_tables(&self) -> LayerResult<Vec<DatabaseTable>> {
        Ok(self.tables.clone())
    }

    fn all_views(&self) -> LayerResult<Vec<DatabaseView>> {
        Ok(self.views.clone())
    }

    fn all_sequences(&self) -> LayerResult<Vec<DatabaseSequence>> {
        Ok(self.sequences.clone())
    }

    fn all_synonyms(&self) -> LayerResult<Vec<DatabaseSynonym>> {
        Ok(self.synonyms.clone())
    }

    fn all_routines(&self) -> LayerResult<Vec<DatabaseRoutine>> {
        Ok(self.routines.clone())
    }
}
