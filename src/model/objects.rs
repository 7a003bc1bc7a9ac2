//! Schema object records supplied by layers

use crate::identifier::Identifier;

/// Anything a layer can look up by qualified name
pub trait SchemaObject: Clone + Send + Sync {
    /// Object kind used in logs and snapshot files (e.g. "Table")
    const KIND: &'static str;

    fn name(&self) -> &Identifier;
}

/// Table column
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseColumn {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    /// Definition of a computed column
    pub computed_definition: Option<String>,
    pub is_identity: bool,
    pub comment: Option<String>,
}

impl DatabaseColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default_value: None,
            computed_definition: None,
            is_identity: false,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn is_computed(&self) -> bool {
        self.computed_definition.is_some()
    }
}

/// Primary or unique key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Foreign key, stated declaratively: child columns map positionally onto
/// the parent table's key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRelationalKey {
    pub name: Option<String>,
    pub child_columns: Vec<String>,
    pub parent_table: Identifier,
    pub parent_columns: Vec<String>,
}

impl DatabaseRelationalKey {
    /// Child column paired with the parent column it references.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.child_columns
            .iter()
            .map(String::as_str)
            .zip(self.parent_columns.iter().map(String::as_str))
    }
}

/// Index element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseIndex {
    pub name: String,
    /// Key columns or expressions
    pub columns: Vec<String>,
    /// Columns included in the index leaf level
    pub included_columns: Vec<String>,
    pub is_unique: bool,
}

/// Check constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCheck {
    pub name: Option<String>,
    pub definition: String,
}

/// Table element
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseTable {
    pub name: Identifier,
    pub columns: Vec<DatabaseColumn>,
    pub primary_key: Option<DatabaseKey>,
    pub unique_keys: Vec<DatabaseKey>,
    pub foreign_keys: Vec<DatabaseRelationalKey>,
    pub indexes: Vec<DatabaseIndex>,
    pub checks: Vec<DatabaseCheck>,
    pub comment: Option<String>,
}

impl DatabaseTable {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: None,
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            checks: Vec::new(),
            comment: None,
        }
    }

    pub fn with_column(mut self, column: DatabaseColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&DatabaseColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl SchemaObject for DatabaseTable {
    const KIND: &'static str = "Table";

    fn name(&self) -> &Identifier {
        &self.name
    }
}

/// View element
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseView {
    pub name: Identifier,
    pub definition: String,
    pub columns: Vec<DatabaseColumn>,
    pub is_materialized: bool,
    pub comment: Option<String>,
}

impl DatabaseView {
    pub fn new(name: Identifier, definition: impl Into<String>) -> Self {
        Self {
            name,
            definition: definition.into(),
            columns: Vec::new(),
            is_materialized: false,
            comment: None,
        }
    }
}

impl SchemaObject for DatabaseView {
    const KIND: &'static str = "View";

    fn name(&self) -> &Identifier {
        &self.name
    }
}

/// Sequence element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSequence {
    pub name: Identifier,
    pub start: i64,
    pub increment: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
    pub cache: Option<i64>,
}

impl DatabaseSequence {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            start: 1,
            increment: 1,
            min_value: None,
            max_value: None,
            cycle: false,
            cache: None,
        }
    }
}

impl SchemaObject for DatabaseSequence {
    const KIND: &'static str = "Sequence";

    fn name(&self) -> &Identifier {
        &self.name
    }
}

/// Synonym element; `target` may live on another database or server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSynonym {
    pub name: Identifier,
    pub target: Identifier,
}

impl SchemaObject for DatabaseSynonym {
    const KIND: &'static str = "Synonym";

    fn name(&self) -> &Identifier {
        &self.name
    }
}

/// Stored procedure or function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRoutine {
    pub name: Identifier,
    pub definition: String,
}

impl SchemaObject for DatabaseRoutine {
    const KIND: &'static str = "Routine";

    fn name(&self) -> &Identifier {
        &self.name
    }
}
