//! Values bound to expression parameters

use std::collections::BTreeMap;
use std::fmt;

use crate::dialect::DialectKind;
use crate::error::{Result, SchematicError};

/// Reference to a modelled column, optionally renamed per dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    name: String,
    aliases: BTreeMap<DialectKind, String>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, dialect: DialectKind, alias: impl Into<String>) -> Self {
        self.aliases.insert(dialect, alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_for(&self, dialect: DialectKind) -> Option<&str> {
        self.aliases.get(&dialect).map(String::as_str)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A value bound to an expression parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Column(ColumnRef),
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl ParameterValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParameterValue::Column(_) => "column",
            ParameterValue::String(_) => "string",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Float(_) => "float",
            ParameterValue::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Column(c) => write!(f, "{}", c),
            ParameterValue::String(s) => f.write_str(s),
            ParameterValue::Integer(i) => write!(f, "{}", i),
            ParameterValue::Float(x) => write!(f, "{}", x),
            ParameterValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<ColumnRef> for ParameterValue {
    fn from(value: ColumnRef) -> Self {
        ParameterValue::Column(value)
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Integer(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}

/// Name to value table an expression is bound against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, ParameterValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a value. Names must not be blank.
    pub fn insert(&mut self, name: &str, value: impl Into<ParameterValue>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SchematicError::invalid_argument(
                "parameter name must not be empty or whitespace",
            ));
        }
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn with(mut self, name: &str, value: impl Into<ParameterValue>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
