//! Hierarchical database object names.
//!
//! An [`Identifier`] names an object as `server.database.schema.local`. Only
//! the local name is mandatory, and populated levels always form a
//! contiguous prefix ending at the local name: a database name implies a
//! schema name, and a server name implies both.
//!
//! ```ignore
//! let name = Identifier::with_schema("dbo", "Users")?;
//! assert_eq!(name.to_string(), "dbo.Users");
//!
//! let parsed = Identifier::parse("sales.dbo.Orders")?;
//! assert_eq!(parsed.database(), Some("sales"));
//! ```

use std::fmt;

use crate::error::{Result, SchematicError};

/// One level of the `server.database.schema.local` hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierLevel {
    Server,
    Database,
    Schema,
    Local,
}

impl IdentifierLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierLevel::Server => "server",
            IdentifierLevel::Database => "database",
            IdentifierLevel::Schema => "schema",
            IdentifierLevel::Local => "local",
        }
    }
}

/// A single-level name, used where only one level of the hierarchy is known
/// (for example the default schema of a connection).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierPart {
    Server(String),
    Database(String),
    Schema(String),
    Local(String),
}

impl IdentifierPart {
    /// Create a partial name for `level`, rejecting blank values.
    pub fn new(level: IdentifierLevel, value: &str) -> Result<Self> {
        let value = require_component(level, value)?;
        Ok(match level {
            IdentifierLevel::Server => IdentifierPart::Server(value),
            IdentifierLevel::Database => IdentifierPart::Database(value),
            IdentifierLevel::Schema => IdentifierPart::Schema(value),
            IdentifierLevel::Local => IdentifierPart::Local(value),
        })
    }

    pub fn level(&self) -> IdentifierLevel {
        match self {
            IdentifierPart::Server(_) => IdentifierLevel::Server,
            IdentifierPart::Database(_) => IdentifierLevel::Database,
            IdentifierPart::Schema(_) => IdentifierLevel::Schema,
            IdentifierPart::Local(_) => IdentifierLevel::Local,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            IdentifierPart::Server(v)
            | IdentifierPart::Database(v)
            | IdentifierPart::Schema(v)
            | IdentifierPart::Local(v) => v,
        }
    }
}

impl fmt::Display for IdentifierPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// A qualified database object name.
///
/// Instances can only be obtained through the validating constructors, so a
/// value in hand always has a non-blank local name and a contiguous prefix
/// of outer levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    server: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    local: String,
}

impl Identifier {
    /// `local`
    pub fn new(local: &str) -> Result<Self> {
        Ok(Self {
            server: None,
            database: None,
            schema: None,
            local: require_component(IdentifierLevel::Local, local)?,
        })
    }

    /// `schema.local`
    pub fn with_schema(schema: &str, local: &str) -> Result<Self> {
        Ok(Self {
            server: None,
            database: None,
            schema: Some(require_component(IdentifierLevel::Schema, schema)?),
            local: require_component(IdentifierLevel::Local, local)?,
        })
    }

    /// `database.schema.local`
    pub fn with_database(database: &str, schema: &str, local: &str) -> Result<Self> {
        Ok(Self {
            server: None,
            database: Some(require_component(IdentifierLevel::Database, database)?),
            schema: Some(require_component(IdentifierLevel::Schema, schema)?),
            local: require_component(IdentifierLevel::Local, local)?,
        })
    }

    /// `server.database.schema.local`
    pub fn with_server(server: &str, database: &str, schema: &str, local: &str) -> Result<Self> {
        Ok(Self {
            server: Some(require_component(IdentifierLevel::Server, server)?),
            database: Some(require_component(IdentifierLevel::Database, database)?),
            schema: Some(require_component(IdentifierLevel::Schema, schema)?),
            local: require_component(IdentifierLevel::Local, local)?,
        })
    }

    /// Build from optional components, enforcing the contiguous-prefix rule.
    pub fn from_parts(
        server: Option<&str>,
        database: Option<&str>,
        schema: Option<&str>,
        local: &str,
    ) -> Result<Self> {
        match (server, database, schema) {
            (None, None, None) => Self::new(local),
            (None, None, Some(s)) => Self::with_schema(s, local),
            (None, Some(d), Some(s)) => Self::with_database(d, s, local),
            (Some(sv), Some(d), Some(s)) => Self::with_server(sv, d, s, local),
            _ => Err(SchematicError::invalid_argument(format!(
                "identifier levels must form a contiguous prefix ending at '{}'",
                local
            ))),
        }
    }

    /// Parse a dotted name with one to four components.
    ///
    /// Components are taken verbatim; no bracket or quote stripping happens
    /// here, since quoting rules belong to a dialect.
    pub fn parse(dotted: &str) -> Result<Self> {
        let parts: Vec<&str> = dotted.split('.').collect();
        match parts.as_slice() {
            [local] => Self::new(local),
            [schema, local] => Self::with_schema(schema, local),
            [database, schema, local] => Self::with_database(database, schema, local),
            [server, database, schema, local] => {
                Self::with_server(server, database, schema, local)
            }
            _ => Err(SchematicError::invalid_argument(format!(
                "'{}' has {} components; an identifier has at most 4",
                dotted,
                parts.len()
            ))),
        }
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// The component at `level` as a partial name, if populated.
    pub fn part(&self, level: IdentifierLevel) -> Option<IdentifierPart> {
        match level {
            IdentifierLevel::Server => self.server.clone().map(IdentifierPart::Server),
            IdentifierLevel::Database => self.database.clone().map(IdentifierPart::Database),
            IdentifierLevel::Schema => self.schema.clone().map(IdentifierPart::Schema),
            IdentifierLevel::Local => Some(IdentifierPart::Local(self.local.clone())),
        }
    }

    /// Populated components, outermost first.
    pub fn components(&self) -> Vec<&str> {
        [
            self.server.as_deref(),
            self.database.as_deref(),
            self.schema.as_deref(),
        ]
        .into_iter()
        .flatten()
        .chain(std::iter::once(self.local.as_str()))
        .collect()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components().join("."))
    }
}

impl std::str::FromStr for Identifier {
    type Err = SchematicError;

    fn from_str(s: &str) -> Result<Self> {
        Identifier::parse(s)
    }
}

/// Connection-level defaults used to complete partially qualified names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierDefaults {
    pub server: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl IdentifierDefaults {
    pub fn new(server: Option<&str>, database: Option<&str>, schema: Option<&str>) -> Self {
        Self {
            server: server.map(str::to_string),
            database: database.map(str::to_string),
            schema: schema.map(str::to_string),
        }
    }

    /// Fill absent outer levels of `name` from these defaults.
    ///
    /// Filling stops at the first level with no default, so the result keeps
    /// a contiguous prefix. Levels already present on `name` are kept.
    pub fn qualify(&self, name: &Identifier) -> Identifier {
        let schema = name.schema.clone().or_else(|| non_blank(&self.schema));
        let database = match schema {
            Some(_) => name.database.clone().or_else(|| non_blank(&self.database)),
            None => None,
        };
        let server = match database {
            Some(_) => name.server.clone().or_else(|| non_blank(&self.server)),
            None => None,
        };

        Identifier {
            server,
            database,
            schema,
            local: name.local.clone(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn require_component(level: IdentifierLevel, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(SchematicError::invalid_argument(format!(
            "{} name must not be empty or whitespace",
            level.as_str()
        )));
    }
    Ok(value.to_string())
}
