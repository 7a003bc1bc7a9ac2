//! SQL dialect capabilities used when rendering expressions.
//!
//! A dialect knows how to quote a name and which alias a column carries in
//! that dialect. Quoting doubles the closing quote character inside the
//! name, so any name round-trips safely.

use std::fmt;

use crate::error::{Result, SchematicError};
use crate::expression::ColumnRef;
use crate::identifier::Identifier;

/// Dialect-specific naming rules
pub trait Dialect: Send + Sync {
    /// Key used to look up per-dialect column aliases
    fn kind(&self) -> DialectKind;

    /// Quote a single name component.
    fn quote_name(&self, name: &str) -> String;

    /// The name a column is known by in this dialect.
    fn alias_or_default<'c>(&self, column: &'c ColumnRef) -> &'c str {
        column.alias_for(self.kind()).unwrap_or(column.name())
    }

    /// Quote every populated component of a qualified name.
    fn quote_identifier(&self, name: &Identifier) -> String {
        name.components()
            .into_iter()
            .map(|part| self.quote_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Built-in dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DialectKind {
    SqlServer,
    Postgres,
    MySql,
    Sqlite,
}

impl DialectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::SqlServer => "mssql",
            DialectKind::Postgres => "postgres",
            DialectKind::MySql => "mysql",
            DialectKind::Sqlite => "sqlite",
        }
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::SqlServer => &SqlServerDialect,
            DialectKind::Postgres => &PostgresDialect,
            DialectKind::MySql => &MySqlDialect,
            DialectKind::Sqlite => &SqliteDialect,
        }
    }
}

impl std::str::FromStr for DialectKind {
    type Err = SchematicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "tsql" => Ok(DialectKind::SqlServer),
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "sqlite" => Ok(DialectKind::Sqlite),
            _ => Err(SchematicError::invalid_argument(format!(
                "Unknown SQL dialect: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[name]`, with `]` escaped as `]]`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn quote_name(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }
}

/// `"name"`, with `"` escaped as `""`
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn quote_name(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `` `name` ``, with `` ` `` escaped by doubling
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn quote_name(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn quote_name(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
