//! Parametrized SQL fragments.
//!
//! Computed columns, index expressions and check constraints are written as
//! small templates such as `LOWER(@Email)` or `LEN(@Code) = {=Size}`. A
//! [`SqlExpression`] binds such a template to a [`Parameters`] table once, and
//! can then render it for any [`Dialect`]:
//!
//! ```ignore
//! let params = Parameters::new().with("Email", ColumnRef::new("Email"))?;
//! let expr = SqlExpression::new("LOWER(@Email)", params)?;
//! assert_eq!(expr.render(&SqlServerDialect)?, "LOWER([Email])");
//! ```

mod parameters;
mod tokenizer;

use std::collections::BTreeSet;

use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{Result, SchematicError};

pub use parameters::{ColumnRef, ParameterValue, Parameters};
pub use tokenizer::{tokenize, Token, TokenKind};

use tokenizer::Splice;

/// A template bound to its parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlExpression {
    text: String,
    tokens: Vec<Token>,
    splices: Vec<Splice>,
    parameters: Parameters,
}

impl SqlExpression {
    /// Tokenize `text` and bind it to `parameters`.
    ///
    /// Fails with [`SchematicError::UnboundReference`] when a token names a
    /// parameter that has no value. Parameters the template never mentions
    /// are allowed.
    pub fn new(text: impl Into<String>, parameters: Parameters) -> Result<Self> {
        let text = text.into();
        let tokenizer::Scan { tokens, splices } = tokenizer::scan(&text);

        {
            let referenced: BTreeSet<&str> = tokens.iter().map(Token::parameter_name).collect();
            let missing: Vec<String> = referenced
                .iter()
                .filter(|name| !parameters.contains(name))
                .map(|name| name.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(SchematicError::UnboundReference { names: missing });
            }

            let unused: Vec<&str> = parameters
                .names()
                .filter(|name| !referenced.contains(name))
                .collect();
            if !unused.is_empty() {
                debug!(expression = %text, unused = ?unused, "Expression has unused parameters");
            }
        }

        Ok(Self {
            text,
            tokens,
            splices,
            parameters,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Distinct parameter names referenced by the template, sorted
    pub fn referenced_names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .tokens
            .iter()
            .map(Token::parameter_name)
            .collect();
        names.into_iter().collect()
    }

    /// True when the whole template is a single `@name` or `{=name}`, i.e.
    /// the expression is just a column rather than a computation.
    pub fn is_identity(&self) -> bool {
        match self.tokens.as_slice() {
            [token] => token.span == (0..self.text.len()),
            _ => false,
        }
    }

    /// Substitute every token and escape and return the dialect-specific
    /// SQL. Text without tokens or escapes is returned unchanged.
    pub fn render(&self, dialect: &dyn Dialect) -> Result<String> {
        if self.splices.is_empty() {
            return Ok(self.text.clone());
        }

        let mut out = String::with_capacity(self.text.len() + 16);
        let mut cursor = 0;
        for splice in &self.splices {
            let span = match splice {
                Splice::Escape { span, replacement } => {
                    out.push_str(&self.text[cursor..span.start]);
                    out.push(*replacement);
                    span
                }
                Splice::Token(index) => {
                    let token = &self.tokens[*index];
                    out.push_str(&self.text[cursor..token.span.start]);
                    self.render_token(token, dialect, &mut out)?;
                    &token.span
                }
            };
            cursor = span.end;
        }
        out.push_str(&self.text[cursor..]);

        Ok(out)
    }

    fn render_token(&self, token: &Token, dialect: &dyn Dialect, out: &mut String) -> Result<()> {
        match &token.kind {
            TokenKind::Literal(name) => out.push_str(&self.value(name)?.to_string()),
            TokenKind::Variable(name) => match self.value(name)? {
                ParameterValue::Column(column) => {
                    out.push_str(&dialect.quote_name(dialect.alias_or_default(column)))
                }
                ParameterValue::String(s) => {
                    out.push('\'');
                    out.push_str(&s.replace('\'', "''"));
                    out.push('\'');
                }
                other => {
                    return Err(SchematicError::UnsupportedValue {
                        name: name.clone(),
                        kind: other.kind(),
                    })
                }
            },
        }
        Ok(())
    }

    fn value(&self, name: &str) -> Result<&ParameterValue> {
        // Binding guarantees every referenced name is present.
        self.parameters
            .get(name)
            .ok_or_else(|| SchematicError::UnboundReference {
                names: vec![name.to_string()],
            })
    }
}
