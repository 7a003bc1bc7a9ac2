//! Tokenizer for SQL fragment templates.
//!
//! Recognized forms, scanned left to right with escapes taking precedence:
//!
//! | Source    | Meaning                       |
//! |-----------|-------------------------------|
//! | `@@`      | escaped `@`, not a token      |
//! | `@name`   | `Variable("name")`            |
//! | `{{`      | escaped `{`, not a token      |
//! | `{=name}` | `Literal("name")`             |
//!
//! Everything else is plain text and produces no token. Spans are byte
//! offsets into the source and always fall on character boundaries.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let ident = r"[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Nd}\p{Pc}\p{Mn}\p{Mc}\p{Cf}]*";
    Regex::new(&format!(
        r"@@|@(?P<variable>{ident})|\{{\{{|\{{=(?P<literal>{ident})\}}"
    ))
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `@name`: rendered as a quoted column name or string literal
    Variable(String),
    /// `{=name}`: the bound value's text, inserted verbatim
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range of the matched source text
    pub span: Range<usize>,
}

impl Token {
    pub fn parameter_name(&self) -> &str {
        match &self.kind {
            TokenKind::Variable(name) | TokenKind::Literal(name) => name,
        }
    }
}

/// One substitution site in a template, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Splice {
    /// `@@` or `{{` at `span`, standing for a single character
    Escape { span: Range<usize>, replacement: char },
    /// Index into the token list
    Token(usize),
}

/// Tokens of a template together with every splice needed to render it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Scan {
    pub tokens: Vec<Token>,
    pub splices: Vec<Splice>,
}

pub(crate) fn scan(text: &str) -> Scan {
    let mut scan = Scan::default();
    for caps in TOKEN_PATTERN.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let kind = if let Some(name) = caps.name("variable") {
            TokenKind::Variable(name.as_str().to_string())
        } else if let Some(name) = caps.name("literal") {
            TokenKind::Literal(name.as_str().to_string())
        } else {
            let replacement = if whole.as_str() == "@@" { '@' } else { '{' };
            scan.splices.push(Splice::Escape {
                span: whole.range(),
                replacement,
            });
            continue;
        };
        scan.splices.push(Splice::Token(scan.tokens.len()));
        scan.tokens.push(Token {
            kind,
            span: whole.range(),
        });
    }

    trace!(
        text,
        tokens = scan.tokens.len(),
        escapes = scan.splices.len() - scan.tokens.len(),
        "Tokenized expression"
    );
    scan
}

/// Variable and literal tokens of `text`. Escapes are not tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    scan(text).tokens
}
