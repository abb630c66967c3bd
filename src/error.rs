//! Error types for the reflection engine.
//!
//! Two families exist.  [`ParseError`] is raised by the element builders
//! while a token stream is consumed and aborts the current source unit
//! only.  [`ResolutionError`] is raised after parsing succeeded, by the
//! registry and the resolvers, and describes an expected, queryable
//! outcome (a missing symbol, a duplicate, a documentation cycle, ...).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The kind of declaration a builder was working on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Namespace,
    Use,
    Class,
    Function,
    Method,
    Parameter,
    Property,
    Constant,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Namespace => "namespace",
            Self::Use => "use statement",
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::Parameter => "parameter",
            Self::Property => "property",
            Self::Constant => "constant",
        };
        f.write_str(s)
    }
}

/// Errors raised while consuming tokens.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected `{found}` on line {line} while parsing {construct}")]
    UnexpectedToken {
        construct: &'static str,
        found: String,
        line: usize,
    },

    #[error("unexpected end of input while parsing {construct}")]
    UnexpectedEof { construct: &'static str },

    #[error("unterminated {what} starting on line {line}")]
    Unterminated { what: &'static str, line: usize },

    #[error("syntax error on line {line}: {message}")]
    Lexer { message: String, line: usize },

    #[error("{construct} on line {line} must be declared inside a {expected}")]
    WrongContext {
        construct: &'static str,
        expected: &'static str,
        line: usize,
    },

    #[error("{kind} `{name}` is declared twice (line {line})")]
    Duplicate {
        kind: ElementKind,
        name: String,
        line: usize,
    },

    #[error("failed to parse {kind} `{name}` (line {line})")]
    InElement {
        kind: ElementKind,
        name: String,
        line: usize,
        #[source]
        source: Box<ParseError>,
    },

    #[error("failed to parse {file}")]
    InUnit {
        file: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Wrap this error with the declaration that was being built.
    pub fn within(self, kind: ElementKind, name: impl Into<String>, line: usize) -> Self {
        Self::InElement {
            kind,
            name: name.into(),
            line,
            source: Box::new(self),
        }
    }

    /// The line of the innermost failure, when one is known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnexpectedToken { line, .. }
            | Self::Unterminated { line, .. }
            | Self::Lexer { line, .. }
            | Self::WrongContext { line, .. }
            | Self::Duplicate { line, .. } => Some(*line),
            Self::UnexpectedEof { .. } => None,
            Self::InElement { source, line, .. } => source.line().or(Some(*line)),
            Self::InUnit { source, .. } => source.line(),
        }
    }

    /// The nearest enclosing declaration, as `(kind, name)`.
    pub fn element(&self) -> Option<(ElementKind, &str)> {
        match self {
            Self::InElement {
                kind, name, source, ..
            } => source.element().or(Some((*kind, name.as_str()))),
            Self::InUnit { source, .. } => source.element(),
            _ => None,
        }
    }
}

/// The registry table a symbol lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Type,
    Function,
    Constant,
    Namespace,
    Method,
    Property,
    ClassConstant,
    Parameter,
    DefaultValue,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Type => "type",
            Self::Function => "function",
            Self::Constant => "constant",
            Self::Namespace => "namespace",
            Self::Method => "method",
            Self::Property => "property",
            Self::ClassConstant => "class constant",
            Self::Parameter => "parameter",
            Self::DefaultValue => "default value",
        };
        f.write_str(s)
    }
}

/// Errors raised by registry and resolver queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("{kind} `{name}` does not exist")]
    DoesNotExist { kind: SymbolKind, name: String },

    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: SymbolKind, name: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("{kind} `{name}` is not accessible")]
    NotAccessible { kind: SymbolKind, name: String },

    #[error("infinite loop detected: {}", chain.join(" -> "))]
    InfiniteLoop { chain: Vec<String> },
}

impl ResolutionError {
    pub(crate) fn missing(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self::DoesNotExist {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn duplicate(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, Self::DoesNotExist { .. })
    }
}

/// Top-level error for operations that touch the file system or the
/// configuration as well as the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
