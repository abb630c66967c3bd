/// Element builders.
///
/// This module turns a token stream into a [`ParsedUnit`]: every
/// namespace, class-like, function and constant declared at the top level
/// of one source unit, with their members.  Builders consume exactly one
/// declaration and leave the cursor on the first token after it.
///
/// Sub-modules:
/// - [`use_statements`]: namespace and `use` statement extraction
/// - [`classes`]: class, interface and trait builders, including the trait
///   adaptation block
/// - [`functions`]: function, method and parameter builders
/// - [`members`]: property and constant builders, `define()` constants
mod classes;
mod functions;
mod members;
mod use_statements;

pub(crate) use members::unquote;

use std::collections::HashMap;
use std::sync::Arc;

use crate::cursor::TokenCursor;
use crate::error::ParseError;
use crate::lexer::{Keyword, Token, TokenKind, tokenize};
use crate::types::*;

/// Tokenize and parse one source unit.
pub fn parse_source(source: &str, file: Option<&str>) -> Result<ParsedUnit, ParseError> {
    let tokens = tokenize(source).map_err(|e| in_unit(file, e))?;
    parse_tokens(&tokens, file)
}

/// Parse an already tokenized source unit.
pub fn parse_tokens(tokens: &[Token], file: Option<&str>) -> Result<ParsedUnit, ParseError> {
    let mut parser = UnitParser::new(tokens, file);
    parser.parse_statements(false).map_err(|e| in_unit(file, e))?;
    Ok(parser.finish())
}

fn in_unit(file: Option<&str>, error: ParseError) -> ParseError {
    ParseError::InUnit {
        file: file.unwrap_or("<source>").to_string(),
        source: Box::new(error),
    }
}

/// Tracks the doc comment waiting for the next declaration and the stack
/// of open shared annotation blocks (`/**#@+ ... */` to `/**#@-*/`).
#[derive(Debug, Default, Clone)]
pub(crate) struct DocState {
    pending: Option<String>,
    templates: Vec<Arc<str>>,
}

impl DocState {
    pub(crate) fn observe(&mut self, comment: &str) {
        if comment.starts_with("/**#@+") {
            self.templates.push(Arc::from(comment));
            self.pending = None;
        } else if comment.starts_with("/**#@-") {
            self.templates.pop();
            self.pending = None;
        } else {
            self.pending = Some(comment.to_string());
        }
    }

    /// Hand the pending comment and a snapshot of the open templates to a
    /// declaration.
    pub(crate) fn take(&mut self) -> Docblock {
        Docblock {
            comment: self.pending.take(),
            templates: self.templates.clone(),
        }
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Walks the top level of one source unit.
pub(crate) struct UnitParser<'t> {
    pub(crate) cursor: TokenCursor<'t>,
    pub(crate) file: Option<Arc<str>>,
    pub(crate) docs: DocState,
    pub(crate) context: Arc<NameContext>,
    unit: ParsedUnit,
    namespace_index: HashMap<String, usize>,
}

impl<'t> UnitParser<'t> {
    fn new(tokens: &'t [Token], file: Option<&str>) -> Self {
        let file: Option<Arc<str>> = file.map(Arc::from);
        Self {
            cursor: TokenCursor::new(tokens),
            unit: ParsedUnit {
                file: file.clone(),
                ..ParsedUnit::default()
            },
            file,
            docs: DocState::default(),
            context: Arc::new(NameContext::default()),
            namespace_index: HashMap::new(),
        }
    }

    fn finish(self) -> ParsedUnit {
        self.unit
    }

    pub(crate) fn span(&self, start_line: usize, end_line: usize) -> Span {
        Span {
            file: self.file.clone(),
            start_line,
            end_line,
        }
    }

    /// The namespace record for the current namespace, created on demand.
    fn namespace_record(&mut self) -> &mut NamespaceRecord {
        let name = self.context.namespace.clone();
        let idx = match self.namespace_index.get(&name) {
            Some(&idx) => idx,
            None => {
                self.unit.namespaces.push(NamespaceRecord {
                    name: name.clone(),
                    ..NamespaceRecord::default()
                });
                let idx = self.unit.namespaces.len() - 1;
                self.namespace_index.insert(name, idx);
                idx
            }
        };
        &mut self.unit.namespaces[idx]
    }

    pub(crate) fn push_type(&mut self, record: ClassRecord) {
        let name = record.name;
        self.namespace_record().types.push(name);
        self.unit.types.push(record);
    }

    pub(crate) fn push_function(&mut self, record: FunctionRecord) {
        let name = record.name;
        self.namespace_record().functions.push(name);
        self.unit.functions.push(record);
    }

    pub(crate) fn push_constant(&mut self, record: ConstantRecord) {
        let name = SymbolName::new(&record.qualified_name());
        self.namespace_record().constants.push(name);
        self.unit.constants.push(record);
    }

    pub(crate) fn add_alias(&mut self, kind: Option<Keyword>, alias: String, target: String) {
        let ctx = Arc::make_mut(&mut self.context);
        let map = match kind {
            Some(Keyword::Function) => &mut ctx.function_aliases,
            Some(Keyword::Const) => &mut ctx.constant_aliases,
            _ => &mut ctx.type_aliases,
        };
        map.insert(alias.clone(), target.clone());
        if kind.is_none() {
            self.namespace_record().aliases.insert(alias, target);
        }
    }

    /// Enter a namespace; imports do not carry over between namespaces.
    pub(crate) fn enter_namespace(&mut self, name: String) {
        self.context = Arc::new(NameContext {
            namespace: name,
            ..NameContext::default()
        });
        self.namespace_record();
    }

    /// Walk statements until end of input, or until the `}` closing the
    /// current namespace block when `in_block` is set.
    pub(crate) fn parse_statements(&mut self, in_block: bool) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            self.cursor.skip_whitespace();
            let Some(tok) = self.cursor.current() else {
                if in_block {
                    return Err(ParseError::UnexpectedEof {
                        construct: "namespace block",
                    });
                }
                return Ok(());
            };

            match tok.kind {
                TokenKind::DocComment => {
                    self.docs.observe(&tok.text);
                    self.cursor.advance();
                }
                TokenKind::Keyword(Keyword::Namespace) if self.is_namespace_declaration() => {
                    self.parse_namespace()?;
                }
                TokenKind::Keyword(Keyword::Use) if self.is_statement_start() => {
                    self.parse_use()?;
                }
                TokenKind::Keyword(
                    Keyword::Abstract
                    | Keyword::Final
                    | Keyword::Readonly
                    | Keyword::Class
                    | Keyword::Interface
                    | Keyword::Trait,
                ) if self.is_class_declaration() => {
                    self.parse_class()?;
                }
                TokenKind::Keyword(Keyword::Function) if self.is_function_declaration() => {
                    self.parse_function()?;
                }
                TokenKind::Keyword(Keyword::Const) if self.is_statement_start() => {
                    self.parse_global_constants()?;
                }
                TokenKind::Identifier
                    if tok.text.eq_ignore_ascii_case("define") && self.is_define_call() =>
                {
                    self.parse_define()?;
                }
                TokenKind::Keyword(Keyword::New)
                    if self.cursor.peek(1).is_some_and(|t| t.is_keyword(Keyword::Class)) =>
                {
                    self.skip_anonymous_class()?;
                }
                TokenKind::Keyword(Keyword::Enum) if self.is_enum_declaration() => {
                    self.skip_enum()?;
                }
                TokenKind::Punct if tok.text == "{" => {
                    depth += 1;
                    self.docs.clear_pending();
                    self.cursor.advance();
                }
                TokenKind::Punct if tok.text == "}" => {
                    self.docs.clear_pending();
                    self.cursor.advance();
                    if depth == 0 {
                        if in_block {
                            return Ok(());
                        }
                        return Err(ParseError::UnexpectedToken {
                            construct: "source unit",
                            found: "}".to_string(),
                            line: tok.line,
                        });
                    }
                    depth -= 1;
                }
                TokenKind::Punct if tok.text == ";" => {
                    self.docs.clear_pending();
                    self.cursor.advance();
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// `new class(...) extends A implements B { ... }` declares nothing.
    fn skip_anonymous_class(&mut self) -> Result<(), ParseError> {
        self.cursor.advance();
        self.cursor.skip_trivia();
        self.cursor.advance();
        self.skip_to_end_of_body("anonymous class")
    }

    /// Enums are not reflected, but their methods must not leak out as
    /// global functions.
    fn skip_enum(&mut self) -> Result<(), ParseError> {
        self.cursor.advance();
        self.skip_to_end_of_body("enum")
    }

    fn skip_to_end_of_body(&mut self, construct: &'static str) -> Result<(), ParseError> {
        self.docs.clear_pending();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.current() {
                None => return Err(ParseError::UnexpectedEof { construct }),
                Some(tok) if tok.is_punct("(") => self.cursor.skip_block()?,
                Some(tok) if tok.is_punct("{") => return self.cursor.skip_block(),
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    // ─── Declaration detection ──────────────────────────────────────────

    /// The previous significant token ends a statement (or there is none).
    fn is_statement_start(&self) -> bool {
        match self.cursor.previous_significant() {
            None => true,
            Some(prev) => match prev.kind {
                TokenKind::OpenTag | TokenKind::CloseTag | TokenKind::InlineHtml => true,
                TokenKind::Punct => matches!(prev.text.as_str(), ";" | "{" | "}" | ")" | "]")
                    && !self.follows_closure_signature(prev),
                _ => false,
            },
        }
    }

    /// `function () use ($x)` puts `use` right after `)`.
    fn follows_closure_signature(&self, prev: &Token) -> bool {
        prev.text == ")" && self.cursor.at_keyword(Keyword::Use)
    }

    fn is_namespace_declaration(&self) -> bool {
        // `namespace\foo()` is a relative name, not a declaration.
        !matches!(self.cursor.peek(1), Some(t) if t.kind == TokenKind::NsSeparator)
            && self.is_statement_start()
    }

    fn is_class_declaration(&self) -> bool {
        if let Some(prev) = self.cursor.previous_significant()
            && (prev.is_keyword(Keyword::New)
                || matches!(prev.text.as_str(), "::" | "->" | "?->"))
        {
            return false;
        }
        let mut n = 0;
        while let Some(tok) = self.cursor.peek(n) {
            match tok.kind {
                TokenKind::Keyword(Keyword::Abstract | Keyword::Final | Keyword::Readonly) => {
                    n += 1;
                }
                TokenKind::Keyword(Keyword::Class | Keyword::Interface | Keyword::Trait) => {
                    return self.cursor.peek(n + 1).is_some_and(Token::is_name);
                }
                _ => return false,
            }
        }
        false
    }

    fn is_enum_declaration(&self) -> bool {
        self.is_statement_start()
            && self
                .cursor
                .peek(1)
                .is_some_and(|t| t.kind == TokenKind::Identifier)
    }

    fn is_function_declaration(&self) -> bool {
        if let Some(prev) = self.cursor.previous_significant()
            && (matches!(prev.text.as_str(), "::" | "->" | "?->" | "=" | "(" | "," | "=>")
                || prev.is_keyword(Keyword::Use)
                || prev.is_keyword(Keyword::Static)
                || prev.is_keyword(Keyword::Fn))
        {
            return false;
        }
        match self.cursor.peek(1) {
            Some(t) if t.is_punct("&") => self.cursor.peek(2).is_some_and(Token::is_name),
            Some(t) => t.is_name(),
            None => false,
        }
    }

    fn is_define_call(&self) -> bool {
        let prev_ok = match self.cursor.previous_significant() {
            Some(prev) => !matches!(prev.text.as_str(), "::" | "->" | "?->" | "\\")
                && !prev.is_keyword(Keyword::Function),
            None => true,
        };
        prev_ok && self.cursor.peek(1).is_some_and(|t| t.is_punct("("))
    }
}
