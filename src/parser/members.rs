/// Property and constant builders.
///
/// A class member starts with its modifier keywords in any order, then is
/// one of: a method (`function`), a constant list (`const`), or a property
/// list (`$a = 1, $b`).  Global constants come from top-level `const` and
/// from `define('NAME', value)` calls.
use std::sync::Arc;

use crate::error::{ElementKind, ParseError};
use crate::lexer::{Keyword, TokenKind};
use crate::types::*;
use crate::util::strip_sigil;

use super::UnitParser;
use super::classes::{ClassBody, TypeScope};
use super::functions::value_expr;

const VISIBILITY_BITS: MemberModifiers = MemberModifiers::PUBLIC
    .union(MemberModifiers::PROTECTED)
    .union(MemberModifiers::PRIVATE);

impl UnitParser<'_> {
    /// Build one member declaration inside a class body.
    pub(crate) fn parse_member(
        &mut self,
        scope: TypeScope,
        doc: Docblock,
        body: &mut ClassBody,
    ) -> Result<(), ParseError> {
        let line = self.cursor.line();
        let mut modifiers = MemberModifiers::empty();
        let mut has_var = false;

        loop {
            self.cursor.skip_trivia();
            let Some(tok) = self.cursor.current() else {
                return Err(ParseError::UnexpectedEof {
                    construct: "class member",
                });
            };
            let bit = match tok.kind {
                TokenKind::Keyword(Keyword::Public) => MemberModifiers::PUBLIC,
                TokenKind::Keyword(Keyword::Protected) => MemberModifiers::PROTECTED,
                TokenKind::Keyword(Keyword::Private) => MemberModifiers::PRIVATE,
                TokenKind::Keyword(Keyword::Static) => MemberModifiers::STATIC,
                TokenKind::Keyword(Keyword::Abstract) => MemberModifiers::ABSTRACT,
                TokenKind::Keyword(Keyword::Final) => MemberModifiers::FINAL,
                TokenKind::Keyword(Keyword::Readonly) => MemberModifiers::READONLY,
                TokenKind::Keyword(Keyword::Var) => {
                    has_var = true;
                    self.cursor.advance();
                    continue;
                }
                _ => break,
            };
            if modifiers.contains(bit)
                || (bit.intersects(VISIBILITY_BITS) && modifiers.intersects(VISIBILITY_BITS))
            {
                return Err(self.cursor.unexpected(tok, "member modifiers"));
            }
            modifiers |= bit;
            self.cursor.advance();
        }

        if self.cursor.at_keyword(Keyword::Function) {
            let method = self.parse_method(scope, modifiers, doc, line)?;
            if method.name.eq_ignore_ascii_case("__construct") {
                self.promote_parameters(scope, &method, body)?;
            }
            return body.add_method(method);
        }
        if self.cursor.at_keyword(Keyword::Const) {
            return self.parse_class_constants(scope, modifiers, doc, body);
        }
        if modifiers.is_empty() && !has_var {
            return Err(self.cursor.error_here("class member"));
        }
        if scope.kind == ClassLikeKind::Interface {
            return Err(ParseError::WrongContext {
                construct: "property declaration",
                expected: "class or trait",
                line,
            });
        }
        self.parse_properties(scope, modifiers, doc, body)
    }

    /// `[type] $a [= expr], $b [= expr];`
    ///
    /// Siblings in one declaration share its modifiers.  A declaration
    /// carrying only `var`, `static` or `readonly` is public.
    fn parse_properties(
        &mut self,
        scope: TypeScope,
        modifiers: MemberModifiers,
        doc: Docblock,
        body: &mut ClassBody,
    ) -> Result<(), ParseError> {
        let mut modifiers = modifiers;
        if !modifiers.intersects(VISIBILITY_BITS) {
            modifiers |= MemberModifiers::PUBLIC;
        }

        self.cursor.skip_trivia();
        let type_hint = if self.cursor.at_kind(TokenKind::Variable) {
            None
        } else {
            let tokens = self.cursor.collect_until(&[";", ",", "="], "property type")?;
            let typed: Vec<_> = tokens
                .iter()
                .take_while(|t| t.kind != TokenKind::Variable)
                .cloned()
                .collect();
            // Rewind to the variable so the sibling loop sees it.
            let consumed = tokens.len() - typed.len();
            self.cursor.seek(self.cursor.position() - consumed);
            Some(crate::cursor::source_text(&typed).trim().to_string())
        };

        let templates = doc.templates.clone();
        let mut doc = Some(doc);
        loop {
            self.cursor.skip_trivia();
            let line = self.cursor.line();
            let Some(tok) = self.cursor.current() else {
                return Err(ParseError::UnexpectedEof {
                    construct: "property declaration",
                });
            };
            if tok.kind != TokenKind::Variable {
                return Err(self.cursor.unexpected(tok, "property declaration"));
            }
            self.cursor.advance();
            let name = strip_sigil(&tok.text).to_string();

            let default = if self.cursor.eat_punct("=") {
                self.cursor.skip_trivia();
                let tokens = self
                    .cursor
                    .collect_until(&[",", ";"], "property default")
                    .map_err(|e| e.within(ElementKind::Property, &name, line))?;
                Some(value_expr(tokens))
            } else {
                None
            };

            let record = PropertyRecord {
                name,
                declaring_type: scope.name,
                declaring_trait: None,
                modifiers,
                type_hint: type_hint.clone(),
                default,
                promoted: false,
                // Later siblings keep the shared annotation blocks only.
                doc: doc.take().unwrap_or_else(|| Docblock {
                    comment: None,
                    templates: templates.clone(),
                }),
                span: self.span(line, self.cursor.line()),
                context: Arc::clone(&self.context),
            };
            body.add_property(record)?;

            if self.cursor.eat_punct(",") {
                continue;
            }
            self.cursor.expect_punct(";", "property declaration")?;
            return Ok(());
        }
    }

    /// Constructor parameters with a visibility become properties.
    fn promote_parameters(
        &mut self,
        scope: TypeScope,
        method: &MethodRecord,
        body: &mut ClassBody,
    ) -> Result<(), ParseError> {
        for param in &method.parameters {
            let Some(visibility) = param.promoted else {
                continue;
            };
            body.add_property(PropertyRecord {
                name: param.name.clone(),
                declaring_type: scope.name,
                declaring_trait: None,
                modifiers: visibility.as_modifier(),
                type_hint: param.type_hint.clone(),
                default: None,
                promoted: true,
                doc: Docblock::default(),
                span: self.span(param.line, param.line),
                context: Arc::clone(&self.context),
            })?;
        }
        Ok(())
    }

    /// `[visibility] const [type] A = 1, B = 2;` inside a class body.
    fn parse_class_constants(
        &mut self,
        scope: TypeScope,
        modifiers: MemberModifiers,
        doc: Docblock,
        body: &mut ClassBody,
    ) -> Result<(), ParseError> {
        if modifiers.intersects(
            MemberModifiers::STATIC | MemberModifiers::ABSTRACT | MemberModifiers::READONLY,
        ) {
            return Err(self.cursor.error_here("class constant"));
        }
        let mut modifiers = modifiers;
        if !modifiers.intersects(VISIBILITY_BITS) {
            modifiers |= MemberModifiers::PUBLIC;
        }
        self.cursor.advance();

        let mut doc = Some(doc);
        for (name, value, line) in self.parse_constant_list("class constant")? {
            body.add_constant(ConstantRecord {
                name,
                declaring_type: Some(scope.name),
                declaring_trait: None,
                modifiers,
                value,
                via_define: false,
                doc: doc.take().unwrap_or_default(),
                span: self.span(line, line),
                context: Arc::clone(&self.context),
            })?;
        }
        Ok(())
    }

    /// `const A = 1, B = 2;` at the top level.
    pub(crate) fn parse_global_constants(&mut self) -> Result<(), ParseError> {
        self.cursor.advance();
        let mut doc = Some(self.docs.take());
        for (name, value, line) in self.parse_constant_list("constant")? {
            let record = ConstantRecord {
                name,
                declaring_type: None,
                declaring_trait: None,
                modifiers: MemberModifiers::PUBLIC,
                value,
                via_define: false,
                doc: doc.take().unwrap_or_default(),
                span: self.span(line, line),
                context: Arc::clone(&self.context),
            };
            self.push_constant(record);
        }
        Ok(())
    }

    /// Read `NAME = expr` items up to and including the closing `;`.  A
    /// type before the name (`const int A = 1`) is skipped.
    fn parse_constant_list(
        &mut self,
        construct: &'static str,
    ) -> Result<Vec<(String, ValueExpr, usize)>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.cursor.skip_trivia();
            let line = self.cursor.line();
            // In `const int A = 1` the last name before `=` is the constant.
            let mut name = None;
            loop {
                self.cursor.skip_trivia();
                let Some(tok) = self.cursor.current() else {
                    return Err(ParseError::UnexpectedEof { construct });
                };
                match tok.kind {
                    TokenKind::Punct if tok.text == "=" => break,
                    TokenKind::Identifier | TokenKind::Keyword(_) => name = Some(tok.text.clone()),
                    TokenKind::NsSeparator => {}
                    TokenKind::Punct if matches!(tok.text.as_str(), "?" | "|" | "&" | "(" | ")") => {}
                    _ => return Err(self.cursor.unexpected(tok, construct)),
                }
                self.cursor.advance();
            }
            let Some(name) = name else {
                return Err(self.cursor.error_here(construct));
            };
            self.cursor.advance();
            self.cursor.skip_trivia();
            let tokens = self
                .cursor
                .collect_until(&[",", ";"], "constant value")
                .map_err(|e| e.within(ElementKind::Constant, &name, line))?;
            if tokens.is_empty() {
                return Err(self
                    .cursor
                    .error_here("constant value")
                    .within(ElementKind::Constant, name, line));
            }
            items.push((name, value_expr(tokens), line));

            if self.cursor.eat_punct(",") {
                continue;
            }
            self.cursor.expect_punct(";", construct)?;
            return Ok(items);
        }
    }

    /// `define('NAME', expr);`
    ///
    /// Calls whose first argument is not a string literal are left alone.
    pub(crate) fn parse_define(&mut self) -> Result<(), ParseError> {
        let line = self.cursor.line();
        let start = self.cursor.position();
        self.cursor.advance();
        self.cursor.expect_punct("(", "define()")?;
        self.cursor.skip_trivia();

        let name = match self.cursor.current() {
            Some(tok) if tok.kind == TokenKind::String => unquote(&tok.text),
            _ => None,
        };
        let Some(name) = name else {
            self.cursor.seek(start + 1);
            self.docs.clear_pending();
            return Ok(());
        };
        self.cursor.advance();
        self.cursor.expect_punct(",", "define()")?;
        self.cursor.skip_trivia();
        let tokens = self
            .cursor
            .collect_until(&[",", ")"], "constant value")
            .map_err(|e| e.within(ElementKind::Constant, &name, line))?;
        let value = value_expr(tokens);
        // Skip an optional third argument.
        if self.cursor.eat_punct(",") {
            self.cursor.collect_until(&[")"], "define()")?;
        }
        self.cursor.expect_punct(")", "define()")?;

        let record = ConstantRecord {
            name: name.trim_start_matches('\\').to_string(),
            declaring_type: None,
            declaring_trait: None,
            modifiers: MemberModifiers::PUBLIC,
            value,
            via_define: true,
            doc: self.docs.take(),
            span: self.span(line, line),
            context: Arc::clone(&self.context),
        };
        self.push_constant(record);
        Ok(())
    }
}

/// Strip quotes from a plain string literal; interpolated strings yield
/// `None`.
pub(crate) fn unquote(literal: &str) -> Option<String> {
    let bytes = literal.as_bytes();
    let quote = *bytes.first()?;
    if bytes.len() < 2 || !matches!(quote, b'\'' | b'"') {
        return None;
    }
    let inner = literal.get(1..literal.len() - 1)?;
    match quote {
        b'\'' if bytes[bytes.len() - 1] == b'\'' => {
            Some(inner.replace("\\'", "'").replace("\\\\", "\\"))
        }
        b'"' if bytes[bytes.len() - 1] == b'"' && !inner.contains('$') => Some(
            inner
                .replace("\\\"", "\"")
                .replace("\\n", "\n")
                .replace("\\t", "\t")
                .replace("\\$", "$")
                .replace("\\\\", "\\"),
        ),
        _ => None,
    }
}
