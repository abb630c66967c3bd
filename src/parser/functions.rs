/// Function, method and parameter builders.
///
/// Functions and methods share one signature builder: optional `&`, the
/// name, the parameter list, an optional return type and either a body
/// (skipped as a balanced block) or `;` for abstract and interface
/// methods.
use std::sync::Arc;

use crate::cursor::source_text;
use crate::error::{ElementKind, ParseError};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::resolution::resolve_class_reference;
use crate::types::*;
use crate::util::{qualify, strip_sigil};

use super::UnitParser;
use super::classes::TypeScope;

/// Scalar and pseudo types that never name a class.
const BUILTIN_TYPES: &[&str] = &[
    "int", "float", "string", "bool", "iterable", "object", "mixed", "void", "null", "false",
    "true", "never", "static",
];

/// A parsed function-like signature.
pub(crate) struct Signature {
    pub name: String,
    pub line: usize,
    pub end_line: usize,
    pub parameters: Vec<ParameterRecord>,
    pub returns_reference: bool,
    pub return_type: Option<String>,
    pub has_body: bool,
}

impl UnitParser<'_> {
    /// Top-level `function name(...) { ... }`.
    pub(crate) fn parse_function(&mut self) -> Result<(), ParseError> {
        let line = self.cursor.line();
        let doc = self.docs.take();
        let sig = self.parse_signature(None, "function")?;
        let name = SymbolName::new(&qualify(&self.context.namespace, &sig.name));
        if !sig.has_body {
            return Err(ParseError::UnexpectedToken {
                construct: "function body",
                found: ";".to_string(),
                line: sig.end_line,
            }
            .within(ElementKind::Function, name.as_str(), line));
        }
        let record = FunctionRecord {
            name,
            parameters: sig.parameters,
            returns_reference: sig.returns_reference,
            return_type: sig.return_type,
            doc,
            span: self.span(line, sig.end_line),
            context: Arc::clone(&self.context),
        };
        self.push_function(record);
        Ok(())
    }

    /// A method inside a class body; the cursor is on `function`.
    pub(crate) fn parse_method(
        &mut self,
        scope: TypeScope,
        modifiers: MemberModifiers,
        doc: Docblock,
        line: usize,
    ) -> Result<MethodRecord, ParseError> {
        let sig = self.parse_signature(Some(scope), "method")?;

        let is_abstract =
            modifiers.contains(MemberModifiers::ABSTRACT) || scope.kind == ClassLikeKind::Interface;
        if is_abstract == sig.has_body {
            let found = if sig.has_body { "{" } else { ";" };
            return Err(ParseError::UnexpectedToken {
                construct: "method body",
                found: found.to_string(),
                line: sig.end_line,
            }
            .within(ElementKind::Method, &sig.name, line));
        }

        let mut modifiers = modifiers;
        if scope.kind == ClassLikeKind::Interface {
            modifiers |= MemberModifiers::ABSTRACT;
        }
        if !modifiers.intersects(
            MemberModifiers::PUBLIC | MemberModifiers::PROTECTED | MemberModifiers::PRIVATE,
        ) {
            modifiers |= MemberModifiers::PUBLIC;
        }

        Ok(MethodRecord {
            name: sig.name,
            declaring_type: scope.name,
            declaring_trait: None,
            original_name: None,
            modifiers,
            parameters: sig.parameters,
            returns_reference: sig.returns_reference,
            return_type: sig.return_type,
            doc,
            span: self.span(line, sig.end_line),
            context: Arc::clone(&self.context),
        })
    }

    fn parse_signature(
        &mut self,
        scope: Option<TypeScope>,
        construct: &'static str,
    ) -> Result<Signature, ParseError> {
        let line = self.cursor.line();
        if !self.cursor.eat_keyword(Keyword::Function) {
            return Err(self.cursor.error_here(construct));
        }
        let returns_reference = self.cursor.eat_punct("&");
        let name = self.cursor.expect_name(construct)?.text.clone();
        let kind = if scope.is_some() {
            ElementKind::Method
        } else {
            ElementKind::Function
        };

        self.parse_signature_rest(name.clone(), scope, returns_reference, line)
            .map_err(|e| e.within(kind, name, line))
    }

    fn parse_signature_rest(
        &mut self,
        name: String,
        scope: Option<TypeScope>,
        returns_reference: bool,
        line: usize,
    ) -> Result<Signature, ParseError> {
        self.cursor.expect_punct("(", "parameter list")?;
        let parameters = self.parse_parameters(&name, scope)?;

        let return_type = if self.cursor.eat_punct(":") {
            self.cursor.skip_trivia();
            let tokens = self.cursor.collect_until(&["{", ";"], "return type")?;
            Some(source_text(tokens))
        } else {
            None
        };

        self.cursor.skip_trivia();
        let has_body = if self.cursor.at_punct("{") {
            self.cursor.skip_block()?;
            true
        } else {
            self.cursor.expect_punct(";", "function body")?;
            false
        };
        let end_line = self
            .cursor
            .previous_significant()
            .map(|t| t.line)
            .unwrap_or(line);

        Ok(Signature {
            name,
            line,
            end_line,
            parameters,
            returns_reference,
            return_type,
            has_body,
        })
    }

    /// Parse parameters after the opening `(` up to and including `)`.
    fn parse_parameters(
        &mut self,
        function: &str,
        scope: Option<TypeScope>,
    ) -> Result<Vec<ParameterRecord>, ParseError> {
        let mut params = Vec::new();
        loop {
            self.cursor.skip_trivia();
            if self.cursor.eat_punct(")") {
                return Ok(params);
            }
            let position = params.len();
            let param = self.parse_parameter(function, scope, position).map_err(|e| {
                e.within(
                    ElementKind::Parameter,
                    format!("#{position}"),
                    self.cursor.line(),
                )
            })?;
            params.push(param);

            if !self.cursor.eat_punct(",") {
                self.cursor.expect_punct(")", "parameter list")?;
                return Ok(params);
            }
        }
    }

    fn parse_parameter(
        &mut self,
        function: &str,
        scope: Option<TypeScope>,
        position: usize,
    ) -> Result<ParameterRecord, ParseError> {
        let line = self.cursor.line();
        let mut promoted = None;
        let mut type_tokens: Vec<&Token> = Vec::new();
        let mut is_reference = false;
        let mut is_variadic = false;

        let name = loop {
            self.cursor.skip_trivia();
            let Some(tok) = self.cursor.current() else {
                return Err(ParseError::UnexpectedEof {
                    construct: "parameter",
                });
            };
            match tok.kind {
                TokenKind::Variable => {
                    self.cursor.advance();
                    break strip_sigil(&tok.text).to_string();
                }
                TokenKind::Punct if tok.text == "#[" => self.cursor.skip_block()?,
                TokenKind::Keyword(Keyword::Public) => {
                    promoted = Some(Visibility::Public);
                    self.cursor.advance();
                }
                TokenKind::Keyword(Keyword::Protected) => {
                    promoted = Some(Visibility::Protected);
                    self.cursor.advance();
                }
                TokenKind::Keyword(Keyword::Private) => {
                    promoted = Some(Visibility::Private);
                    self.cursor.advance();
                }
                TokenKind::Keyword(Keyword::Readonly) => {
                    promoted.get_or_insert(Visibility::Public);
                    self.cursor.advance();
                }
                TokenKind::Punct if tok.text == "..." => {
                    is_variadic = true;
                    self.cursor.advance();
                }
                TokenKind::Punct if tok.text == "&" => {
                    // `A&B $x` is an intersection; `A &$x` is by-reference.
                    let next = self.cursor.peek(1);
                    if next.is_some_and(|t| t.kind == TokenKind::Variable || t.is_punct("...")) {
                        is_reference = true;
                    } else {
                        type_tokens.push(tok);
                    }
                    self.cursor.advance();
                }
                TokenKind::Identifier
                | TokenKind::Keyword(_)
                | TokenKind::NsSeparator => {
                    type_tokens.push(tok);
                    self.cursor.advance();
                }
                TokenKind::Punct if matches!(tok.text.as_str(), "?" | "|" | "(" | ")") => {
                    type_tokens.push(tok);
                    self.cursor.advance();
                }
                _ => return Err(self.cursor.unexpected(tok, "parameter")),
            }
        };

        let default = if self.cursor.eat_punct("=") {
            self.cursor.skip_trivia();
            let tokens = self.cursor.collect_until(&[",", ")"], "default value")?;
            if tokens.is_empty() {
                return Err(self.cursor.error_here("default value"));
            }
            Some(value_expr(tokens))
        } else {
            None
        };

        let type_hint = if type_tokens.is_empty() {
            None
        } else {
            Some(type_tokens.iter().map(|t| t.text.as_str()).collect::<String>())
        };
        let (constraint, nullable_hint) = self.constraint_for(type_hint.as_deref(), scope);
        let null_default = default
            .as_ref()
            .is_some_and(|d| d.source.eq_ignore_ascii_case("null"));

        Ok(ParameterRecord {
            position,
            name,
            type_hint,
            constraint,
            allows_null: nullable_hint || null_default,
            is_reference,
            is_variadic,
            default,
            function: function.to_string(),
            declaring_type: scope.map(|s| s.name),
            promoted,
            line,
        })
    }

    /// Classify a type hint; the flag reports whether it admits `null`.
    fn constraint_for(
        &self,
        hint: Option<&str>,
        scope: Option<TypeScope>,
    ) -> (TypeConstraint, bool) {
        let Some(hint) = hint else {
            return (TypeConstraint::None, true);
        };
        let (nullable, bare) = match hint.strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (false, hint),
        };
        if bare.contains(['|', '&', '(']) {
            let admits_null = bare
                .split(['|', '&', '(', ')'])
                .any(|part| part.eq_ignore_ascii_case("null") || part.eq_ignore_ascii_case("mixed"));
            return (TypeConstraint::Composite(hint.to_string()), admits_null);
        }
        let lower = bare.to_ascii_lowercase();
        match lower.as_str() {
            "array" => (TypeConstraint::Array, nullable),
            "callable" => (TypeConstraint::Callable, nullable),
            "mixed" | "null" => (TypeConstraint::Builtin(lower), true),
            l if BUILTIN_TYPES.contains(&l) => (TypeConstraint::Builtin(lower), nullable),
            _ => {
                let resolved = resolve_class_reference(
                    bare,
                    &self.context.type_aliases,
                    &self.context.namespace,
                    scope.map(|s| s.name),
                    scope.and_then(|s| s.parent),
                );
                match resolved {
                    Some(name) => (TypeConstraint::Class(name), nullable),
                    None => (TypeConstraint::Composite(hint.to_string()), nullable),
                }
            }
        }
    }
}

/// Capture a run of tokens as an unevaluated expression.
pub(crate) fn value_expr(tokens: &[Token]) -> ValueExpr {
    ValueExpr {
        source: source_text(tokens).trim().to_string(),
        tokens: tokens
            .iter()
            .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::DocComment)
            .cloned()
            .collect(),
    }
}
