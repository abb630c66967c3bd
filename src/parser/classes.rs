/// Class, interface and trait builders.
///
/// Each class-like declaration is tagged with a [`ClassLikeKind`].  The
/// header (`abstract`/`final`/`readonly`, `extends`, `implements`) is read
/// first, then the body: trait uses with their optional adaptation block,
/// constants, properties and methods.  Ancestor names are resolved to
/// fully-qualified names against the import table at build time and
/// stored as names only.
use std::sync::Arc;

use crate::error::{ElementKind, ParseError};
use crate::lexer::{Keyword, TokenKind};
use crate::resolution::resolve_name;
use crate::types::*;
use crate::util::qualify;

use super::{DocState, UnitParser};

/// Members collected from a class body.
#[derive(Default)]
pub(crate) struct ClassBody {
    pub methods: Vec<Arc<MethodRecord>>,
    pub properties: Vec<Arc<PropertyRecord>>,
    pub constants: Vec<Arc<ConstantRecord>>,
    pub traits: Vec<SymbolName>,
    pub trait_aliases: Vec<TraitAlias>,
    pub trait_precedences: Vec<TraitPrecedence>,
}

impl ClassBody {
    fn check_unique(&self, kind: ElementKind, name: &str, line: usize) -> Result<(), ParseError> {
        let taken = match kind {
            ElementKind::Method => self.methods.iter().any(|m| m.name == name),
            ElementKind::Property => self.properties.iter().any(|p| p.name == name),
            _ => self.constants.iter().any(|c| c.name == name),
        };
        if taken {
            return Err(ParseError::Duplicate {
                kind,
                name: name.to_string(),
                line,
            });
        }
        Ok(())
    }

    pub(crate) fn add_method(&mut self, method: MethodRecord) -> Result<(), ParseError> {
        self.check_unique(ElementKind::Method, &method.name, method.span.start_line)?;
        self.methods.push(Arc::new(method));
        Ok(())
    }

    pub(crate) fn add_property(&mut self, property: PropertyRecord) -> Result<(), ParseError> {
        self.check_unique(ElementKind::Property, &property.name, property.span.start_line)?;
        self.properties.push(Arc::new(property));
        Ok(())
    }

    pub(crate) fn add_constant(&mut self, constant: ConstantRecord) -> Result<(), ParseError> {
        self.check_unique(ElementKind::Constant, &constant.name, constant.span.start_line)?;
        self.constants.push(Arc::new(constant));
        Ok(())
    }
}

/// The enclosing type a member builder works inside.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeScope {
    pub name: SymbolName,
    pub parent: Option<SymbolName>,
    pub kind: ClassLikeKind,
}

impl UnitParser<'_> {
    pub(crate) fn resolve_type_name(&self, raw: &str) -> SymbolName {
        resolve_name(raw, &self.context.type_aliases, &self.context.namespace)
    }

    /// Read a comma-separated list of type names.
    fn parse_name_list(&mut self, construct: &'static str) -> Result<Vec<SymbolName>, ParseError> {
        let mut names = Vec::new();
        loop {
            let Some(raw) = self.cursor.read_qualified_name() else {
                return Err(self.cursor.error_here(construct));
            };
            names.push(self.resolve_type_name(&raw));
            if !self.cursor.eat_punct(",") {
                return Ok(names);
            }
        }
    }

    /// Build one class-like declaration starting at its first modifier or
    /// keyword.
    pub(crate) fn parse_class(&mut self) -> Result<(), ParseError> {
        let line = self.cursor.line();
        let doc = self.docs.take();

        let mut modifiers = ClassModifiers::empty();
        let kind = loop {
            self.cursor.skip_trivia();
            let Some(tok) = self.cursor.advance() else {
                return Err(ParseError::UnexpectedEof {
                    construct: "class declaration",
                });
            };
            match tok.kind {
                TokenKind::Keyword(Keyword::Abstract) => {
                    modifiers |= ClassModifiers::EXPLICIT_ABSTRACT
                }
                TokenKind::Keyword(Keyword::Final) => modifiers |= ClassModifiers::FINAL,
                TokenKind::Keyword(Keyword::Readonly) => modifiers |= ClassModifiers::READONLY,
                TokenKind::Keyword(Keyword::Class) => break ClassLikeKind::Class,
                TokenKind::Keyword(Keyword::Interface) => break ClassLikeKind::Interface,
                TokenKind::Keyword(Keyword::Trait) => break ClassLikeKind::Trait,
                _ => return Err(self.cursor.unexpected(tok, "class declaration")),
            }
        };

        let short = self.cursor.expect_name("class name")?.text.clone();
        let name = SymbolName::new(&qualify(&self.context.namespace, &short));

        let record = self
            .parse_class_rest(name, kind, modifiers, doc, line)
            .map_err(|e| e.within(ElementKind::Class, name.as_str(), line))?;
        self.push_type(record);
        Ok(())
    }

    fn parse_class_rest(
        &mut self,
        name: SymbolName,
        kind: ClassLikeKind,
        modifiers: ClassModifiers,
        doc: Docblock,
        line: usize,
    ) -> Result<ClassRecord, ParseError> {
        let mut parent = None;
        let mut interfaces = Vec::new();

        if self.cursor.eat_keyword(Keyword::Extends) {
            let names = self.parse_name_list("extends clause")?;
            match kind {
                // Interfaces may extend several interfaces.
                ClassLikeKind::Interface => interfaces.extend(names),
                ClassLikeKind::Class if names.len() == 1 => parent = names.first().copied(),
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        construct: "extends clause",
                        found: names
                            .iter()
                            .map(SymbolName::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                        line,
                    });
                }
            }
        }
        if self.cursor.eat_keyword(Keyword::Implements) {
            if kind != ClassLikeKind::Class {
                return Err(ParseError::WrongContext {
                    construct: "implements clause",
                    expected: "class",
                    line: self.cursor.line(),
                });
            }
            interfaces.extend(self.parse_name_list("implements clause")?);
        }

        self.cursor.expect_punct("{", "class body")?;
        let scope = TypeScope { name, parent, kind };
        let body = self.parse_class_body(scope)?;
        let end_line = self
            .cursor
            .previous_significant()
            .map(|t| t.line)
            .unwrap_or(line);

        Ok(ClassRecord {
            name,
            kind,
            modifiers,
            parent,
            interfaces,
            traits: body.traits,
            trait_aliases: body.trait_aliases,
            trait_precedences: body.trait_precedences,
            methods: body.methods,
            properties: body.properties,
            constants: body.constants,
            doc,
            span: self.span(line, end_line),
            context: Arc::clone(&self.context),
        })
    }

    /// Parse members up to and including the closing `}`.
    ///
    /// The body keeps its own template stack: shared annotation blocks
    /// opened inside a class apply to that class's members only.
    fn parse_class_body(&mut self, scope: TypeScope) -> Result<ClassBody, ParseError> {
        let mut body = ClassBody::default();
        let mut docs = DocState::default();
        loop {
            self.cursor.skip_whitespace();
            let Some(tok) = self.cursor.current() else {
                return Err(ParseError::UnexpectedEof {
                    construct: "class body",
                });
            };
            match tok.kind {
                TokenKind::DocComment => {
                    docs.observe(&tok.text);
                    self.cursor.advance();
                }
                TokenKind::Punct if tok.text == "}" => {
                    self.cursor.advance();
                    return Ok(body);
                }
                TokenKind::Punct if tok.text == ";" => {
                    self.cursor.advance();
                }
                TokenKind::Punct if tok.text == "#[" => {
                    // Attributes sit between a doc comment and its member.
                    self.cursor.skip_block()?;
                }
                TokenKind::Keyword(Keyword::Use) => {
                    docs.clear_pending();
                    self.parse_trait_use(&mut body)?;
                }
                TokenKind::Keyword(kw) if kw.is_modifier() || kw == Keyword::Function
                    || kw == Keyword::Const =>
                {
                    let doc = docs.take();
                    self.parse_member(scope, doc, &mut body)?;
                }
                _ => return Err(self.cursor.unexpected(tok, "class body")),
            }
        }
    }

    /// `use A, B;` or `use A, B { A::foo insteadof B; B::foo as bar; }`.
    fn parse_trait_use(&mut self, body: &mut ClassBody) -> Result<(), ParseError> {
        self.cursor.advance();
        let traits = self.parse_name_list("trait use")?;
        body.traits.extend(traits);

        if self.cursor.eat_punct(";") {
            return Ok(());
        }
        self.cursor.expect_punct("{", "trait adaptation block")?;
        loop {
            if self.cursor.eat_punct("}") {
                return Ok(());
            }
            self.parse_trait_rule(body)?;
        }
    }

    fn parse_trait_rule(&mut self, body: &mut ClassBody) -> Result<(), ParseError> {
        let line = self.cursor.line();
        let Some(first) = self.cursor.read_qualified_name() else {
            return Err(self.cursor.error_here("trait adaptation"));
        };
        let (trait_name, method_name) = if self.cursor.eat_punct("::") {
            let method = self.cursor.expect_name("trait adaptation")?.text.clone();
            (Some(self.resolve_type_name(&first)), method)
        } else {
            (None, first)
        };

        if self.cursor.eat_keyword(Keyword::Insteadof) {
            let Some(trait_name) = trait_name else {
                return Err(ParseError::UnexpectedToken {
                    construct: "insteadof rule",
                    found: method_name,
                    line,
                });
            };
            let insteadof = self.parse_name_list("insteadof rule")?;
            body.trait_precedences.push(TraitPrecedence {
                trait_name,
                method_name,
                insteadof,
            });
        } else if self.cursor.eat_keyword(Keyword::As) {
            self.cursor.skip_trivia();
            let visibility = match self.cursor.current().map(|t| t.kind) {
                Some(TokenKind::Keyword(Keyword::Public)) => Some(Visibility::Public),
                Some(TokenKind::Keyword(Keyword::Protected)) => Some(Visibility::Protected),
                Some(TokenKind::Keyword(Keyword::Private)) => Some(Visibility::Private),
                _ => None,
            };
            if visibility.is_some() {
                self.cursor.advance();
            }
            self.cursor.skip_trivia();
            let alias = match self.cursor.current() {
                Some(tok) if tok.is_name() => {
                    self.cursor.advance();
                    Some(tok.text.clone())
                }
                _ => None,
            };
            if alias.is_none() && visibility.is_none() {
                return Err(self.cursor.error_here("trait alias"));
            }
            body.trait_aliases.push(TraitAlias {
                trait_name,
                method_name,
                alias,
                visibility,
            });
        } else {
            return Err(self.cursor.error_here("trait adaptation"));
        }
        self.cursor.expect_punct(";", "trait adaptation")?;
        Ok(())
    }
}
