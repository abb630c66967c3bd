/// Namespace declarations and `use` statements.
///
/// Builds the import table that every later declaration in the same
/// namespace resolves names against: short (imported) names mapped to
/// their fully-qualified targets, kept separately for classes, functions
/// and constants.
use crate::error::{ElementKind, ParseError};
use crate::lexer::{Keyword, TokenKind};
use crate::util::short_name;

use super::UnitParser;

impl UnitParser<'_> {
    /// `namespace Foo;`, `namespace Foo { ... }` or `namespace { ... }`.
    pub(crate) fn parse_namespace(&mut self) -> Result<(), ParseError> {
        let line = self.cursor.line();
        self.cursor.advance();
        self.docs.clear_pending();

        let name = self.cursor.read_qualified_name().unwrap_or_default();
        let name = name.trim_start_matches('\\').to_string();
        self.cursor.skip_trivia();

        if self.cursor.at_punct("{") {
            self.cursor.advance();
            self.enter_namespace(name.clone());
            self.parse_statements(true)
                .map_err(|e| e.within(ElementKind::Namespace, &name, line))?;
            self.enter_namespace(String::new());
            Ok(())
        } else if self.cursor.at_punct(";") && !name.is_empty() {
            self.cursor.advance();
            self.enter_namespace(name);
            Ok(())
        } else {
            Err(self
                .cursor
                .error_here("namespace declaration")
                .within(ElementKind::Namespace, name, line))
        }
    }

    /// `use [function|const] A\B [as C], ...;` and group form
    /// `use A\{B, function c, const D as E};`.
    pub(crate) fn parse_use(&mut self) -> Result<(), ParseError> {
        let line = self.cursor.line();
        self.cursor.advance();
        self.docs.clear_pending();
        self.parse_use_items()
            .map_err(|e| e.within(ElementKind::Use, "use", line))
    }

    fn parse_use_items(&mut self) -> Result<(), ParseError> {
        let statement_kind = self.eat_import_kind();
        loop {
            let Some(name) = self.cursor.read_qualified_name() else {
                return Err(self.cursor.error_here("use statement"));
            };
            let name = name.trim_start_matches('\\').to_string();
            self.cursor.skip_trivia();

            if self.cursor.at_kind(TokenKind::NsSeparator) {
                // Group use: `A\{...}`
                self.cursor.advance();
                self.cursor.expect_punct("{", "group use")?;
                self.parse_group_items(&name, statement_kind)?;
            } else {
                let alias = self.parse_alias()?;
                let alias = alias.unwrap_or_else(|| short_name(&name).to_string());
                self.add_alias(statement_kind, alias, name);
            }

            self.cursor.skip_trivia();
            if self.cursor.eat_punct(",") {
                continue;
            }
            self.cursor.expect_punct(";", "use statement")?;
            return Ok(());
        }
    }

    fn parse_group_items(
        &mut self,
        prefix: &str,
        statement_kind: Option<Keyword>,
    ) -> Result<(), ParseError> {
        loop {
            if self.cursor.eat_punct("}") {
                return Ok(());
            }
            let item_kind = self.eat_import_kind().or(statement_kind);
            let Some(name) = self.cursor.read_qualified_name() else {
                return Err(self.cursor.error_here("group use"));
            };
            let fqn = format!("{}\\{}", prefix, name);
            let alias = self.parse_alias()?;
            let alias = alias.unwrap_or_else(|| short_name(&fqn).to_string());
            self.add_alias(item_kind, alias, fqn);

            if !self.cursor.eat_punct(",") {
                self.cursor.expect_punct("}", "group use")?;
                return Ok(());
            }
        }
    }

    fn eat_import_kind(&mut self) -> Option<Keyword> {
        if self.cursor.eat_keyword(Keyword::Function) {
            Some(Keyword::Function)
        } else if self.cursor.eat_keyword(Keyword::Const) {
            Some(Keyword::Const)
        } else {
            None
        }
    }

    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.cursor.eat_keyword(Keyword::As) {
            let tok = self.cursor.expect_name("use alias")?;
            Ok(Some(tok.text.clone()))
        } else {
            Ok(None)
        }
    }
}
