/// Positional, lookahead-capable navigation over a token slice.
///
/// The builders never index the token slice directly; they move a
/// [`TokenCursor`] forward and use its bracket-matching and depth-aware
/// scanning primitives so that default-value expressions containing
/// nested parentheses, brackets or braces are consumed as one unit.
use crate::error::ParseError;
use crate::lexer::{Keyword, Token, TokenKind};

#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn tokens(&self) -> &'t [Token] {
        self.tokens
    }

    /// Line of the current token, or of the last token at end of input.
    pub fn line(&self) -> usize {
        self.current()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    /// Return the current token and move past it.
    pub fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    /// Skip whitespace and ordinary comments.  Doc comments stop the skip.
    pub fn skip_whitespace(&mut self) -> &mut Self {
        while self.current().is_some_and(|t| t.kind.is_trivia()) {
            self.pos += 1;
        }
        self
    }

    /// Skip whitespace, comments and doc comments alike.
    pub fn skip_trivia(&mut self) -> &mut Self {
        while self
            .current()
            .is_some_and(|t| t.kind.is_trivia() || t.kind == TokenKind::DocComment)
        {
            self.pos += 1;
        }
        self
    }

    /// Index of the `n`-th significant token at or after the current one.
    fn significant_index(&self, n: usize) -> Option<usize> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia() && t.kind != TokenKind::DocComment)
            .nth(n)
            .map(|(i, _)| self.pos + i)
    }

    /// The `n`-th significant token ahead without moving (0 = the next one).
    pub fn peek(&self, n: usize) -> Option<&'t Token> {
        self.significant_index(n).map(|i| &self.tokens[i])
    }

    /// The closest significant token before the current position.
    pub fn previous_significant(&self) -> Option<&'t Token> {
        self.tokens[..self.pos.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|t| !t.kind.is_trivia() && t.kind != TokenKind::DocComment)
    }

    pub fn at_punct(&self, text: &str) -> bool {
        self.current().is_some_and(|t| t.is_punct(text))
    }

    pub fn at_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn at_kind(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    /// Skip trivia, then consume the punctuation `text` if present.
    pub fn eat_punct(&mut self, text: &str) -> bool {
        self.skip_trivia();
        if self.at_punct(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip trivia, then consume `keyword` if present.
    pub fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.skip_trivia();
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip trivia and require the punctuation `text`.
    pub fn expect_punct(
        &mut self,
        text: &str,
        construct: &'static str,
    ) -> Result<&'t Token, ParseError> {
        self.skip_trivia();
        match self.current() {
            Some(tok) if tok.is_punct(text) => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(self.unexpected(tok, construct)),
            None => Err(ParseError::UnexpectedEof { construct }),
        }
    }

    /// Skip trivia and require an identifier or keyword; returns its text.
    pub fn expect_name(&mut self, construct: &'static str) -> Result<&'t Token, ParseError> {
        self.skip_trivia();
        match self.current() {
            Some(tok) if tok.is_name() => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(self.unexpected(tok, construct)),
            None => Err(ParseError::UnexpectedEof { construct }),
        }
    }

    pub fn unexpected(&self, tok: &Token, construct: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            construct,
            found: tok.text.clone(),
            line: tok.line,
        }
    }

    /// Error for the current position: unexpected token or end of input.
    pub fn error_here(&self, construct: &'static str) -> ParseError {
        match self.current() {
            Some(tok) => self.unexpected(tok, construct),
            None => ParseError::UnexpectedEof { construct },
        }
    }

    /// Read a possibly qualified name (`Foo`, `Foo\Bar`, `\Foo\Bar`) at the
    /// current significant position.  Returns `None` without moving when
    /// no name starts here.
    pub fn read_qualified_name(&mut self) -> Option<String> {
        self.skip_trivia();
        let start = self.pos;
        let mut name = String::new();
        if self.at_kind(TokenKind::NsSeparator) {
            name.push('\\');
            self.pos += 1;
        }
        loop {
            match self.current() {
                Some(tok) if tok.is_name() => {
                    name.push_str(&tok.text);
                    self.pos += 1;
                }
                _ => break,
            }
            if self.at_kind(TokenKind::NsSeparator)
                && self.tokens.get(self.pos + 1).is_some_and(Token::is_name)
            {
                name.push('\\');
                self.pos += 1;
            } else {
                break;
            }
        }
        if name.is_empty() || name == "\\" {
            self.pos = start;
            None
        } else {
            Some(name)
        }
    }

    /// Given the current token is an opening bracket, return the index of
    /// its matching closer.
    pub fn find_matching_bracket(&self) -> Result<usize, ParseError> {
        let Some(open) = self.current() else {
            return Err(ParseError::UnexpectedEof {
                construct: "bracketed block",
            });
        };
        if closer_for(&open.text).is_none() || open.kind != TokenKind::Punct {
            return Err(self.unexpected(open, "bracketed block"));
        }
        let mut stack: Vec<&str> = Vec::new();
        for (i, tok) in self.tokens[self.pos..].iter().enumerate() {
            if tok.kind != TokenKind::Punct {
                continue;
            }
            if let Some(close) = closer_for(&tok.text) {
                stack.push(close);
            } else if is_closer(&tok.text) {
                if stack.pop() != Some(tok.text.as_str()) {
                    return Err(self.unexpected(tok, "bracketed block"));
                }
                if stack.is_empty() {
                    return Ok(self.pos + i);
                }
            }
        }
        Err(ParseError::Unterminated {
            what: "bracketed block",
            line: open.line,
        })
    }

    /// Skip from an opening bracket to just past its matching closer.
    pub fn skip_block(&mut self) -> Result<(), ParseError> {
        let close = self.find_matching_bracket()?;
        self.pos = close + 1;
        Ok(())
    }

    /// Consume tokens up to (not including) the first of `terminators`
    /// found at bracket depth zero.  Nested `()`, `[]`, `{}` and `#[...]`
    /// groups are consumed whole.  Returns the consumed slice.
    pub fn collect_until(
        &mut self,
        terminators: &[&str],
        what: &'static str,
    ) -> Result<&'t [Token], ParseError> {
        let start = self.pos;
        let start_line = self.line();
        while let Some(tok) = self.current() {
            if tok.kind == TokenKind::Punct {
                if terminators.contains(&tok.text.as_str()) {
                    return Ok(&self.tokens[start..self.pos]);
                }
                if closer_for(&tok.text).is_some() {
                    self.skip_block()?;
                    continue;
                }
                if is_closer(&tok.text) {
                    return Err(self.unexpected(tok, what));
                }
            }
            self.pos += 1;
        }
        Err(ParseError::Unterminated {
            what,
            line: start_line,
        })
    }
}

fn closer_for(open: &str) -> Option<&'static str> {
    match open {
        "(" => Some(")"),
        "[" | "#[" => Some("]"),
        "{" => Some("}"),
        _ => None,
    }
}

fn is_closer(text: &str) -> bool {
    matches!(text, ")" | "]" | "}")
}

/// Compact source text for a token run: trivia collapses to one space,
/// ordinary comments are dropped.
pub fn source_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    for tok in tokens {
        match tok.kind {
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment => {
                pending_space = !out.is_empty();
            }
            _ => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push_str(&tok.text);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn matching_bracket_handles_nesting() {
        let toks = tokenize("<?php f(a, [1, (2)], {3}) ;").unwrap();
        let mut cursor = TokenCursor::new(&toks);
        while !cursor.at_punct("(") {
            cursor.advance();
        }
        let close = cursor.find_matching_bracket().unwrap();
        assert_eq!(toks[close].text, ")");
        assert!(toks[close + 1..].iter().any(|t| t.text == ";"));
    }

    #[test]
    fn collect_until_is_depth_aware() {
        let toks = tokenize("<?php array(1, 2), $next)").unwrap();
        let mut cursor = TokenCursor::new(&toks);
        cursor.advance();
        cursor.skip_trivia();
        let taken = cursor.collect_until(&[",", ")"], "default value").unwrap();
        assert_eq!(source_text(taken), "array(1, 2)");
        assert!(cursor.at_punct(","));
    }

    #[test]
    fn unterminated_scan_reports_error() {
        let toks = tokenize("<?php (1, 2").unwrap();
        let mut cursor = TokenCursor::new(&toks);
        cursor.advance();
        cursor.skip_trivia();
        assert!(matches!(
            cursor.collect_until(&[";"], "default value"),
            Err(ParseError::Unterminated { .. })
        ));
    }

    #[test]
    fn qualified_names() {
        let toks = tokenize("<?php \\Foo\\Bar\\Baz $x").unwrap();
        let mut cursor = TokenCursor::new(&toks);
        cursor.advance();
        assert_eq!(cursor.read_qualified_name().as_deref(), Some("\\Foo\\Bar\\Baz"));
        assert_eq!(cursor.peek(0).unwrap().text, "$x");
    }
}
