/// PHP tokenizer.
///
/// Lexing is delegated to `mago_syntax`; this module folds its token
/// stream into the flat `(kind, text, line)` sequence the element builders
/// consume.  Keywords are matched case-insensitively, exactly like PHP
/// does, and every token keeps its original spelling in `text`.
/// Qualified names are split into words and separators, and interpolated
/// strings, heredocs and nowdocs are reassembled into a single
/// [`TokenKind::String`] whose text is the literal's source slice.
///
/// Inline HTML outside `<?php ... ?>` is emitted as [`TokenKind::InlineHtml`]
/// so that line numbers stay correct.
use std::panic::{AssertUnwindSafe, catch_unwind};

use mago_database::file::FileId;
use mago_syntax::lexer::Lexer;
use mago_syntax::settings::LexerSettings;
use mago_syntax::token::TokenKind as Lexeme;
use mago_syntax_core::input::Input;

use crate::error::ParseError;

/// Reserved words the builders care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Abstract,
    Array,
    As,
    Callable,
    Class,
    Const,
    Enum,
    Extends,
    False,
    Final,
    Fn,
    Function,
    Implements,
    Insteadof,
    Interface,
    Namespace,
    New,
    Null,
    Private,
    Protected,
    Public,
    Readonly,
    Static,
    Trait,
    True,
    Use,
    Var,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        let kw = match word.to_ascii_lowercase().as_str() {
            "abstract" => Self::Abstract,
            "array" => Self::Array,
            "as" => Self::As,
            "callable" => Self::Callable,
            "class" => Self::Class,
            "const" => Self::Const,
            "enum" => Self::Enum,
            "extends" => Self::Extends,
            "false" => Self::False,
            "final" => Self::Final,
            "fn" => Self::Fn,
            "function" => Self::Function,
            "implements" => Self::Implements,
            "insteadof" => Self::Insteadof,
            "interface" => Self::Interface,
            "namespace" => Self::Namespace,
            "new" => Self::New,
            "null" => Self::Null,
            "private" => Self::Private,
            "protected" => Self::Protected,
            "public" => Self::Public,
            "readonly" => Self::Readonly,
            "static" => Self::Static,
            "trait" => Self::Trait,
            "true" => Self::True,
            "use" => Self::Use,
            "var" => Self::Var,
            _ => return None,
        };
        Some(kw)
    }

    /// Whether this keyword is a member modifier.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Abstract
                | Self::Final
                | Self::Private
                | Self::Protected
                | Self::Public
                | Self::Readonly
                | Self::Static
                | Self::Var
        )
    }
}

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    InlineHtml,
    OpenTag,
    CloseTag,
    Whitespace,
    Comment,
    DocComment,
    Variable,
    Identifier,
    Keyword(Keyword),
    NsSeparator,
    Integer,
    Float,
    /// Any quoted literal: single, double, backtick, heredoc or nowdoc.
    /// The text keeps its delimiters.
    String,
    /// Operators, punctuation and casts.
    Punct,
}

impl TokenKind {
    /// Whitespace and ordinary comments.  Doc comments are significant
    /// because builders attach them to the next declaration.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }
}

/// A single lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line the token starts on.
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Identifiers and keywords both qualify as member names
    /// (`function list()`, `Foo::class`).
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword(_))
    }
}

/// Tokenize a complete PHP source unit.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    catch_unwind(AssertUnwindSafe(|| scan(source))).unwrap_or_else(|_| {
        Err(ParseError::Lexer {
            message: "the lexer aborted".to_string(),
            line: 1,
        })
    })
}

fn scan(source: &str) -> Result<Vec<Token>, ParseError> {
    let input = Input::new(FileId::new("input.php"), source.as_bytes());
    let mut lexer = Lexer::new(input, LexerSettings::default());
    let mut folder = Folder::new();
    while let Some(next) = lexer.advance() {
        let lexeme = next.map_err(|e| ParseError::Lexer {
            message: e.to_string(),
            line: folder.line,
        })?;
        folder.push(lexeme.kind, lexeme.value);
    }
    folder.finish()
}

/// How a pending string literal ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    DoubleQuote,
    Backtick,
    Document,
}

struct PendingString {
    closer: Closer,
    text: String,
    line: usize,
}

/// Accumulates mago lexemes into builder tokens.
struct Folder {
    tokens: Vec<Token>,
    line: usize,
    inline: bool,
    string: Option<PendingString>,
}

impl Folder {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            line: 1,
            inline: true,
            string: None,
        }
    }

    fn push(&mut self, kind: Lexeme, value: &str) {
        let line = self.line;
        self.line += memchr::memchr_iter(b'\n', value.as_bytes()).count();

        if let Some(pending) = self.string.as_mut() {
            pending.text.push_str(value);
            let closed = match pending.closer {
                Closer::DoubleQuote => kind == Lexeme::DoubleQuote,
                Closer::Backtick => kind == Lexeme::Backtick,
                Closer::Document => kind == Lexeme::DocumentEnd,
            };
            if closed && let Some(done) = self.string.take() {
                self.tokens
                    .push(Token::new(TokenKind::String, done.text, done.line));
            }
            return;
        }

        let closer = match kind {
            Lexeme::DoubleQuote => Some(Closer::DoubleQuote),
            Lexeme::Backtick => Some(Closer::Backtick),
            Lexeme::DocumentStart(_) => Some(Closer::Document),
            _ => None,
        };
        if let Some(closer) = closer {
            self.string = Some(PendingString {
                closer,
                text: value.to_string(),
                line,
            });
            return;
        }

        match kind {
            Lexeme::DocBlockComment => self.emit(TokenKind::DocComment, value, line),
            Lexeme::LiteralInteger => self.emit(TokenKind::Integer, value, line),
            Lexeme::LiteralFloat => self.emit(TokenKind::Float, value, line),
            Lexeme::LiteralString => self.emit(TokenKind::String, value, line),
            _ => self.classify(value, line),
        }
    }

    /// Everything mago does not single out is classified by its spelling.
    fn classify(&mut self, value: &str, line: usize) {
        let bytes = value.as_bytes();
        if value.starts_with("<?") {
            self.inline = false;
            self.emit(TokenKind::OpenTag, value, line);
        } else if self.inline {
            self.emit(TokenKind::InlineHtml, value, line);
        } else if value.starts_with("?>") {
            self.inline = true;
            self.emit(TokenKind::CloseTag, value, line);
        } else if value == "#[" {
            self.emit(TokenKind::Punct, value, line);
        } else if value.starts_with("//") || value.starts_with('#') || value.starts_with("/*") {
            self.emit(TokenKind::Comment, value, line);
        } else if bytes.iter().all(u8::is_ascii_whitespace) {
            self.emit(TokenKind::Whitespace, value, line);
        } else if bytes[0] == b'$' && bytes.get(1).is_some_and(|&c| is_ident_start(c)) {
            self.emit(TokenKind::Variable, value, line);
        } else if (is_ident_start(bytes[0]) || bytes[0] == b'\\')
            && bytes.iter().all(|&c| is_ident_char(c) || c == b'\\')
        {
            self.split_name(value, line);
        } else if bytes.len() > 2 && bytes[0] == b'(' && bytes[bytes.len() - 1] == b')' {
            let cast: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            self.emit(TokenKind::Punct, cast, line);
        } else {
            self.emit(TokenKind::Punct, value, line);
        }
    }

    /// `Foo\Bar` and `\Foo` arrive as one lexeme; builders expect the
    /// words and separators apart.
    fn split_name(&mut self, value: &str, line: usize) {
        let mut rest = value;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('\\') {
                self.emit(TokenKind::NsSeparator, "\\", line);
                rest = after;
                continue;
            }
            let end = rest.find('\\').unwrap_or(rest.len());
            let word = &rest[..end];
            let kind = match Keyword::from_word(word) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Identifier,
            };
            self.emit(kind, word, line);
            rest = &rest[end..];
        }
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<String>, line: usize) {
        self.tokens.push(Token::new(kind, text, line));
    }

    fn finish(self) -> Result<Vec<Token>, ParseError> {
        match self.string {
            Some(pending) => Err(ParseError::Unterminated {
                what: "string literal",
                line: pending.line,
            }),
            None => Ok(self.tokens),
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80
}
