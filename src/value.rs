/// Constant-expression folding.
///
/// Default values and constant values are stored as token runs.  This
/// module folds the literal subset of PHP expressions into a
/// [`ConstValue`]: scalars, arrays, arithmetic, string concatenation,
/// bitwise and comparison operators, global and class constant references,
/// `X::class` and the magic constants.  Anything outside that subset (calls,
/// `new`, variables, interpolated strings) folds to
/// [`ConstValue::Expression`] holding the source text.
///
/// Constant references are followed through the [`Broker`].  A chain that
/// comes back to a constant already being evaluated raises
/// [`ResolutionError::InfiniteLoop`].
use std::fmt;

use serde::Serialize;

use crate::broker::Broker;
use crate::error::{ResolutionError, SymbolKind};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::parser::unquote;
use crate::resolution::{function_candidates, resolve_class_reference};
use crate::types::*;

/// A statically folded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered key/value pairs.
    Array(Vec<(ConstValue, ConstValue)>),
    /// Source text of an expression that could not be folded.
    Expression(String),
}

impl ConstValue {
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }

    /// PHP truthiness; `None` for unfolded expressions.
    pub fn truthy(&self) -> Option<bool> {
        Some(match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !(s.is_empty() || s == "0"),
            Self::Array(items) => !items.is_empty(),
            Self::Expression(_) => return None,
        })
    }

    /// String conversion as performed by `.`.
    fn to_php_string(&self) -> Option<String> {
        match self {
            Self::Null | Self::Bool(false) => Some(String::new()),
            Self::Bool(true) => Some("1".to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(format_float(*f)),
            Self::String(s) => Some(s.clone()),
            Self::Array(_) | Self::Expression(_) => None,
        }
    }

    fn to_number(&self) -> Option<Number> {
        match self {
            Self::Null | Self::Bool(false) => Some(Number::Int(0)),
            Self::Bool(true) => Some(Number::Int(1)),
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            Self::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Number::Int)
                    .or_else(|_| s.parse::<f64>().map(Number::Float))
                    .ok()
            }
            Self::Array(_) | Self::Expression(_) => None,
        }
    }

    /// Normalise an array key the way PHP does.
    fn to_key(&self) -> Option<ConstValue> {
        match self {
            Self::Int(_) => Some(self.clone()),
            Self::Bool(b) => Some(Self::Int(i64::from(*b))),
            Self::Null => Some(Self::String(String::new())),
            Self::Float(f) => Some(Self::Int(f.trunc() as i64)),
            Self::String(s) => match s.parse::<i64>() {
                Ok(i) if i.to_string() == *s => Some(Self::Int(i)),
                _ => Some(self.clone()),
            },
            Self::Array(_) | Self::Expression(_) => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, (k, v)) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                f.write_str("]")
            }
            Self::Expression(source) => f.write_str(source),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INF" } else { "-INF" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn into_value(self) -> ConstValue {
        match self {
            Self::Int(i) => ConstValue::Int(i),
            Self::Float(f) => ConstValue::Float(f),
        }
    }
}

/// Where an expression was written.
#[derive(Debug, Clone, Copy)]
pub struct EvalScope<'a> {
    pub context: &'a NameContext,
    /// Declaring type, for `self`, `parent`, `static` and `__CLASS__`.
    pub class: Option<SymbolName>,
    /// Enclosing function or method name.
    pub function: Option<&'a str>,
    pub file: Option<&'a str>,
    pub line: usize,
}

impl<'a> EvalScope<'a> {
    pub fn of_constant(record: &'a ConstantRecord) -> Self {
        Self {
            context: &record.context,
            class: record.declaring_type,
            function: None,
            file: record.span.file.as_deref(),
            line: record.span.start_line,
        }
    }
}

/// Literal source of a plain integer token (`0x1F`, `0b11`, `0o17`,
/// `017`, `1_000`).  Values beyond `i64` become floats.
pub(crate) fn parse_integer(text: &str) -> ConstValue {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex.to_string())
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin.to_string())
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct.to_string())
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, lower[1..].to_string())
    } else {
        (10, lower)
    };
    match i64::from_str_radix(&body, radix) {
        Ok(i) => ConstValue::Int(i),
        Err(_) => {
            let approx = body.chars().fold(0f64, |acc, c| {
                acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
            });
            ConstValue::Float(approx)
        }
    }
}

/// Body of a heredoc or nowdoc literal, with the closing indentation
/// removed.  Heredocs that interpolate yield `None`.
fn heredoc_body(text: &str) -> Option<String> {
    let rest = text.strip_prefix("<<<")?;
    let (header, body) = rest.split_once('\n')?;
    let header = header.trim();
    let nowdoc = header.starts_with('\'');
    let label = header.trim_matches(|c| c == '\'' || c == '"');
    let (content, closing) = body.rsplit_once('\n').unwrap_or(("", body));
    let indent = closing.len() - closing.trim_start().len();
    if !closing.trim_start().starts_with(label) {
        return None;
    }
    if !nowdoc && content.contains('$') {
        return None;
    }
    let lines: Vec<&str> = content
        .split('\n')
        .map(|line| line.get(indent..).unwrap_or(line.trim_start()))
        .collect();
    Some(lines.join("\n"))
}

const CASTS: &[(&str, Cast)] = &[
    ("(int)", Cast::Int),
    ("(integer)", Cast::Int),
    ("(bool)", Cast::Bool),
    ("(boolean)", Cast::Bool),
    ("(float)", Cast::Float),
    ("(double)", Cast::Float),
    ("(real)", Cast::Float),
    ("(string)", Cast::String),
    ("(binary)", Cast::String),
];

#[derive(Debug, Clone, Copy)]
enum Cast {
    Int,
    Bool,
    Float,
    String,
}

/// Binding power of a binary operator; right-associative operators are
/// flagged.
fn binary_power(op: &str) -> Option<(u8, bool)> {
    Some(match op {
        "??" => (1, true),
        "||" => (2, false),
        "&&" => (3, false),
        "|" => (4, false),
        "^" => (5, false),
        "&" => (6, false),
        "==" | "!=" | "===" | "!==" | "<>" => (7, false),
        "<" | ">" | "<=" | ">=" => (8, false),
        "." => (9, false),
        "<<" | ">>" => (10, false),
        "+" | "-" => (11, false),
        "*" | "/" | "%" => (12, false),
        "**" => (14, true),
        _ => return None,
    })
}

const PREFIX_POWER: u8 = 13;

type Fold = Result<Option<ConstValue>, ResolutionError>;

struct Evaluator<'e, 'a> {
    broker: &'e Broker,
    scope: EvalScope<'a>,
    tokens: &'a [Token],
    pos: usize,
    stack: &'e mut Vec<ElementKey>,
}

impl Broker {
    /// Fold `expr` written at `scope`.
    ///
    /// `key` names the constant being evaluated so that self-referencing
    /// chains are detected; defaults pass `None`.
    pub fn fold(
        &self,
        key: Option<ElementKey>,
        expr: &ValueExpr,
        scope: EvalScope<'_>,
        stack: &mut Vec<ElementKey>,
    ) -> Result<ConstValue, ResolutionError> {
        if let Some(key) = &key {
            if stack.contains(key) {
                let mut chain: Vec<String> = stack.iter().map(ToString::to_string).collect();
                chain.push(key.to_string());
                return Err(ResolutionError::InfiniteLoop { chain });
            }
            stack.push(key.clone());
        }
        let result = {
            let mut eval = Evaluator {
                broker: self,
                scope,
                tokens: &expr.tokens,
                pos: 0,
                stack: &mut *stack,
            };
            eval.expression(0).map(|v| v.filter(|_| eval.pos == eval.tokens.len()))
        };
        if key.is_some() {
            stack.pop();
        }
        Ok(result?.unwrap_or_else(|| ConstValue::Expression(expr.source.clone())))
    }

    /// Value of a global constant.
    pub fn constant_value(&self, name: &str) -> Result<ConstValue, ResolutionError> {
        let record = self.get_constant(name)?;
        let key = ElementKey::Constant(SymbolName::new(&record.qualified_name()));
        self.fold(
            Some(key),
            &record.value,
            EvalScope::of_constant(&record),
            &mut Vec::new(),
        )
    }

    /// Value of a class constant, own or inherited.
    pub fn class_constant_value(
        &self,
        class: &str,
        name: &str,
    ) -> Result<ConstValue, ResolutionError> {
        let view = self.compose(class)?;
        let constant = view.constant(name).ok_or_else(|| {
            ResolutionError::missing(SymbolKind::ClassConstant, format!("{}::{}", view.name, name))
        })?;
        let record = &constant.record;
        let owner = record.declaring_type.unwrap_or(view.name);
        self.fold(
            Some(ElementKey::ClassConstant(owner, name.to_string())),
            &record.value,
            EvalScope::of_constant(record),
            &mut Vec::new(),
        )
    }
}

impl Evaluator<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_punct(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(text))
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        if self.at_punct(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expression(&mut self, min_power: u8) -> Fold {
        let Some(mut lhs) = self.prefix()? else {
            return Ok(None);
        };
        loop {
            let Some(op) = self
                .peek()
                .filter(|t| t.kind == TokenKind::Punct)
                .map(|t| t.text.clone())
            else {
                break;
            };
            let Some((power, right_assoc)) = binary_power(&op) else {
                break;
            };
            if power < min_power || (power == min_power && !right_assoc) {
                break;
            }
            self.pos += 1;
            let next_min = if right_assoc { power } else { power + 1 };
            let Some(rhs) = self.expression(next_min)? else {
                return Ok(None);
            };
            let Some(value) = binary(&op, lhs, rhs) else {
                return Ok(None);
            };
            lhs = value;
        }
        Ok(Some(lhs))
    }

    fn prefix(&mut self) -> Fold {
        let Some(tok) = self.peek() else {
            return Ok(None);
        };
        if tok.kind == TokenKind::Punct {
            match tok.text.as_str() {
                "-" | "+" | "!" | "~" => {
                    let op = tok.text.clone();
                    self.pos += 1;
                    let Some(operand) = self.expression(PREFIX_POWER)? else {
                        return Ok(None);
                    };
                    return Ok(unary(&op, operand));
                }
                "(" => {
                    self.pos += 1;
                    let inner = self.expression(0)?;
                    if !self.eat_punct(")") {
                        return Ok(None);
                    }
                    return Ok(inner);
                }
                "[" => {
                    self.pos += 1;
                    return self.array("]");
                }
                text => {
                    if let Some((_, cast)) = CASTS.iter().find(|(t, _)| t.eq_ignore_ascii_case(text)) {
                        let cast = *cast;
                        self.pos += 1;
                        let Some(operand) = self.expression(PREFIX_POWER)? else {
                            return Ok(None);
                        };
                        return Ok(apply_cast(cast, operand));
                    }
                    return Ok(None);
                }
            }
        }
        self.primary()
    }

    fn primary(&mut self) -> Fold {
        let Some(tok) = self.peek() else {
            return Ok(None);
        };
        match tok.kind {
            TokenKind::Integer => {
                let value = parse_integer(&tok.text);
                self.pos += 1;
                Ok(Some(value))
            }
            TokenKind::Float => {
                let value = tok.text.replace('_', "").parse::<f64>().ok();
                self.pos += 1;
                Ok(value.map(ConstValue::Float))
            }
            TokenKind::String => {
                let value = unquote(&tok.text).or_else(|| heredoc_body(&tok.text));
                self.pos += 1;
                Ok(value.map(ConstValue::String))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.pos += 1;
                Ok(Some(ConstValue::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.pos += 1;
                Ok(Some(ConstValue::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.pos += 1;
                Ok(Some(ConstValue::Null))
            }
            TokenKind::Keyword(Keyword::Array)
                if self.peek_at(1).is_some_and(|t| t.is_punct("(")) =>
            {
                self.pos += 2;
                self.array(")")
            }
            TokenKind::Identifier
            | TokenKind::NsSeparator
            | TokenKind::Keyword(Keyword::Static) => self.reference(),
            _ => Ok(None),
        }
    }

    /// Array literal after its opening bracket, up to `close`.
    fn array(&mut self, close: &str) -> Fold {
        let mut items: Vec<(ConstValue, ConstValue)> = Vec::new();
        let mut next_index: i64 = 0;
        loop {
            if self.eat_punct(close) {
                return Ok(Some(ConstValue::Array(items)));
            }
            if self.at_punct("...") {
                return Ok(None);
            }
            let Some(first) = self.expression(0)? else {
                return Ok(None);
            };
            let (key, value) = if self.eat_punct("=>") {
                let Some(value) = self.expression(0)? else {
                    return Ok(None);
                };
                let Some(key) = first.to_key() else {
                    return Ok(None);
                };
                (key, value)
            } else {
                (ConstValue::Int(next_index), first)
            };
            if let ConstValue::Int(i) = key {
                next_index = next_index.max(i.saturating_add(1));
            }
            match items.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => items.push((key, value)),
            }
            if !self.eat_punct(",") {
                if self.eat_punct(close) {
                    return Ok(Some(ConstValue::Array(items)));
                }
                return Ok(None);
            }
        }
    }

    fn read_name(&mut self) -> Option<String> {
        let mut name = String::new();
        if self.peek().is_some_and(|t| t.kind == TokenKind::NsSeparator) {
            name.push('\\');
            self.pos += 1;
        }
        loop {
            let tok = self.peek()?;
            if !tok.is_name() {
                return None;
            }
            name.push_str(&tok.text);
            self.pos += 1;
            if self.peek().is_some_and(|t| t.kind == TokenKind::NsSeparator)
                && self.peek_at(1).is_some_and(Token::is_name)
            {
                name.push('\\');
                self.pos += 1;
            } else {
                return Some(name);
            }
        }
    }

    /// A constant, class constant or `X::class` reference.
    fn reference(&mut self) -> Fold {
        let Some(name) = self.read_name() else {
            return Ok(None);
        };
        if self.at_punct("(") {
            // Function call.
            return Ok(None);
        }
        if self.eat_punct("::") {
            let Some(member) = self.peek().filter(|t| t.is_name()).map(|t| t.text.clone()) else {
                return Ok(None);
            };
            self.pos += 1;
            if self.at_punct("(") {
                return Ok(None);
            }
            return self.class_constant(&name, &member);
        }
        self.constant(&name)
    }

    fn parent_of(&self, class: Option<SymbolName>) -> Option<SymbolName> {
        class
            .and_then(|c| self.broker.type_record(c))
            .and_then(|r| r.parent)
    }

    fn class_constant(&mut self, class: &str, member: &str) -> Fold {
        let ctx = self.scope.context;
        let Some(fqn) = resolve_class_reference(
            class,
            &ctx.type_aliases,
            &ctx.namespace,
            self.scope.class,
            self.parent_of(self.scope.class),
        ) else {
            return Ok(None);
        };
        if member.eq_ignore_ascii_case("class") {
            return Ok(Some(ConstValue::String(fqn.to_string())));
        }

        let view = match self.broker.compose(fqn.as_str()) {
            Ok(view) => view,
            Err(e) if e.is_does_not_exist() => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(constant) = view.constant(member) else {
            return Ok(None);
        };
        let record = &constant.record;
        let owner = record.declaring_type.unwrap_or(view.name);
        self.fold_record(ElementKey::ClassConstant(owner, member.to_string()), record)
    }

    fn fold_record(&mut self, key: ElementKey, record: &ConstantRecord) -> Fold {
        let value = self.broker.fold(
            Some(key),
            &record.value,
            EvalScope::of_constant(record),
            self.stack,
        )?;
        Ok(Some(value).filter(|v| !v.is_expression()))
    }

    fn constant(&mut self, name: &str) -> Fold {
        if let Some(value) = self.magic_constant(name) {
            return Ok(value);
        }
        let ctx = self.scope.context;
        for candidate in function_candidates(name, &ctx.constant_aliases, &ctx.namespace) {
            if let Ok(record) = self.broker.get_constant(candidate.as_str()) {
                return self.fold_record(ElementKey::Constant(candidate), &record);
            }
        }
        Ok(builtin_constant(name.trim_start_matches('\\')))
    }

    /// `Some(None)` for a magic constant that cannot be folded here.
    fn magic_constant(&self, name: &str) -> Option<Option<ConstValue>> {
        let upper = name.to_ascii_uppercase();
        let class = self.scope.class.map(|c| c.to_string()).unwrap_or_default();
        let function = self.scope.function.unwrap_or_default();
        let value = match upper.as_str() {
            "__CLASS__" => Some(ConstValue::String(class)),
            "__NAMESPACE__" => Some(ConstValue::String(self.scope.context.namespace.clone())),
            "__FUNCTION__" => Some(ConstValue::String(function.to_string())),
            "__METHOD__" => Some(ConstValue::String(if class.is_empty() {
                function.to_string()
            } else {
                format!("{class}::{function}")
            })),
            "__LINE__" => Some(ConstValue::Int(self.scope.line as i64)),
            "__FILE__" => self.scope.file.map(|f| ConstValue::String(f.to_string())),
            "__DIR__" => self.scope.file.map(|f| {
                let dir = std::path::Path::new(f)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ConstValue::String(dir)
            }),
            "__TRAIT__" | "__PROPERTY__" => None,
            _ => return None,
        };
        Some(value)
    }
}

/// A few engine constants that are safe to fold.
fn builtin_constant(name: &str) -> Option<ConstValue> {
    Some(match name {
        "PHP_EOL" => ConstValue::String("\n".to_string()),
        "PHP_INT_MAX" => ConstValue::Int(i64::MAX),
        "PHP_INT_MIN" => ConstValue::Int(i64::MIN),
        "PHP_INT_SIZE" => ConstValue::Int(8),
        "PHP_FLOAT_EPSILON" => ConstValue::Float(f64::EPSILON),
        "DIRECTORY_SEPARATOR" => ConstValue::String("/".to_string()),
        "PATH_SEPARATOR" => ConstValue::String(":".to_string()),
        "M_PI" => ConstValue::Float(std::f64::consts::PI),
        "M_E" => ConstValue::Float(std::f64::consts::E),
        "NAN" => ConstValue::Float(f64::NAN),
        "INF" => ConstValue::Float(f64::INFINITY),
        _ => return None,
    })
}

fn apply_cast(cast: Cast, value: ConstValue) -> Option<ConstValue> {
    match cast {
        Cast::Int => Some(ConstValue::Int(match value.to_number()? {
            Number::Int(i) => i,
            Number::Float(f) => f.trunc() as i64,
        })),
        Cast::Float => Some(ConstValue::Float(value.to_number()?.as_f64())),
        Cast::Bool => Some(ConstValue::Bool(value.truthy()?)),
        Cast::String => Some(ConstValue::String(value.to_php_string()?)),
    }
}

fn unary(op: &str, operand: ConstValue) -> Option<ConstValue> {
    match op {
        "!" => Some(ConstValue::Bool(!operand.truthy()?)),
        "+" => Some(operand.to_number()?.into_value()),
        "-" => Some(match operand.to_number()? {
            Number::Int(i) => match i.checked_neg() {
                Some(n) => ConstValue::Int(n),
                None => ConstValue::Float(-(i as f64)),
            },
            Number::Float(f) => ConstValue::Float(-f),
        }),
        "~" => match operand {
            ConstValue::Int(i) => Some(ConstValue::Int(!i)),
            _ => None,
        },
        _ => None,
    }
}

fn arithmetic(
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> ConstValue {
    if let (Number::Int(x), Number::Int(y)) = (a, b)
        && let Some(r) = int_op(x, y)
    {
        return ConstValue::Int(r);
    }
    ConstValue::Float(float_op(a.as_f64(), b.as_f64()))
}

fn binary(op: &str, lhs: ConstValue, rhs: ConstValue) -> Option<ConstValue> {
    if lhs.is_expression() || rhs.is_expression() {
        return None;
    }
    match op {
        "??" => Some(if lhs == ConstValue::Null { rhs } else { lhs }),
        "||" => Some(ConstValue::Bool(lhs.truthy()? || rhs.truthy()?)),
        "&&" => Some(ConstValue::Bool(lhs.truthy()? && rhs.truthy()?)),
        "." => Some(ConstValue::String(lhs.to_php_string()? + &rhs.to_php_string()?)),
        "+" => {
            if let (ConstValue::Array(mut left), ConstValue::Array(right)) = (lhs.clone(), rhs.clone()) {
                for (k, v) in right {
                    if !left.iter().any(|(lk, _)| *lk == k) {
                        left.push((k, v));
                    }
                }
                return Some(ConstValue::Array(left));
            }
            Some(arithmetic(lhs.to_number()?, rhs.to_number()?, i64::checked_add, |a, b| a + b))
        }
        "-" => Some(arithmetic(lhs.to_number()?, rhs.to_number()?, i64::checked_sub, |a, b| a - b)),
        "*" => Some(arithmetic(lhs.to_number()?, rhs.to_number()?, i64::checked_mul, |a, b| a * b)),
        "/" => {
            let (a, b) = (lhs.to_number()?, rhs.to_number()?);
            if b.as_f64() == 0.0 {
                return None;
            }
            Some(arithmetic(
                a,
                b,
                |x, y| if x % y == 0 { x.checked_div(y) } else { None },
                |x, y| x / y,
            ))
        }
        "%" => {
            let (ConstValue::Int(a), ConstValue::Int(b)) = (lhs, rhs) else {
                return None;
            };
            a.checked_rem(b).map(ConstValue::Int)
        }
        "**" => {
            let (a, b) = (lhs.to_number()?, rhs.to_number()?);
            if let (Number::Int(x), Number::Int(y)) = (a, b)
                && let Ok(exp) = u32::try_from(y)
                && let Some(r) = x.checked_pow(exp)
            {
                return Some(ConstValue::Int(r));
            }
            Some(ConstValue::Float(a.as_f64().powf(b.as_f64())))
        }
        "|" | "&" | "^" | "<<" | ">>" => {
            let (ConstValue::Int(a), ConstValue::Int(b)) = (lhs, rhs) else {
                return None;
            };
            Some(ConstValue::Int(match op {
                "|" => a | b,
                "&" => a & b,
                "^" => a ^ b,
                "<<" => a.checked_shl(u32::try_from(b).ok()?)?,
                _ => a.checked_shr(u32::try_from(b).ok()?)?,
            }))
        }
        "===" => Some(ConstValue::Bool(identical(&lhs, &rhs))),
        "!==" => Some(ConstValue::Bool(!identical(&lhs, &rhs))),
        "==" => Some(ConstValue::Bool(loose_equal(&lhs, &rhs)?)),
        "!=" | "<>" => Some(ConstValue::Bool(!loose_equal(&lhs, &rhs)?)),
        "<" | ">" | "<=" | ">=" => {
            let ordering = match (&lhs, &rhs) {
                (ConstValue::String(a), ConstValue::String(b)) => a.partial_cmp(b)?,
                _ => lhs
                    .to_number()?
                    .as_f64()
                    .partial_cmp(&rhs.to_number()?.as_f64())?,
            };
            Some(ConstValue::Bool(match op {
                "<" => ordering.is_lt(),
                ">" => ordering.is_gt(),
                "<=" => ordering.is_le(),
                _ => ordering.is_ge(),
            }))
        }
        _ => None,
    }
}

fn identical(a: &ConstValue, b: &ConstValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b) && a == b
}

/// Loose equality for the unambiguous cases only.
fn loose_equal(a: &ConstValue, b: &ConstValue) -> Option<bool> {
    match (a, b) {
        (ConstValue::Int(_) | ConstValue::Float(_), ConstValue::Int(_) | ConstValue::Float(_)) => {
            Some(a.to_number()?.as_f64() == b.to_number()?.as_f64())
        }
        _ if std::mem::discriminant(a) == std::mem::discriminant(b) => Some(a == b),
        (ConstValue::Null, other) | (other, ConstValue::Null) => Some(!other.truthy()?),
        (ConstValue::Bool(x), other) | (other, ConstValue::Bool(x)) => Some(*x == other.truthy()?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals() {
        assert_eq!(parse_integer("0x1F"), ConstValue::Int(31));
        assert_eq!(parse_integer("0b101"), ConstValue::Int(5));
        assert_eq!(parse_integer("017"), ConstValue::Int(15));
        assert_eq!(parse_integer("0o17"), ConstValue::Int(15));
        assert_eq!(parse_integer("1_000"), ConstValue::Int(1000));
        assert_eq!(parse_integer("0"), ConstValue::Int(0));
        assert!(matches!(
            parse_integer("9223372036854775808"),
            ConstValue::Float(_)
        ));
    }

    #[test]
    fn heredoc_strips_closing_indent() {
        let text = "<<<EOT\n    one\n      two\n    EOT";
        assert_eq!(heredoc_body(text).as_deref(), Some("one\n  two"));
        assert_eq!(heredoc_body("<<<EOT\nhi $x\nEOT"), None);
        assert_eq!(heredoc_body("<<<'EOT'\nhi $x\nEOT").as_deref(), Some("hi $x"));
    }

    #[test]
    fn display_is_php_like() {
        let value = ConstValue::Array(vec![
            (ConstValue::Int(0), ConstValue::String("a".into())),
            (ConstValue::String("k".into()), ConstValue::Bool(true)),
        ]);
        assert_eq!(value.to_string(), "[0 => 'a', 'k' => true]");
        assert_eq!(ConstValue::Float(2.0).to_string(), "2");
    }
}
