//! Literal-record parser for diagram uploads.
//!
//! Uploads are plain text files holding a single literal value, written the
//! way one would write a Python dict literal:
//!
//! ```text
//! {
//!     "entities": {"User": ["id", "name"], "Order": ["id"]},
//!     # comments are allowed
//!     "relationships": [("User", "Order", "places", "One-to-Many")],
//! }
//! ```
//!
//! Supported: dicts, lists, tuples, single/double/triple-quoted strings
//! (with `r`/`u` prefixes and implicit concatenation), integers, floats,
//! `True`/`False`/`None`, trailing commas and `#` comments. JSON is a subset,
//! so `true`/`false`/`null` are accepted as well. Nothing is ever evaluated.

use crate::error::ErdError;
use std::fmt;

/// Maximum nesting depth accepted before the parser gives up.
const MAX_DEPTH: usize = 128;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    /// Key/value pairs in source order. Later duplicates overwrite the value
    /// of the first occurrence.
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Literal, Literal)]> {
        match self {
            Literal::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a string key in a dict.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::None => "None",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::List(_) => "list",
            Literal::Tuple(_) => "tuple",
            Literal::Dict(_) => "dict",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Literal::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Literal::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Parse a complete literal record.
pub fn parse(input: &str) -> Result<Literal, ErdError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia();
    if parser.at_end() {
        return Err(parser.error("empty input"));
    }
    let value = parser.parse_value(0)?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error(format!(
            "unexpected trailing content starting with {:?}",
            parser.peek().unwrap_or(' ')
        )));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        // A leading BOM is common in files saved by Windows editors.
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ErdError {
        let (line, column) = self.line_col(self.pos);
        ErdError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn line_col(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for &c in self.chars.iter().take(pos) {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    /// Skip whitespace, comments and explicit line continuations.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '\\' if self.peek_at(1) == Some('\n') => self.pos += 2,
                c if c.is_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ErdError> {
        self.skip_trivia();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Literal, ErdError> {
        if depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.parse_dict(depth),
            Some('[') => self.parse_list(depth),
            Some('(') => self.parse_paren(depth),
            Some('"') | Some('\'') => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_word(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn parse_dict(&mut self, depth: usize) -> Result<Literal, ErdError> {
        self.expect('{')?;
        let mut pairs: Vec<(Literal, Literal)> = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Literal::Dict(pairs));
            }
            let key = self.parse_value(depth + 1)?;
            if matches!(key, Literal::List(_) | Literal::Dict(_)) {
                return Err(self.error(format!("unhashable dict key of type {}", key.type_name())));
            }
            self.expect(':')?;
            let value = self.parse_value(depth + 1)?;
            match pairs.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key, value)),
            }
            if !self.comma_or_close('}')? {
                return Ok(Literal::Dict(pairs));
            }
        }
    }

    fn parse_list(&mut self, depth: usize) -> Result<Literal, ErdError> {
        self.expect('[')?;
        let items = self.parse_items(']', depth)?;
        Ok(Literal::List(items))
    }

    /// `()` is an empty tuple, `(x)` is just `x`, `(x,)` and `(x, y)` are tuples.
    fn parse_paren(&mut self, depth: usize) -> Result<Literal, ErdError> {
        self.expect('(')?;
        self.skip_trivia();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Literal::Tuple(Vec::new()));
        }
        let first = self.parse_value(depth + 1)?;
        self.skip_trivia();
        match self.peek() {
            Some(')') => {
                self.pos += 1;
                Ok(first)
            }
            Some(',') => {
                self.pos += 1;
                let mut items = vec![first];
                items.extend(self.parse_items(')', depth)?);
                Ok(Literal::Tuple(items))
            }
            Some(c) => Err(self.error(format!("expected ',' or ')', found '{c}'"))),
            None => Err(self.error("unclosed '('")),
        }
    }

    /// Parse comma-separated values up to and including `close`.
    fn parse_items(&mut self, close: char, depth: usize) -> Result<Vec<Literal>, ErdError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value(depth + 1)?);
            if !self.comma_or_close(close)? {
                return Ok(items);
            }
        }
    }

    /// After an element: `true` when a comma was consumed (more may follow),
    /// `false` when the closing delimiter was consumed.
    fn comma_or_close(&mut self, close: char) -> Result<bool, ErdError> {
        self.skip_trivia();
        match self.peek() {
            Some(',') => {
                self.pos += 1;
                Ok(true)
            }
            Some(c) if c == close => {
                self.pos += 1;
                Ok(false)
            }
            Some(c) => Err(self.error(format!("expected ',' or '{close}', found '{c}'"))),
            None => Err(self.error(format!("unclosed collection, expected '{close}'"))),
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<Literal, ErdError> {
        let mut out = self.parse_string(false)?;
        loop {
            let save = self.pos;
            self.skip_trivia();
            match self.peek() {
                Some('"') | Some('\'') => out.push_str(&self.parse_string(false)?),
                Some('r') | Some('R') if matches!(self.peek_at(1), Some('"') | Some('\'')) => {
                    self.pos += 1;
                    out.push_str(&self.parse_string(true)?);
                }
                _ => {
                    self.pos = save;
                    return Ok(Literal::Str(out));
                }
            }
        }
    }

    fn parse_string(&mut self, raw: bool) -> Result<String, ErdError> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                self.pos = start;
                return Err(self.error("unterminated string literal"));
            };
            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }
            if c == '\n' && !triple {
                self.pos = start;
                return Err(self.error("unterminated string literal"));
            }
            if c == '\\' {
                if raw {
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                    continue;
                }
                self.parse_escape(&mut out)?;
                continue;
            }
            out.push(c);
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ErdError> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated escape sequence"));
        };
        match c {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'v' => out.push('\u{0B}'),
            'x' => out.push(self.parse_hex_escape(2)?),
            'u' => out.push(self.parse_hex_escape(4)?),
            'U' => out.push(self.parse_hex_escape(8)?),
            other => {
                // Unknown escapes are kept verbatim.
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, ErdError> {
        let mut value: u32 = 0;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(format!("truncated \\x/\\u escape, expected {digits} hex digits")))?;
            value = value * 16 + d;
        }
        char::from_u32(value).ok_or_else(|| self.error(format!("invalid code point U+{value:X}")))
    }

    fn parse_number(&mut self) -> Result<Literal, ErdError> {
        let start = self.pos;
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            text.push(sign);
            self.pos += 1;
            self.skip_trivia();
        }

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.pos += 2;
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                } else if c != '_' {
                    break;
                }
                self.pos += 1;
            }
            // Sign and digits parse together so i64::MIN is reachable.
            text.push_str(&digits);
            return i64::from_str_radix(&text, 16).map(Literal::Int).map_err(|e| {
                self.pos = start;
                self.error(format!("invalid hex literal: {e}"))
            });
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    if let Some(sign @ ('-' | '+')) = self.peek_at(1) {
                        text.push(sign);
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        if !text.chars().any(|c| c.is_ascii_digit()) {
            self.pos = start;
            return Err(self.error("expected a number"));
        }

        if is_float {
            text.parse::<f64>().map(Literal::Float).map_err(|e| {
                self.pos = start;
                self.error(format!("invalid float literal '{text}': {e}"))
            })
        } else {
            text.parse::<i64>().map(Literal::Int).map_err(|e| {
                self.pos = start;
                self.error(format!("invalid integer literal '{text}': {e}"))
            })
        }
    }

    /// Keywords and prefixed strings.
    fn parse_word(&mut self) -> Result<Literal, ErdError> {
        let start = self.pos;
        if let (Some(p), Some('"' | '\'')) = (self.peek(), self.peek_at(1)) {
            match p {
                'r' | 'R' => {
                    self.pos += 1;
                    let mut s = self.parse_string(true)?;
                    if let Literal::Str(rest) = self.parse_strings_tail()? {
                        s.push_str(&rest);
                    }
                    return Ok(Literal::Str(s));
                }
                'u' | 'U' => {
                    self.pos += 1;
                    return self.parse_strings();
                }
                _ => {}
            }
        }

        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        match word.as_str() {
            "None" | "null" => Ok(Literal::None),
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            _ => {
                self.pos = start;
                Err(self.error(format!(
                    "malformed node or string: name '{word}' is not a literal"
                )))
            }
        }
    }

    /// Strings that follow a raw-prefixed string, for implicit concatenation.
    fn parse_strings_tail(&mut self) -> Result<Literal, ErdError> {
        let save = self.pos;
        self.skip_trivia();
        match self.peek() {
            Some('"' | '\'') => self.parse_strings(),
            Some('r' | 'R') if matches!(self.peek_at(1), Some('"' | '\'')) => {
                self.pos += 1;
                let mut s = self.parse_string(true)?;
                if let Literal::Str(rest) = self.parse_strings_tail()? {
                    s.push_str(&rest);
                }
                Ok(Literal::Str(s))
            }
            _ => {
                self.pos = save;
                Ok(Literal::Str(String::new()))
            }
        }
    }
}
