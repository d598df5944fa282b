use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Parse error at position {0}: {1}")]
    ParseError(usize, String),
}

/// A KiCad S-expression node.
///
/// Bare symbols and numbers are `Atom`s, double-quoted strings are `Str`s.
/// The distinction only matters when writing a tree back out.
#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    Str(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(s: impl Into<String>) -> Self {
        SExp::Atom(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        SExp::Str(s.into())
    }

    /// Build `(tag args...)`.
    pub fn node(tag: &str, args: Vec<SExp>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(SExp::atom(tag));
        items.extend(args);
        SExp::List(items)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) | SExp::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExp>> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading symbol of a list, e.g. `footprint` for `(footprint ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|l| l.first())
            .and_then(|a| a.as_atom())
    }

    /// Child items after the tag.
    pub fn children(&self) -> &[SExp] {
        match self {
            SExp::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// Atom at `index`, counted after the tag.
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.children().get(index).and_then(|s| s.as_atom())
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.atom_at(index).and_then(|s| s.parse().ok())
    }

    /// First child list whose tag is `key`.
    pub fn find(&self, key: &str) -> Option<&SExp> {
        self.children().iter().find(|c| c.tag() == Some(key))
    }

    pub fn find_all(&self, key: &str) -> Vec<&SExp> {
        self.children()
            .iter()
            .filter(|c| c.tag() == Some(key))
            .collect()
    }

    /// Single value of a `(key value)` child.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(|n| n.atom_at(0))
    }

    /// True for a bare `flag` atom among the children or a `(flag yes)` child.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.children().iter().any(|c| match c {
            SExp::Atom(s) => s == flag,
            SExp::List(_) => c.tag() == Some(flag) && c.atom_at(0) != Some("no"),
            SExp::Str(_) => false,
        })
    }

    /// Render in KiCad's tab-indented layout.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        let items = match self {
            SExp::List(items) => items,
            other => {
                out.push_str(&other.to_string());
                return;
            }
        };

        let inline = self.to_string();
        let has_nested_lists = items
            .iter()
            .any(|i| i.as_list().is_some_and(|l| l.iter().any(|c| c.as_list().is_some())));
        if !has_nested_lists && inline.len() <= 90 {
            out.push_str(&inline);
            return;
        }

        out.push('(');
        let mut wrote_list = false;
        for (i, item) in items.iter().enumerate() {
            if item.as_list().is_some() {
                out.push('\n');
                out.push_str(&"\t".repeat(depth + 1));
                item.write_pretty(out, depth + 1);
                wrote_list = true;
            } else {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&item.to_string());
            }
        }
        if wrote_list {
            out.push('\n');
            out.push_str(&"\t".repeat(depth));
        }
        out.push(')');
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                // Symbols that would not survive a re-parse get quoted
                if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == '"') {
                    write!(f, "\"{}\"", escape(s))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::Str(s) => write!(f, "\"{}\"", escape(s)),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let sexp = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::ParseError(
                self.pos,
                "Trailing content after root expression".to_string(),
            ));
        }
        Ok(sexp)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::ParseError(self.pos, "Unbalanced ')'".to_string())),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        Ok(SExp::List(items))
    }

    fn parse_atom(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.peek() == '"' {
            self.parse_string()
        } else {
            self.parse_symbol()
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut s = String::new();
        let mut escaped = false;

        while !self.is_eof() {
            let ch = self.peek();

            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    _ => s.push(ch),
                }
                escaped = false;
                self.advance();
            } else if ch == '\\' {
                escaped = true;
                self.advance();
            } else if ch == '"' {
                self.advance();
                return Ok(SExp::Str(s));
            } else {
                s.push(ch);
                self.advance();
            }
        }

        Err(ParseError::ParseError(start, "Unterminated string".to_string()))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(ParseError::UnexpectedToken("empty symbol".to_string()))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!(
                "Expected '{}', found '{}'",
                expected, ch
            )))
        }
    }
}
