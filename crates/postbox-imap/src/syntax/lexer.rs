//! Byte-level tokenizer for server responses and fetch item strings.

use crate::{Error, Result};

/// One lexical unit of an IMAP line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare word, including system flags such as `\Seen` and `\*`.
    Atom(&'a str),
    /// Unescaped contents of a `"..."` string.
    Quoted(String),
    /// Bytes of a `{n}` literal.
    Literal(Vec<u8>),
    /// All-digit atom that fits in 64 bits.
    Number(u64),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// A single space.
    Space,
    /// The `NIL` atom.
    Nil,
    /// End of line.
    Crlf,
    /// End of input.
    Eof,
}

/// Cursor over one response frame.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Starts at the beginning of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Rewinds (or advances) to a position previously returned by [`Self::position`].
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    /// Next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes `byte` if it is next.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes any run of spaces.
    pub fn skip_spaces(&mut self) {
        while self.eat(b' ') {}
    }

    /// Returns true once only an optional CRLF remains.
    #[must_use]
    pub fn at_line_end(&self) -> bool {
        matches!(&self.input[self.pos..], [] | [b'\r', b'\n', ..] | [b'\n', ..])
    }

    /// Reads everything up to the line end as lossy UTF-8 text.
    pub fn read_text(&mut self) -> String {
        let rest = &self.input[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(rest.len());
        self.pos += end;
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }

    /// Reads a run of ASCII digits.
    pub fn read_digits(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'\r' => {
                if self.input.get(self.pos + 1) == Some(&b'\n') {
                    self.pos += 2;
                    Ok(Token::Crlf)
                } else {
                    Err(self.error("expected LF after CR"))
                }
            }
            b'\n' => {
                self.advance();
                Ok(Token::Crlf)
            }
            b' ' => {
                self.advance();
                Ok(Token::Space)
            }
            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            b'[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            b']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            b'"' => self.read_quoted(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) || byte == b'*' => self.read_atom(),
            _ => Err(self.error(&format!("unexpected character {byte:#04x}"))),
        }
    }

    fn read_quoted(&mut self) -> Result<Token<'a>> {
        self.advance();
        let mut bytes = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(escaped) => bytes.push(escaped),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(b) => bytes.push(b),
            }
        }

        Ok(Token::Quoted(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance();
        let size = self
            .read_digits()
            .ok_or_else(|| self.error("invalid literal size"))?;
        // LITERAL+ / LITERAL- marker
        self.eat(b'+');
        self.eat(b'-');
        if !self.eat(b'}') {
            return Err(self.error("expected } after literal size"));
        }
        if !self.eat(b'\r') && self.peek() != Some(b'\n') {
            return Err(self.error("expected CRLF after literal size"));
        }
        if !self.eat(b'\n') {
            return Err(self.error("expected CRLF after literal size"));
        }

        let size = usize::try_from(size).map_err(|_| self.error("literal too large"))?;
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("incomplete literal data"))?;
        let data = self.input[self.pos..end].to_vec();
        self.pos = end;

        Ok(Token::Literal(data))
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        // `\*` in PERMANENTFLAGS, and the bare `*` wildcard
        self.eat(b'\\');
        self.eat(b'*');
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }

        let s = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8 in atom"))?;

        if s.eq_ignore_ascii_case("NIL") {
            return Ok(Token::Nil);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse() {
                return Ok(Token::Number(n));
            }
        }
        Ok(Token::Atom(s))
    }

    /// Reads an atom that starts with a bracketed run, such as `[Gmail]/Sent`.
    pub fn read_bracketed_atom(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while self.eat(b'[') {
            while let Some(b) = self.peek() {
                if b == b']' || b == b'\r' || b == b'\n' {
                    break;
                }
                self.pos += 1;
            }
            if !self.eat(b']') {
                return Err(self.error("unterminated bracket in atom"));
            }
            while self.peek().is_some_and(is_atom_char) {
                self.pos += 1;
            }
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8 in atom"))
    }

    /// Creates a parse error at the current position.
    pub fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }
}

/// Returns true if the byte may appear inside an atom.
///
/// `\` is accepted so flags lex as one token, and 8-bit bytes so UTF-8
/// atoms survive.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 | 0x23..=0x24 | 0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C..=0x7E |
        0x80..=0xFF
    )
}
