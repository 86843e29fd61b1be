//! Response-line parser.

use super::lexer::{Lexer, Token};
use super::tree::{Attribute, Partial, Response};
use crate::Result;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Close {
    Line,
    Paren,
    Bracket,
}

/// Parses one complete server frame (including literals) into a [`Response`].
///
/// # Errors
///
/// Returns [`crate::Error::Parse`] when the frame is not valid response syntax.
pub fn parse_response(frame: &[u8]) -> Result<Response> {
    let mut lexer = Lexer::new(frame);
    let mut response = Response {
        tag: match lexer.next_token()? {
            Token::Atom(tag) => tag.to_string(),
            Token::Number(n) => n.to_string(),
            token => return Err(lexer.error(&format!("expected tag, got {token:?}"))),
        },
        ..Response::default()
    };

    if response.is_continuation() {
        lexer.eat(b' ');
        let text = lexer.read_text();
        if !text.is_empty() {
            response.human_readable = Some(text);
        }
        return Ok(response);
    }

    if !lexer.eat(b' ') {
        return Err(lexer.error("expected space after tag"));
    }

    let mut token = lexer.next_token()?;
    if let Token::Number(n) = token {
        response.nr = Some(u32::try_from(n).map_err(|_| lexer.error("message number overflow"))?);
        if !lexer.eat(b' ') {
            return Err(lexer.error("expected space after message number"));
        }
        token = lexer.next_token()?;
    }
    response.command = match token {
        Token::Atom(name) => name.to_ascii_uppercase(),
        token => return Err(lexer.error(&format!("expected response type, got {token:?}"))),
    };

    if lexer.at_line_end() {
        return Ok(response);
    }
    lexer.eat(b' ');

    if response.is_status() {
        parse_status_tail(&mut lexer, &mut response);
    } else {
        response.attributes = parse_sequence(&mut lexer, Close::Line)?;
    }

    Ok(response)
}

/// Parses attribute text such as a FETCH item (`body[header.fields (date)]`).
///
/// # Errors
///
/// Returns [`crate::Error::Parse`] if the text is not valid attribute syntax.
pub fn parse_attributes(text: &str) -> Result<Vec<Attribute>> {
    let mut lexer = Lexer::new(text.as_bytes());
    parse_sequence(&mut lexer, Close::Line)
}

/// Optional `[CODE args]` then free text. A malformed code is kept as text.
fn parse_status_tail(lexer: &mut Lexer<'_>, response: &mut Response) {
    if lexer.peek() == Some(b'[') {
        let start = lexer.position();
        match parse_code(lexer) {
            Ok((code, args)) => {
                response.code = Some(code);
                response.code_args = args;
                lexer.skip_spaces();
            }
            Err(_) => lexer.seek(start),
        }
    }

    let text = lexer.read_text();
    if !text.is_empty() {
        response.human_readable = Some(text);
    }
}

fn parse_code(lexer: &mut Lexer<'_>) -> Result<(String, Vec<Attribute>)> {
    lexer.eat(b'[');
    let code = match lexer.next_token()? {
        Token::Atom(name) => name.to_ascii_uppercase(),
        token => return Err(lexer.error(&format!("expected response code, got {token:?}"))),
    };
    let args = if lexer.eat(b']') {
        Vec::new()
    } else if lexer.eat(b' ') {
        parse_sequence(lexer, Close::Bracket)?
    } else {
        return Err(lexer.error("expected ] after response code"));
    };
    Ok((code, args))
}

fn parse_sequence(lexer: &mut Lexer<'_>, close: Close) -> Result<Vec<Attribute>> {
    let mut items = Vec::new();

    loop {
        lexer.skip_spaces();
        if lexer.at_line_end() {
            if close == Close::Line {
                return Ok(items);
            }
            return Err(lexer.error("unexpected end of line"));
        }
        match (lexer.peek(), close) {
            (Some(b')'), Close::Paren) | (Some(b']'), Close::Bracket) => {
                lexer.next_token()?;
                return Ok(items);
            }
            _ => {}
        }
        items.push(parse_attribute(lexer)?);
    }
}

fn parse_attribute(lexer: &mut Lexer<'_>) -> Result<Attribute> {
    if lexer.peek() == Some(b'[') {
        return Ok(Attribute::atom(lexer.read_bracketed_atom()?));
    }

    match lexer.next_token()? {
        Token::Atom(value) => {
            let section = if lexer.eat(b'[') {
                Some(parse_sequence(lexer, Close::Bracket)?)
            } else {
                None
            };
            let partial = if section.is_some() && lexer.eat(b'<') {
                Some(parse_partial(lexer)?)
            } else {
                None
            };
            Ok(Attribute::Atom {
                value: value.to_string(),
                section,
                partial,
            })
        }
        Token::Quoted(s) => Ok(Attribute::String(s)),
        Token::Literal(bytes) => Ok(Attribute::Literal(bytes)),
        Token::Number(n) => Ok(Attribute::Number(n)),
        Token::Nil => Ok(Attribute::Nil),
        Token::LParen => Ok(Attribute::List(parse_sequence(lexer, Close::Paren)?)),
        token => Err(lexer.error(&format!("unexpected {token:?}"))),
    }
}

fn parse_partial(lexer: &mut Lexer<'_>) -> Result<Partial> {
    let start = lexer
        .read_digits()
        .ok_or_else(|| lexer.error("expected partial start"))?;
    let length = if lexer.eat(b'.') {
        Some(
            lexer
                .read_digits()
                .ok_or_else(|| lexer.error("expected partial length"))?,
        )
    } else {
        None
    };
    if !lexer.eat(b'>') {
        return Err(lexer.error("expected > after partial"));
    }
    Ok(Partial { start, length })
}
