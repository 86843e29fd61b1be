//! RFC 2047 encoded-word decoding.
//!
//! Envelope subjects, address names and body-structure parameters may carry
//! `=?charset?B|Q?text?=` words. Whitespace between two adjacent encoded
//! words is not part of the text and is dropped.

use base64::Engine;
use base64::alphabet::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::Encoding;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes every encoded word in `input`.
///
/// Words that cannot be decoded (unknown charset, broken base64) are kept
/// verbatim, so this never fails.
///
/// ```
/// use postbox_imap::codec::decode_encoded_words;
///
/// assert_eq!(decode_encoded_words("=?UTF-8?B?aMOpbGxv?= world"), "héllo world");
/// ```
#[must_use]
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;

    while let Some((start, end, decoded)) = next_encoded_word(rest) {
        let between = &rest[..start];
        if !(after_word && between.chars().all(char::is_whitespace)) {
            out.push_str(between);
        }
        out.push_str(&decoded);
        rest = &rest[end..];
        after_word = true;
    }
    out.push_str(rest);

    out
}

/// Finds the next decodable word, returning its byte range and text.
fn next_encoded_word(text: &str) -> Option<(usize, usize, String)> {
    let mut offset = 0;
    while let Some(found) = text[offset..].find("=?") {
        let start = offset + found;
        if let Some((len, decoded)) = decode_word(&text[start..]) {
            return Some((start, start + len, decoded));
        }
        offset = start + 2;
    }
    None
}

/// Decodes a word at the start of `text`, returning its length and value.
fn decode_word(text: &str) -> Option<(usize, String)> {
    let body = text.strip_prefix("=?")?;

    let charset_end = body.find('?')?;
    let charset = &body[..charset_end];
    let after_charset = &body[charset_end + 1..];

    let mut chars = after_charset.chars();
    let encoding = chars.next()?.to_ascii_uppercase();
    if !encoding.is_ascii() || chars.next()? != '?' {
        return None;
    }
    let payload_and_rest = &after_charset[2..];
    let payload_end = payload_and_rest.find("?=")?;
    let payload = &payload_and_rest[..payload_end];

    if charset.is_empty()
        || charset.contains(char::is_whitespace)
        || payload.contains(char::is_whitespace)
    {
        return None;
    }

    let bytes = match encoding {
        'B' => LENIENT_BASE64.decode(payload).ok()?,
        'Q' => decode_q(payload),
        _ => return None,
    };

    // RFC 2231 allows a language suffix: charset*lang
    let label = charset.split('*').next().unwrap_or(charset);
    let encoding = Encoding::for_label(label.as_bytes())?;
    let (decoded, _, _) = encoding.decode(&bytes);

    let len = 2 + charset_end + 1 + 2 + payload_end + 2;
    Some((len, decoded.into_owned()))
}

fn decode_q(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'='),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_q_words() {
        let input = "=?ISO-8859-1?Q?BBR_Handel,_Gewerbe,_B=FCrobetriebe,?= =?ISO-8859-1?Q?_private_Bildungseinrichtungen.txt?=";
        assert_eq!(
            decode_encoded_words(input),
            "BBR Handel, Gewerbe, Bürobetriebe, private Bildungseinrichtungen.txt"
        );
    }

    #[test]
    fn test_base64_word() {
        assert_eq!(decode_encoded_words("=?utf-8?b?SGVsbG8gV29ybGQ=?="), "Hello World");
        // Missing padding is tolerated
        assert_eq!(decode_encoded_words("=?utf-8?B?SGVsbG8gV29ybGQ?="), "Hello World");
    }

    #[test]
    fn test_plain_text_around_words() {
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?Q?caf=C3=A9?= tonight"),
            "Re: café tonight"
        );
    }

    #[test]
    fn test_undecodable_word_kept() {
        assert_eq!(
            decode_encoded_words("=?x-unknown-charset?Q?abc?="),
            "=?x-unknown-charset?Q?abc?="
        );
        assert_eq!(decode_encoded_words("a =? b"), "a =? b");
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(decode_encoded_words("=?US-ASCII*EN?Q?Keith_Moore?="), "Keith Moore");
    }
}
