//! Modified UTF-7 mailbox name encoding.
//!
//! Printable US-ASCII passes through, `&` becomes `&-`, and every other run of
//! characters is written as UTF-16BE in base64 (with `,` in place of `/`)
//! between `&` and `-`.

use base64::Engine;
use base64::alphabet::IMAP_MUTF7;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::{Error, Result};

const MUTF7: GeneralPurpose = GeneralPurpose::new(
    &IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

const fn is_direct(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7e}')
}

/// Encodes a mailbox name into modified UTF-7.
///
/// ```
/// use postbox_imap::codec::encode_mailbox_name;
///
/// assert_eq!(
///     encode_mailbox_name("~peter/mail/台北/日本語"),
///     "~peter/mail/&U,BTFw-/&ZeVnLIqe-"
/// );
/// ```
#[must_use]
pub fn encode_mailbox_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u16> = Vec::new();

    for c in name.chars() {
        if is_direct(c) {
            flush_shifted(&mut out, &mut pending);
            if c == '&' {
                out.push_str("&-");
            } else {
                out.push(c);
            }
        } else {
            let mut units = [0u16; 2];
            pending.extend_from_slice(c.encode_utf16(&mut units));
        }
    }
    flush_shifted(&mut out, &mut pending);

    out
}

fn flush_shifted(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }
    let bytes: Vec<u8> = pending.iter().flat_map(|u| u.to_be_bytes()).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(bytes));
    out.push('-');
    pending.clear();
}

/// Decodes a modified UTF-7 mailbox name.
///
/// # Errors
///
/// Returns [`Error::Encoding`] if a shifted section is not valid base64 or
/// does not hold valid UTF-16.
pub fn decode_mailbox_name(name: &str) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let shifted = &rest[start + 1..];
        let Some(end) = shifted.find('-') else {
            return Err(Error::Encoding(format!(
                "unterminated shift sequence in {name:?}"
            )));
        };

        let encoded = &shifted[..end];
        if encoded.is_empty() {
            out.push('&');
        } else {
            let bytes = MUTF7
                .decode(encoded)
                .map_err(|e| Error::Encoding(format!("invalid modified base64: {e}")))?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            let decoded = String::from_utf16(&units)
                .map_err(|e| Error::Encoding(format!("invalid UTF-16 in mailbox name: {e}")))?;
            out.push_str(&decoded);
        }
        rest = &shifted[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rfc3501_example() {
        let encoded = encode_mailbox_name("~peter/mail/\u{53f0}\u{5317}/\u{65e5}\u{672c}\u{8a9e}");
        assert_eq!(encoded, "~peter/mail/&U,BTFw-/&ZeVnLIqe-");
        assert_eq!(
            decode_mailbox_name(&encoded).unwrap(),
            "~peter/mail/\u{53f0}\u{5317}/\u{65e5}\u{672c}\u{8a9e}"
        );
    }

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(encode_mailbox_name("INBOX/Sent Items"), "INBOX/Sent Items");
        assert_eq!(decode_mailbox_name("[Gmail]/Trash").unwrap(), "[Gmail]/Trash");
    }

    #[test]
    fn test_ampersand() {
        assert_eq!(encode_mailbox_name("Tom & Jerry"), "Tom &- Jerry");
        assert_eq!(decode_mailbox_name("Tom &- Jerry").unwrap(), "Tom & Jerry");
    }

    #[test]
    fn test_decode_german() {
        assert_eq!(decode_mailbox_name("Entw&APw-rfe").unwrap(), "Entwürfe");
        assert_eq!(encode_mailbox_name("Entwürfe"), "Entw&APw-rfe");
    }

    #[test]
    fn test_decode_unterminated() {
        assert!(decode_mailbox_name("broken&AGE").is_err());
    }

    proptest! {
        #[test]
        fn prop_encode_is_ascii_and_reversible(name in "\\PC{0,24}") {
            let encoded = encode_mailbox_name(&name);
            prop_assert!(encoded.bytes().all(|b| (0x20..=0x7e).contains(&b)));
            prop_assert_eq!(decode_mailbox_name(&encoded).unwrap(), name);
        }
    }
}
