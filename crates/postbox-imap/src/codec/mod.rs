//! Wire-level encodings used by the engine.
//!
//! - [`utf7`]: modified UTF-7 for mailbox names (RFC 3501 section 5.1.3)
//! - [`xoauth2`]: SASL XOAUTH2 initial response
//! - [`date`]: `D-Mon-YYYY` search dates
//! - [`encoded_word`]: RFC 2047 header decoding for envelope and body metadata

pub mod date;
pub mod encoded_word;
pub mod utf7;
pub mod xoauth2;

pub use date::format_imap_date;
pub use encoded_word::decode_encoded_words;
pub use utf7::{decode_mailbox_name, encode_mailbox_name};
pub use xoauth2::build_xoauth2_token;
