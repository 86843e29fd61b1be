//! Generic IMAP syntax layer.
//!
//! Turns command trees into wire bytes and server lines into response
//! records. The engine modules only go through this interface.

mod lexer;
mod parser;
mod serialize;
mod tree;

pub use parser::{parse_attributes, parse_response};
pub use serialize::{Redacted, serialize_command};
pub use tree::{Attribute, Command, Partial, Response, ResponseTree};
