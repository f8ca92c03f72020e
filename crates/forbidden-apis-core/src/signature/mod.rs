//! Signature model and text grammar.

mod glob;
mod model;
mod parser;

pub use glob::ClassGlob;
pub use model::{OwnerPattern, Signature, SignatureKind};
pub use parser::{parse_signatures, Entry, ParseErrorKind, SignatureParseError};
