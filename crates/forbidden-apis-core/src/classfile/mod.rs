//! JVM class-file parsing.
//!
//! Only the structural records the checker needs are decoded: the constant
//! pool, class/field/method headers, annotations, `Exceptions`,
//! `SourceFile`, `BootstrapMethods`, and (in [`ParseMode::Full`]) the
//! instruction stream of every `Code` attribute together with its
//! `LineNumberTable`.

mod constant_pool;
pub mod descriptor;
mod metadata;
mod opcodes;
mod parser;
mod reader;

pub use metadata::{
    ClassMetadata, CodeInfo, FieldInfo, LineNumber, MethodInfo, Reference, ReferenceKind,
    ACC_INTERFACE,
};
pub use parser::parse_class;

use thiserror::Error;

/// Oldest supported class-file major version (JDK 1.1).
pub const MIN_MAJOR_VERSION: u16 = 45;

/// Newest supported class-file major version (JDK 25).
pub const MAX_MAJOR_VERSION: u16 = 69;

/// How much of a class file to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Headers, members and annotations; method bodies are skipped.
    Structure,
    /// Everything in `Structure` plus decoded method bodies.
    Full,
}

/// Errors raised while decoding a class file.
#[derive(Debug, Error)]
pub enum ClassParseError {
    /// Input ended in the middle of a structure.
    #[error("unexpected end of class file")]
    UnexpectedEof,

    /// The file does not start with `0xCAFEBABE`.
    #[error("invalid class file magic header")]
    InvalidMagic,

    /// The class-file version is outside the supported range.
    #[error(
        "unsupported class file version {major}.{minor} (supported majors: {}..={})",
        MIN_MAJOR_VERSION,
        MAX_MAJOR_VERSION
    )]
    UnsupportedVersion {
        /// Major version found.
        major: u16,
        /// Minor version found.
        minor: u16,
    },

    /// Unknown constant pool tag.
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant {
        /// The tag byte.
        tag: u8,
    },

    /// A constant pool index is out of range or points at the wrong kind.
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex {
        /// The offending index.
        index: u16,
    },

    /// A `CONSTANT_Utf8` entry is not valid modified UTF-8.
    #[error("invalid modified UTF-8 in constant pool entry {index}")]
    InvalidUtf8 {
        /// The entry index.
        index: u16,
    },

    /// A field or method descriptor is malformed.
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),

    /// An instruction runs past the end of the code array.
    #[error("truncated bytecode at offset {offset}")]
    TruncatedCode {
        /// Bytecode offset.
        offset: usize,
    },

    /// An opcode outside the instruction set.
    #[error("invalid opcode 0x{opcode:02x} at offset {offset}")]
    InvalidOpcode {
        /// The opcode byte.
        opcode: u8,
        /// Bytecode offset.
        offset: usize,
    },

    /// A `tableswitch`/`lookupswitch` with negative size.
    #[error("invalid switch instruction at offset {offset}")]
    InvalidSwitch {
        /// Bytecode offset.
        offset: usize,
    },

    /// An annotation element value with an unknown tag.
    #[error("invalid annotation element tag '{tag}'")]
    InvalidAnnotation {
        /// The tag character.
        tag: char,
    },

    /// `invokedynamic` points past the `BootstrapMethods` table.
    #[error("invalid bootstrap method index {index}")]
    InvalidBootstrapIndex {
        /// The offending index.
        index: u16,
    },
}
