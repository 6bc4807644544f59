//! Domain-specific error types.
//!
//! Uses `thiserror` for structured error definitions; `anyhow` is reserved
//! for the directory-level orchestration and the CLI.

use crate::register::RegisterValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors from fixed-width integer conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("{value} is out of range for a {bits}-bit integer")]
    OutOfRange { value: i128, bits: u32 },
}

/// Errors from decoding a quoted smali string literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("truncated unicode escape at offset {0}")]
    TruncatedUnicodeEscape(usize),

    #[error("invalid hex digit in unicode escape at offset {0}")]
    InvalidUnicodeEscape(usize),

    #[error("unknown escape sequence '\\{1}' at offset {0}")]
    UnknownEscape(usize, char),

    #[error("dangling backslash at end of literal")]
    DanglingBackslash,
}

/// Errors from replaying the string-recovery routine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("character index {index} falls outside the {chunks} available chunk(s)")]
    ChunkIndexOutOfRange { index: i64, chunks: usize },

    #[error("negative start index {0}")]
    NegativeIndex(i32),

    #[error("string of length {length} at index {index} exceeds chunk capacity {capacity}")]
    LengthOutOfRange {
        index: i64,
        length: u64,
        capacity: u64,
    },
}

/// Errors from parsing field/method declarations and type signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("not a field declaration: {0}")]
    NotAField(String),

    #[error("not a method declaration: {0}")]
    NotAMethod(String),

    #[error("malformed method signature: {0}")]
    MalformedSignature(String),

    #[error("malformed type descriptor '{descriptor}' at offset {offset}")]
    MalformedType { descriptor: String, offset: usize },
}

/// A line whose mnemonic is recognised but whose operands do not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("malformed {mnemonic} instruction: {line}")]
    Malformed { mnemonic: String, line: String },
}

/// Context attached to call-site failures: where it happened and what the
/// register table looked like at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line_number: usize,
    pub line: String,
    pub register: String,
    pub registers: BTreeMap<String, RegisterValue>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{}: {} ({})", self.line_number, self.line, self.register),
        }
    }
}

/// Errors raised while walking one smali unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("line is not a class declaration: {0}")]
    ClassDeclaration(String),

    #[error("parameters are not supported\n{0}")]
    ParametersNotSupported(Box<Diagnostic>),

    #[error("register not found\n{0}")]
    RegisterNotFound(Box<Diagnostic>),

    #[error("string recovery failed at line {line}: {source}")]
    Recovery {
        line: usize,
        #[source]
        source: RecoveryError,
    },
}

impl ParserError {
    /// Whether the error only affects a single call site and the unit can
    /// keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ParserError::ParametersNotSupported(_))
    }
}

/// Corpus-wide failures while locating the recovery method and its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("no string recovery method found")]
    NoRecoveryMethod,

    #[error("found {0} candidate string recovery methods, expected exactly one")]
    AmbiguousRecoveryMethod(usize),

    #[error("recovery method reads {0} string-array fields, expected exactly one")]
    AmbiguousChunkField(usize),

    #[error("no chunk values found for field {0}")]
    ChunksNotFound(String),

    #[error("chunk slot {index} of field {field} was never assigned")]
    IncompleteChunks { field: String, index: usize },

    #[error("chunk {index} is not a valid literal: {source}")]
    InvalidChunk {
        index: usize,
        #[source]
        source: LiteralError,
    },
}
