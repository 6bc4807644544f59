//! Deparanoid: string deobfuscator for Paranoid-protected smali.
//!
//! Paranoid replaces string literals with a 64-bit identifier and a call to a
//! generated helper that rebuilds the text from a few "chunk" arrays of noise.
//! This crate replays that helper statically, finds every call site in the
//! disassembled smali, and rewrites it back into a plain `const-string`.

pub mod core;
pub mod utils;

pub mod deobfuscator;
pub mod descriptor;
pub mod discovery;
pub mod errors;
pub mod instruction;
pub mod parser;
pub mod register;
pub mod report;
pub mod rewriter;
