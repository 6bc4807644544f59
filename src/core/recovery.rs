//! String recovery: replays the runtime `getString(long)` helper.
//!
//! The helper seeds the generator from the identifier, derives a start index
//! into the concatenated chunk pages, reads a length code unit, then XORs the
//! following code units against fresh generator output.

use crate::core::fixed::{self, Width};
use crate::core::random;
use crate::errors::{LiteralError, RecoveryError};
use crate::utils::helpers::format_identifier;
use crate::utils::literal;
use serde::Serialize;

/// Capacity of one chunk page, in UTF-16 code units.
pub const MAX_CHUNK_LENGTH: usize = 0x1FFF;

/// The ordered chunk pages, concatenated into one addressable space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: Vec<Vec<u16>>,
}

impl ChunkSet {
    /// Wrap already-decoded chunk pages.
    pub fn new(chunks: Vec<Vec<u16>>) -> Self {
        Self { chunks }
    }

    /// Build from plain Rust strings (mostly useful for fixtures).
    pub fn from_strs<S: AsRef<str>>(chunks: &[S]) -> Self {
        Self::new(
            chunks
                .iter()
                .map(|c| c.as_ref().encode_utf16().collect())
                .collect(),
        )
    }

    /// Build from escaped smali literal bodies, as found in `const-string`.
    pub fn from_literals<S: AsRef<str>>(literals: &[S]) -> Result<Self, LiteralError> {
        let chunks = literals
            .iter()
            .map(|l| literal::unescape(l.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(chunks))
    }

    /// Number of chunk pages.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks were supplied.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Size of the logical address space spanned by the pages.
    pub fn capacity(&self) -> u64 {
        (self.chunks.len() * MAX_CHUNK_LENGTH) as u64
    }

    /// Code unit at logical `index`.
    pub fn char_at(&self, index: i64) -> Result<u16, RecoveryError> {
        let out_of_range = RecoveryError::ChunkIndexOutOfRange {
            index,
            chunks: self.chunks.len(),
        };
        let Ok(index_usize) = usize::try_from(index) else {
            return Err(out_of_range);
        };
        self.chunks
            .get(index_usize / MAX_CHUNK_LENGTH)
            .and_then(|chunk| chunk.get(index_usize % MAX_CHUNK_LENGTH))
            .copied()
            .ok_or(out_of_range)
    }
}

/// Output of one recovery: the identifier and the code units it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveredString {
    pub identifier: i64,
    pub units: Vec<u16>,
}

impl RecoveredString {
    /// Text form; unpaired surrogates become U+FFFD.
    pub fn to_text(&self) -> String {
        literal::decode_lossy(&self.units)
    }

    /// Escaped literal body, safe to embed in `const-string`.
    pub fn to_literal(&self) -> String {
        literal::escape(&self.units)
    }

    /// Diagnostic listing line: `[<hex-identifier>]:<text>`.
    pub fn listing(&self) -> String {
        format!("[{}]:{}", format_identifier(self.identifier), self.to_text())
    }
}

/// Advance the state and fold in the code unit at `char_index`.
pub fn get_char_at(char_index: i64, chunks: &ChunkSet, state: i64) -> Result<i64, RecoveryError> {
    let next_state = fixed::reinterpret_unsigned(random::next(state), Width::W64);
    let unit = u64::from(chunks.char_at(char_index)?);
    let mixed = fixed::xor(next_state, fixed::shl(unit, 32, Width::W64), Width::W64);
    Ok(fixed::reinterpret_signed(mixed, Width::W64))
}

/// Upper output lane of a state, as a code unit.
fn high_unit(state: i64) -> u64 {
    let bits = fixed::reinterpret_unsigned(state, Width::W64);
    fixed::and(fixed::shr(bits, 32, Width::W64), 0xFFFF, Width::W64)
}

/// Recover the string encoded by `id`.
///
/// `id` may arrive as the signed value smali prints; only its bit pattern
/// matters.
pub fn get_string(id: i64, chunks: &ChunkSet) -> Result<RecoveredString, RecoveryError> {
    let id_bits = fixed::reinterpret_unsigned(id, Width::W64);

    let mut state = random::seed(fixed::and(id_bits, 0xFFFF_FFFF, Width::W64));
    state = random::next(state);
    let low = high_unit(state);
    state = random::next(state);
    let high = fixed::and(
        fixed::shr(fixed::reinterpret_unsigned(state, Width::W64), 16, Width::W64),
        0xFFFF_0000,
        Width::W64,
    );

    let mixed = fixed::xor(fixed::shr(id_bits, 32, Width::W64), low ^ high, Width::W64);
    let index = fixed::reinterpret_signed(mixed, Width::W32) as i32;
    if index < 0 {
        return Err(RecoveryError::NegativeIndex(index));
    }
    let index = i64::from(index);

    state = get_char_at(index, chunks, state)?;
    let length = high_unit(state);

    // Refuse to walk past the supplied pages instead of failing halfway through.
    if index as u64 + length >= chunks.capacity() {
        return Err(RecoveryError::LengthOutOfRange {
            index,
            length,
            capacity: chunks.capacity(),
        });
    }

    let mut units = Vec::with_capacity(length as usize);
    for offset in 0..length as i64 {
        state = get_char_at(index + offset + 1, chunks, state)?;
        units.push(high_unit(state) as u16);
    }

    log::trace!("recovered {} code units for id {}", units.len(), format_identifier(id));
    Ok(RecoveredString {
        identifier: id,
        units,
    })
}
