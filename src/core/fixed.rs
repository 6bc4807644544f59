//! Fixed-width integer operations.
//!
//! Values travel as raw `u64` bit patterns tagged with a [`Width`]; every
//! operation masks its result back to that width, so overflow wraps silently
//! exactly like two's-complement hardware (and the JVM) does.

use crate::errors::ArithmeticError;

/// Supported integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// Number of bits in this width.
    pub fn bits(self) -> u32 {
        match self {
            Width::W8 => 8,
            Width::W16 => 16,
            Width::W32 => 32,
            Width::W64 => 64,
        }
    }

    /// Look up a width by bit count.
    pub fn from_bits(bits: u32) -> Option<Width> {
        match bits {
            8 => Some(Width::W8),
            16 => Some(Width::W16),
            32 => Some(Width::W32),
            64 => Some(Width::W64),
            _ => None,
        }
    }

    /// All-ones mask for this width.
    pub fn mask(self) -> u64 {
        match self {
            Width::W64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }

    /// Smallest accepted input: `-(2^(N-1))`.
    pub fn min_signed(self) -> i128 {
        -(1i128 << (self.bits() - 1))
    }

    /// Largest accepted input: `2^N - 1`.
    pub fn max_unsigned(self) -> i128 {
        (1i128 << self.bits()) - 1
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn check_range(value: i128, width: Width) -> Result<(), ArithmeticError> {
    if value < width.min_signed() || value > width.max_unsigned() {
        return Err(ArithmeticError::OutOfRange {
            value,
            bits: width.bits(),
        });
    }
    Ok(())
}

/// Convert `value` into its unsigned `width`-bit view.
///
/// Accepts anything representable as either a signed or an unsigned
/// integer of that width; negative inputs wrap (`-1` at 16 bits is `0xffff`).
pub fn to_unsigned(value: i128, width: Width) -> Result<u64, ArithmeticError> {
    check_range(value, width)?;
    Ok((value as u64) & width.mask())
}

/// Convert `value` into its signed `width`-bit view.
///
/// `0xffff` at 16 bits becomes `-1`.
pub fn to_signed(value: i128, width: Width) -> Result<i64, ArithmeticError> {
    let bits = to_unsigned(value, width)?;
    Ok(reinterpret_signed(bits, width))
}

/// Convert into the signed or unsigned view depending on `signed`.
pub fn to_int(value: i128, width: Width, signed: bool) -> Result<i128, ArithmeticError> {
    if signed {
        to_signed(value, width).map(i128::from)
    } else {
        to_unsigned(value, width).map(i128::from)
    }
}

/// Read the low `width` bits of `bits` as a two's-complement signed value.
pub fn reinterpret_signed(bits: u64, width: Width) -> i64 {
    let mask = width.mask();
    let bits = bits & mask;
    let sign = 1u64 << (width.bits() - 1);
    if bits & sign != 0 {
        (bits | !mask) as i64
    } else {
        bits as i64
    }
}

/// Read a signed value as its unsigned `width`-bit bit pattern.
pub fn reinterpret_unsigned(value: i64, width: Width) -> u64 {
    (value as u64) & width.mask()
}

// ---------------------------------------------------------------------------
// Bitwise and arithmetic operations
// ---------------------------------------------------------------------------

/// Wrapping addition at `width`.
pub fn wrapping_add(a: u64, b: u64, width: Width) -> u64 {
    a.wrapping_add(b) & width.mask()
}

/// Wrapping multiplication at `width`.
pub fn wrapping_mul(a: u64, b: u64, width: Width) -> u64 {
    a.wrapping_mul(b) & width.mask()
}

/// Bitwise AND at `width`.
pub fn and(a: u64, b: u64, width: Width) -> u64 {
    a & b & width.mask()
}

/// Bitwise OR at `width`.
pub fn or(a: u64, b: u64, width: Width) -> u64 {
    (a | b) & width.mask()
}

/// Bitwise XOR at `width`.
pub fn xor(a: u64, b: u64, width: Width) -> u64 {
    (a ^ b) & width.mask()
}

/// Left shift; bits shifted past `width` are discarded.
pub fn shl(bits: u64, k: u32, width: Width) -> u64 {
    bits.checked_shl(k).unwrap_or(0) & width.mask()
}

/// Logical right shift on the unsigned view (zero fill).
pub fn shr(bits: u64, k: u32, width: Width) -> u64 {
    (bits & width.mask()).checked_shr(k).unwrap_or(0)
}

/// Arithmetic right shift on the signed view (sign fill).
pub fn sar(bits: u64, k: u32, width: Width) -> u64 {
    let signed = reinterpret_signed(bits, width);
    reinterpret_unsigned(signed >> k.min(63), width)
}

/// Rotate the low `width` bits left by `k`.
pub fn rotate_left(bits: u64, k: u32, width: Width) -> u64 {
    let n = width.bits();
    let k = k % n;
    if k == 0 {
        return bits & width.mask();
    }
    or(shl(bits, k, width), shr(bits, n - k, width), width)
}
