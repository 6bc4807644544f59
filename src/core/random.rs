//! The 16-bit-lane pseudo-random generator embedded by Paranoid.
//!
//! State is a 64-bit container: the low two 16-bit lanes hold the generator
//! registers and the upper 32 bits carry the last output. Everything here
//! must match the JVM bit for bit, including the sign extension that happens
//! when a `short` is widened back into a `long`.

use crate::core::fixed::{self, Width};

/// First MurmurHash3 finalizer multiplier.
pub const SEED_MULTIPLIER_1: u64 = 0x62A9_D9ED_7997_05F5;
/// Second MurmurHash3 finalizer multiplier.
pub const SEED_MULTIPLIER_2: u64 = 0xCB24_D0A5_C88C_35B3;

/// Derive the initial state from the low 32 bits of an identifier.
///
/// Two multiply-xor-shift rounds; the top 32 bits of the second round become
/// the state, so the result always fits in `0..2^32`.
pub fn seed(x: u64) -> i64 {
    let z = fixed::wrapping_mul(x ^ (x >> 33), SEED_MULTIPLIER_1, Width::W64);
    let y = fixed::wrapping_mul(z ^ (z >> 28), SEED_MULTIPLIER_2, Width::W64);
    fixed::shr(y, 32, Width::W64) as i64
}

/// Rotate a `short` left by `k` the way the JVM does it: the value is first
/// sign-extended to 32 bits, rotated as an unsigned `int`, then truncated.
pub fn rotl(x: i16, k: u32) -> i16 {
    let wide = fixed::reinterpret_unsigned(i64::from(x), Width::W32);
    let rotated = fixed::rotate_left(wide, k, Width::W32);
    fixed::reinterpret_signed(rotated, Width::W16) as i16
}

/// Advance the generator by one step.
pub fn next(state: i64) -> i64 {
    let bits = fixed::reinterpret_unsigned(state, Width::W64);
    let mut s0 = fixed::reinterpret_signed(bits, Width::W16) as i16;
    let mut s1 = fixed::reinterpret_signed(fixed::shr(bits, 16, Width::W64), Width::W16) as i16;

    let mut output = s0.wrapping_add(s1);
    output = rotl(output, 9);
    output = output.wrapping_add(s0);

    s1 ^= s0;
    s0 = rotl(s0, 13);
    s0 ^= s1;
    s0 ^= s1.wrapping_shl(5);
    s1 = rotl(s1, 10);

    // Widening each lane sign-extends it, so a negative s1 or s0 smears
    // ones over the lanes above it. The runtime does the same.
    let mut result = i64::from(output);
    result <<= 16;
    result |= i64::from(s1);
    result <<= 16;
    result |= i64::from(s0);
    result
}
