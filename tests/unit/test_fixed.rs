//! Unit tests for fixed-width integer semantics.

use deparanoid::core::fixed::*;
use deparanoid::errors::ArithmeticError;

const WIDTHS: [Width; 4] = [Width::W8, Width::W16, Width::W32, Width::W64];

#[test]
fn test_to_int_accepts_signed_and_unsigned_extremes() {
    for width in WIDTHS {
        let n = width.bits();
        let min = -(1i128 << (n - 1));
        let max = (1i128 << n) - 1;

        assert_eq!(to_int(min, width, true).unwrap(), min);
        assert_eq!(to_int(max, width, false).unwrap(), max);
        // The unsigned maximum is -1 in the signed view.
        assert_eq!(to_int(max, width, true).unwrap(), -1);
        // The signed minimum is 2^(N-1) in the unsigned view.
        assert_eq!(to_int(min, width, false).unwrap(), 1i128 << (n - 1));
    }
}

#[test]
fn test_to_int_rejects_out_of_range() {
    for width in WIDTHS {
        let n = width.bits();
        let below = -(1i128 << (n - 1)) - 1;
        let above = 1i128 << n;

        assert_eq!(
            to_int(below, width, true),
            Err(ArithmeticError::OutOfRange { value: below, bits: n })
        );
        assert!(to_int(above, width, false).is_err());
    }
}

#[test]
fn test_bit_pattern_is_preserved() {
    for width in WIDTHS {
        for value in [-1i128, -2, 0, 1, 0x7f, -0x80] {
            let unsigned = to_unsigned(value, width).unwrap();
            assert_eq!(i128::from(reinterpret_signed(unsigned, width)), value);
            assert_eq!(reinterpret_unsigned(to_signed(value, width).unwrap(), width), unsigned);
        }
    }
}

#[test]
fn test_specific_conversions() {
    assert_eq!(to_signed(0xffff, Width::W16).unwrap(), -1);
    assert_eq!(to_unsigned(-1, Width::W16).unwrap(), 0xffff);
    assert_eq!(to_signed(0x80, Width::W8).unwrap(), -128);
    assert_eq!(to_unsigned(-1, Width::W64).unwrap(), u64::MAX);
}

#[test]
fn test_overflow_wraps_silently() {
    assert_eq!(wrapping_add(0xff, 1, Width::W8), 0);
    assert_eq!(wrapping_add(u64::MAX, 2, Width::W64), 1);
    assert_eq!(wrapping_mul(0x8000, 2, Width::W16), 0);
    assert_eq!(wrapping_mul(0xffff_ffff, 0xffff_ffff, Width::W32), 1);
}

#[test]
fn test_shifts() {
    assert_eq!(shl(0x8000_0000, 1, Width::W32), 0);
    assert_eq!(shl(1, 64, Width::W64), 0);
    // Logical shift never smears the sign bit.
    assert_eq!(shr(0x8000, 15, Width::W16), 1);
    assert_eq!(shr(u64::MAX, 63, Width::W64), 1);
    // Arithmetic shift does.
    assert_eq!(sar(0x8000, 15, Width::W16), 0xffff);
    assert_eq!(sar(0x4000, 14, Width::W16), 1);
}

#[test]
fn test_bitwise_ops_mask_to_width() {
    assert_eq!(and(0x1ff, 0xfff, Width::W8), 0xff);
    assert_eq!(or(0x100, 0x01, Width::W8), 0x01);
    assert_eq!(xor(0xffff, 0x0f0f, Width::W16), 0xf0f0);
}

#[test]
fn test_rotate_left() {
    assert_eq!(rotate_left(0x8000_0001, 1, Width::W32), 0x0000_0003);
    assert_eq!(rotate_left(0x12, 4, Width::W8), 0x21);
    assert_eq!(rotate_left(0xabcd, 16, Width::W16), 0xabcd);
    assert_eq!(rotate_left(0xabcd, 0, Width::W16), 0xabcd);
}

#[test]
fn test_width_from_bits() {
    assert_eq!(Width::from_bits(16), Some(Width::W16));
    assert_eq!(Width::from_bits(12), None);
}
