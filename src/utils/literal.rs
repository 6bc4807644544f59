//! Smali string literal codec.
//!
//! Literals are handled as UTF-16 code units rather than `String`: chunk
//! data routinely contains unpaired surrogates which Rust strings cannot hold.

use crate::errors::LiteralError;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Decode the body of a quoted smali literal (without the surrounding quotes)
/// into UTF-16 code units.
///
/// Supports `\b \t \n \f \r \" \' \\` and `\uXXXX`.
pub fn unescape(literal: &str) -> Result<Vec<u16>, LiteralError> {
    let mut out = Vec::with_capacity(literal.len());
    let mut chars = literal.char_indices();

    while let Some((offset, c)) = chars.next() {
        if c != '\\' {
            let mut buf = [0u16; 2];
            out.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }

        let (_, escape) = chars.next().ok_or(LiteralError::DanglingBackslash)?;
        let unit = match escape {
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0a,
            'f' => 0x0c,
            'r' => 0x0d,
            '"' => 0x22,
            '\'' => 0x27,
            '\\' => 0x5c,
            'u' => {
                let mut value = 0u16;
                for _ in 0..4 {
                    let (_, digit) = chars
                        .next()
                        .ok_or(LiteralError::TruncatedUnicodeEscape(offset))?;
                    let digit = digit
                        .to_digit(16)
                        .ok_or(LiteralError::InvalidUnicodeEscape(offset))?;
                    value = (value << 4) | digit as u16;
                }
                value
            }
            other => return Err(LiteralError::UnknownEscape(offset, other)),
        };
        out.push(unit);
    }

    Ok(out)
}

/// Encode UTF-16 code units as the body of a smali literal.
///
/// Printable ASCII passes through; quotes and backslash get a backslash;
/// tab/newline/carriage-return use their short escapes; everything else
/// (controls, DEL and all non-ASCII units, surrogates included) becomes
/// `\uXXXX`.
pub fn escape(units: &[u16]) -> String {
    let mut out = String::with_capacity(units.len());
    for &unit in units {
        match unit {
            0x09 => out.push_str("\\t"),
            0x0a => out.push_str("\\n"),
            0x0d => out.push_str("\\r"),
            0x22 => out.push_str("\\\""),
            0x27 => out.push_str("\\'"),
            0x5c => out.push_str("\\\\"),
            0x20..=0x7e => out.push(unit as u8 as char),
            _ => {
                out.push_str("\\u");
                for shift in [12, 8, 4, 0] {
                    out.push(HEX_DIGITS[usize::from((unit >> shift) & 0xf)] as char);
                }
            }
        }
    }
    out
}

/// Encode a Rust string as the body of a smali literal.
pub fn escape_str(text: &str) -> String {
    escape(&text.encode_utf16().collect::<Vec<_>>())
}

/// Turn code units into text, replacing unpaired surrogates with U+FFFD.
pub fn decode_lossy(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}
