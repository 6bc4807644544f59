//! General helper utilities.

/// Render an identifier the way the diagnostic listing expects it:
/// lowercase hex, negative values as `-` followed by the magnitude.
pub fn format_identifier(id: i64) -> String {
    if id < 0 {
        format!("-{:x}", id.unsigned_abs())
    } else {
        format!("{id:x}")
    }
}

/// Parameter registers (`p0`, `p1`, ...) alias the method's arguments.
pub fn is_parameter_register(register: &str) -> bool {
    register.starts_with('p')
}

/// Parse a smali hex literal such as `0x1f`, `-0x4cL` or `0x7fs`.
///
/// Returns `None` when the text is not a hex literal at all.
pub fn parse_hex_literal(text: &str) -> Option<i128> {
    let text = text.trim_end_matches(|c| matches!(c, 'L' | 'l' | 's' | 'S' | 't' | 'T'));
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 32 {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, 16).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse an identifier given on the command line: decimal, or smali-style
/// hex (`0x1f`, `-0x4cL`). Values past `i64::MAX` wrap to their signed view.
pub fn parse_identifier(text: &str) -> Option<i64> {
    let text = text.trim();
    let value = match parse_hex_literal(text) {
        Some(value) => value,
        None => text.parse::<i128>().ok()?,
    };
    crate::core::fixed::to_signed(value, crate::core::fixed::Width::W64).ok()
}

/// Split a raw line into its content and its line terminator.
pub fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}
