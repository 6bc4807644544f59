//! Recognised smali instruction shapes.
//!
//! Each line is classified by its mnemonic first; only then is the matching
//! pattern applied. A line with an unknown mnemonic is `Ok(None)`, a known
//! mnemonic whose operands do not fit is `Err(InstructionError::Malformed)`.

use crate::core::fixed::{self, Width};
use crate::errors::InstructionError;
use crate::utils::helpers::parse_hex_literal;
use regex::Regex;
use std::sync::LazyLock;

/// Characters allowed in a DEX simple name, besides `/` for class names.
const NAME_CHARS: &str = r"a-zA-Z0-9$_\- \x{00A0}-\x{1FFF}\x{2000}-\x{200A}\x{2010}-\x{2027}\x{202F}\x{2030}-\x{D7FF}\x{E000}-\x{FFEF}\x{10000}-\x{10FFFF}";

const REGISTER: &str = r"[vp][0-9]+";

/// Largest register range expanded by [`referenced_registers`].
const MAX_RANGE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Get,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResultKind {
    Plain,
    Wide,
    Object,
}

/// One recognised instruction with its operands extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `const`, `const/4`, `const-wide/16`, ...
    Const { register: String, value: i64 },
    /// `const-string`; `value` is the raw escaped literal body.
    ConstString { register: String, value: String },
    NewArray {
        register: String,
        size_register: String,
        type_descriptor: String,
    },
    /// `aget*` / `aput*`.
    ArrayAccess {
        op: AccessOp,
        value_register: String,
        array_register: String,
        index_register: String,
    },
    /// `sget*` / `sput*`.
    StaticField {
        op: AccessOp,
        register: String,
        class_name: String,
        field_name: String,
        field_type: String,
    },
    /// `invoke-static` and `invoke-static/range`. For ranges `registers`
    /// holds the two endpoints.
    InvokeStatic {
        registers: Vec<String>,
        class_name: String,
        method: String,
        range: bool,
    },
    MoveResult { register: String, kind: MoveResultKind },
}

impl Instruction {
    /// Register whose previous value this instruction overwrites.
    pub fn defined_register(&self) -> Option<&str> {
        match self {
            Instruction::Const { register, .. }
            | Instruction::ConstString { register, .. }
            | Instruction::NewArray { register, .. }
            | Instruction::MoveResult { register, .. } => Some(register),
            Instruction::ArrayAccess {
                op: AccessOp::Get,
                value_register,
                ..
            } => Some(value_register),
            Instruction::StaticField {
                op: AccessOp::Get,
                register,
                ..
            } => Some(register),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

struct Patterns {
    constant: Regex,
    const_string: Regex,
    new_array: Regex,
    array_access: Regex,
    static_field: Regex,
    invoke_static: Regex,
    invoke_static_range: Regex,
    move_result: Regex,
}

impl Patterns {
    fn build() -> Result<Self, regex::Error> {
        let class = format!(r"L[{NAME_CHARS}/]+;");
        let simple = format!(r"[{NAME_CHARS}]+");
        let type_descriptor = format!(r"\[*(?:{class}|[VZBSCIJFD])");
        let signature = format!(r"[{NAME_CHARS}/\[\(\);<>]+");
        let r = REGISTER;
        let width = r"(?:-(?:wide|object|boolean|byte|char|short))?";

        Ok(Self {
            constant: Regex::new(&format!(
                r"^const(?:/4|/16|/high16|-wide(?:/16|/32|/high16)?)?\s+({r}),\s+(-?0x[0-9a-fA-F]+)"
            ))
            ?,
            const_string: Regex::new(&format!(r#"^const-string(?:/jumbo)?\s+({r}),\s+"(.*)""#))?,
            new_array: Regex::new(&format!(
                r"^new-array\s+({r}),\s+({r}),\s+({type_descriptor})"
            ))
            ?,
            array_access: Regex::new(&format!(
                r"^a(put|get){width}\s+({r}),\s+({r}),\s+({r})"
            ))
            ?,
            static_field: Regex::new(&format!(
                r"^s(put|get){width}\s+({r}),\s+({class})->({simple}):({type_descriptor})"
            ))
            ?,
            invoke_static: Regex::new(&format!(
                r"^invoke-static\s*\{{\s*((?:{r}(?:\s*,\s*{r})*)?)\s*\}},\s*({class})->({signature})"
            ))
            ?,
            invoke_static_range: Regex::new(&format!(
                r"^invoke-static/range\s*\{{\s*({r})\s*\.\.\s*({r})\s*\}},\s*({class})->({signature})"
            ))
            ?,
            move_result: Regex::new(&format!(r"^move-result(?:-(wide|object))?\s+({r})"))?,
        })
    }

}

static PATTERNS: LazyLock<Patterns> =
    LazyLock::new(|| Patterns::build().expect("instruction patterns compile"));

static REGISTER_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({REGISTER})\s*\.\.\s*({REGISTER})$")).expect("register range pattern compiles")
});

/// The mnemonic of a stripped line: everything up to whitespace or `{`.
pub fn mnemonic(line: &str) -> &str {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '{')
        .unwrap_or(line.len());
    &line[..end]
}

fn is_width_suffix(suffix: &str) -> bool {
    matches!(suffix, "" | "-wide" | "-object" | "-boolean" | "-byte" | "-char" | "-short")
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Classify one line (leading/trailing whitespace is ignored).
pub fn parse(line: &str) -> Result<Option<Instruction>, InstructionError> {
    let line = line.trim();
    let op = mnemonic(line);
    let malformed = || InstructionError::Malformed {
        mnemonic: op.to_string(),
        line: line.to_string(),
    };

    let p = &*PATTERNS;

    let instruction = match op {
        "const" | "const/4" | "const/16" | "const/high16" | "const-wide" | "const-wide/16"
        | "const-wide/32" | "const-wide/high16" => {
            let caps = p.constant.captures(line).ok_or_else(malformed)?;
            let value = parse_hex_literal(&caps[2])
                .and_then(|v| fixed::to_signed(v, Width::W64).ok())
                .ok_or_else(malformed)?;
            Instruction::Const {
                register: caps[1].to_string(),
                value,
            }
        }
        "const-string" | "const-string/jumbo" => {
            let caps = p.const_string.captures(line).ok_or_else(malformed)?;
            Instruction::ConstString {
                register: caps[1].to_string(),
                value: caps[2].to_string(),
            }
        }
        "new-array" => {
            let caps = p.new_array.captures(line).ok_or_else(malformed)?;
            Instruction::NewArray {
                register: caps[1].to_string(),
                size_register: caps[2].to_string(),
                type_descriptor: caps[3].to_string(),
            }
        }
        _ if (op.starts_with("aget") || op.starts_with("aput")) && is_width_suffix(&op[4..]) => {
            let caps = p.array_access.captures(line).ok_or_else(malformed)?;
            Instruction::ArrayAccess {
                op: if &caps[1] == "get" { AccessOp::Get } else { AccessOp::Put },
                value_register: caps[2].to_string(),
                array_register: caps[3].to_string(),
                index_register: caps[4].to_string(),
            }
        }
        _ if (op.starts_with("sget") || op.starts_with("sput")) && is_width_suffix(&op[4..]) => {
            let caps = p.static_field.captures(line).ok_or_else(malformed)?;
            Instruction::StaticField {
                op: if &caps[1] == "get" { AccessOp::Get } else { AccessOp::Put },
                register: caps[2].to_string(),
                class_name: caps[3].to_string(),
                field_name: caps[4].to_string(),
                field_type: caps[5].to_string(),
            }
        }
        "invoke-static" => {
            let caps = p.invoke_static.captures(line).ok_or_else(malformed)?;
            let registers = caps[1]
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            Instruction::InvokeStatic {
                registers,
                class_name: caps[2].to_string(),
                method: caps[3].to_string(),
                range: false,
            }
        }
        "invoke-static/range" => {
            let caps = p.invoke_static_range.captures(line).ok_or_else(malformed)?;
            Instruction::InvokeStatic {
                registers: vec![caps[1].to_string(), caps[2].to_string()],
                class_name: caps[3].to_string(),
                method: caps[4].to_string(),
                range: true,
            }
        }
        "move-result" | "move-result-wide" | "move-result-object" => {
            let caps = p.move_result.captures(line).ok_or_else(malformed)?;
            let kind = match caps.get(1).map(|m| m.as_str()) {
                Some("wide") => MoveResultKind::Wide,
                Some("object") => MoveResultKind::Object,
                _ => MoveResultKind::Plain,
            };
            Instruction::MoveResult {
                register: caps[2].to_string(),
                kind,
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(instruction))
}

/// Every register named in an instruction's operands, ranges expanded.
///
/// Directives, labels and comments reference nothing; string literals and
/// trailing comments are not scanned.
pub fn referenced_registers(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(['.', ':', '#']) {
        return Vec::new();
    }

    let operands = &line[mnemonic(line).len()..];
    let operands = operands.split(['"', '#']).next().unwrap_or("");

    let mut registers = Vec::new();
    for token in operands.split(',') {
        let token = token.trim().trim_matches(|c| c == '{' || c == '}').trim();
        if is_register(token) {
            registers.push(token.to_string());
        } else if let Some(caps) = REGISTER_RANGE.captures(token) {
            registers.extend(expand_range(&caps[1], &caps[2]));
        }
    }
    registers
}

/// Mnemonic prefixes of instructions that only read their operands.
const READ_ONLY_PREFIXES: &[&str] = &[
    "invoke",
    "aput",
    "iput",
    "sput",
    "if-",
    "return",
    "throw",
    "monitor-",
    "check-cast",
    "fill-array-data",
    "filled-new-array",
    "packed-switch",
    "sparse-switch",
    "goto",
    "nop",
];

/// Whether `op` writes a register pair (`vN` and `vN+1`).
fn writes_pair(op: &str) -> bool {
    let base = op.split('/').next().unwrap_or(op);
    if let Some((_, to)) = base.split_once("-to-") {
        return matches!(to, "long" | "double");
    }
    if base.starts_with("cmp") {
        return false;
    }
    base.contains("-wide") || base.ends_with("-long") || base.ends_with("-double")
}

/// Registers an instruction line overwrites: the destination operand and,
/// for wide results, the high half of the pair.
///
/// Works on any instruction, recognised or not. Lines that only read their
/// operands yield nothing.
pub fn written_registers(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(['.', ':', '#']) {
        return Vec::new();
    }
    let op = mnemonic(line);
    if READ_ONLY_PREFIXES.iter().any(|p| op.starts_with(p)) {
        return Vec::new();
    }

    let Some(first) = line[op.len()..]
        .split(',')
        .next()
        .map(str::trim)
        .filter(|t| is_register(t))
    else {
        return Vec::new();
    };

    let mut registers = vec![first.to_string()];
    if writes_pair(op) {
        registers.extend(next_register(first));
    }
    registers
}

fn next_register(register: &str) -> Option<String> {
    let (prefix, number) = register.split_at(1);
    let number: u32 = number.parse().ok()?;
    Some(format!("{prefix}{}", number.checked_add(1)?))
}

fn is_register(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('v' | 'p'))
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

fn expand_range(first: &str, last: &str) -> Vec<String> {
    let (prefix, start) = first.split_at(1);
    let (last_prefix, end) = last.split_at(1);
    match (start.parse::<u32>(), end.parse::<u32>()) {
        (Ok(start), Ok(end)) if prefix == last_prefix && start <= end && end - start < MAX_RANGE => {
            (start..=end).map(|n| format!("{prefix}{n}")).collect()
        }
        _ => vec![first.to_string(), last.to_string()],
    }
}
