//! Rewrites recovered call sites back into plain string loads.
//!
//! Second pass over a unit, run once the recovery method and its chunks are
//! known. Only constants are tracked here. For each call to the recovery
//! method:
//!
//! - the `invoke-static` line becomes a removal marker (`nop` + marker inside
//!   a try block, which needs at least one real instruction),
//! - the `move-result-object` that follows becomes `const-string`,
//! - the wide constant that fed the call becomes a marker too, when nothing
//!   else could still need it.
//!
//! Every other line, including its line terminator, is emitted untouched.

use crate::core::recovery::{self, ChunkSet, RecoveredString};
use crate::descriptor::MethodDescriptor;
use crate::errors::{Diagnostic, ParserError};
use crate::instruction::{self, Instruction, MoveResultKind};
use crate::register::{RegisterValue, Registers};
use crate::utils::helpers::{is_parameter_register, split_line_ending};
use std::collections::{HashMap, HashSet};

/// Comment left in place of every removed line.
pub const REMOVED_MARKER: &str = concat!("# Removed with deparanoid v", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Keep the original `invoke-static` (and the constant feeding it).
    pub preserve_calls: bool,
}

/// One call site that was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// 1-based line number of the call.
    pub line: usize,
    pub string: RecoveredString,
}

/// Result of rewriting one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub replacements: Vec<Replacement>,
    pub changed: bool,
}

/// Where a tracked constant was loaded.
#[derive(Debug, Clone, Copy)]
struct ConstOrigin {
    output_index: usize,
    in_try_block: bool,
}

#[derive(Debug, Clone)]
struct Pending {
    register: String,
    literal: String,
    origin: Option<ConstOrigin>,
}

/// Indented marker, or `nop` plus marker inside a try block.
pub fn removal_line(in_try_block: bool) -> String {
    if in_try_block {
        format!("    nop {REMOVED_MARKER}")
    } else {
        format!("    {REMOVED_MARKER}")
    }
}

/// Line-at-a-time rewriter for one unit.
pub struct Rewriter<'a> {
    target: &'a MethodDescriptor,
    chunks: &'a ChunkSet,
    options: RewriteOptions,
    class_name: Option<String>,
    in_try_block: bool,
    registers: Registers,
    /// Registers last written by something other than a constant load.
    opaque: HashSet<String>,
    origins: HashMap<String, ConstOrigin>,
    pending: Option<Pending>,
    output: Vec<String>,
    replacements: Vec<Replacement>,
    changed: bool,
    line_number: usize,
}

impl<'a> Rewriter<'a> {
    pub fn new(target: &'a MethodDescriptor, chunks: &'a ChunkSet, options: RewriteOptions) -> Self {
        Self {
            target,
            chunks,
            options,
            class_name: None,
            in_try_block: false,
            registers: Registers::new(),
            opaque: HashSet::new(),
            origins: HashMap::new(),
            pending: None,
            output: Vec::new(),
            replacements: Vec::new(),
            changed: false,
            line_number: 0,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Process one raw line, terminator included.
    pub fn feed(&mut self, raw: &str) -> Result<(), ParserError> {
        self.line_number += 1;
        let (content, _) = split_line_ending(raw);
        let line = content.trim();

        // A second call before the result was consumed: the value is unused.
        if self.pending.is_some() && line.starts_with("invoke") {
            self.pending = None;
        }

        if line.is_empty() || line.starts_with('#') {
            return self.keep(raw);
        }
        if line.starts_with(":try_start") {
            self.in_try_block = true;
            return self.keep(raw);
        }
        if line.starts_with(":try_end") {
            self.in_try_block = false;
            return self.keep(raw);
        }
        if line.starts_with(':') {
            // A jump target: the constant may arrive from elsewhere.
            self.origins.clear();
            return self.keep(raw);
        }
        if line.starts_with(".class") {
            let name = line
                .split_whitespace()
                .last()
                .filter(|n| n.starts_with('L') && n.ends_with(';'))
                .ok_or_else(|| ParserError::ClassDeclaration(line.to_string()))?;
            self.class_name = Some(name.to_string());
            return self.keep(raw);
        }
        if line.starts_with(".method") || line == ".end method" {
            self.registers.clear();
            self.opaque.clear();
            self.origins.clear();
            self.pending = None;
            self.in_try_block = false;
            return self.keep(raw);
        }

        let instruction = match instruction::parse(line) {
            Ok(instruction) => instruction,
            Err(e) => {
                log::debug!("line {}: {e}", self.line_number);
                None
            }
        };

        if instruction.is_some() {
            // The destination itself is handled below; drop the high half of
            // a wide pair.
            for register in instruction::written_registers(line).into_iter().skip(1) {
                self.clobber(&register);
            }
        }

        match instruction {
            Some(Instruction::Const { register, value }) => {
                self.registers.set(&register, RegisterValue::Const(value));
                self.opaque.remove(&register);
                self.origins.insert(
                    register,
                    ConstOrigin {
                        output_index: self.output.len(),
                        in_try_block: self.in_try_block,
                    },
                );
                self.keep(raw)
            }
            Some(Instruction::InvokeStatic {
                registers,
                class_name,
                method,
                ..
            }) if registers.len() == 2 && self.target.matches_call(&class_name, &method) => {
                self.call(raw, line, &registers[0])
            }
            Some(Instruction::MoveResult {
                register,
                kind: MoveResultKind::Object,
            }) if self.pending.is_some() => self.move_result(raw, &register),
            Some(other) => {
                self.mark_used(line);
                if let Some(register) = other.defined_register() {
                    self.clobber(register);
                }
                self.keep(raw)
            }
            None => {
                self.mark_used(line);
                for register in instruction::written_registers(line) {
                    self.clobber(&register);
                }
                self.keep(raw)
            }
        }
    }

    /// Consume the rewriter.
    pub fn finish(self) -> Rewrite {
        Rewrite {
            text: self.output.concat(),
            replacements: self.replacements,
            changed: self.changed,
        }
    }

    fn keep(&mut self, raw: &str) -> Result<(), ParserError> {
        self.output.push(raw.to_string());
        Ok(())
    }

    fn replace(&mut self, raw: &str, replacement: String) {
        let (_, ending) = split_line_ending(raw);
        self.output.push(replacement + ending);
        self.changed = true;
    }

    /// Forget `register`; whatever it holds now is not a known constant.
    fn clobber(&mut self, register: &str) {
        self.registers.remove(register);
        self.origins.remove(register);
        self.opaque.insert(register.to_string());
    }

    /// Constants read by anything other than the recovery call stay in place.
    fn mark_used(&mut self, line: &str) {
        for register in instruction::referenced_registers(line) {
            self.origins.remove(&register);
        }
    }

    fn call(&mut self, raw: &str, line: &str, register: &str) -> Result<(), ParserError> {
        let Some(identifier) = self.registers.const_value(register) else {
            if self.opaque.contains(register) {
                log::warn!(
                    "line {}: {register} does not hold a constant, call left unchanged",
                    self.line_number
                );
                self.mark_used(line);
                return self.keep(raw);
            }
            if is_parameter_register(register) {
                log::warn!(
                    "line {}: identifier arrives in parameter {register}, call left unchanged",
                    self.line_number
                );
                self.mark_used(line);
                return self.keep(raw);
            }
            return Err(ParserError::RegisterNotFound(Box::new(Diagnostic {
                line_number: self.line_number,
                line: line.to_string(),
                register: register.to_string(),
                registers: self.registers.snapshot(),
            })));
        };

        let string = recovery::get_string(identifier, self.chunks).map_err(|source| {
            ParserError::Recovery {
                line: self.line_number,
                source,
            }
        })?;
        log::debug!("line {}: {}", self.line_number, string.listing());

        let origin = self.origins.remove(register);
        self.mark_used(line);
        self.pending = Some(Pending {
            register: register.to_string(),
            literal: string.to_literal(),
            origin,
        });
        self.replacements.push(Replacement {
            line: self.line_number,
            string,
        });

        if self.options.preserve_calls {
            self.keep(raw)
        } else {
            self.replace(raw, removal_line(self.in_try_block));
            Ok(())
        }
    }

    fn move_result(&mut self, raw: &str, register: &str) -> Result<(), ParserError> {
        let Some(pending) = self.pending.take() else {
            return self.keep(raw);
        };

        if !self.options.preserve_calls && pending.register == register {
            if let Some(origin) = pending.origin {
                if let Some(slot) = self.output.get_mut(origin.output_index) {
                    let (_, ending) = split_line_ending(slot);
                    *slot = removal_line(origin.in_try_block) + ending;
                }
            }
        }

        self.clobber(register);
        self.replace(
            raw,
            format!("    const-string {register}, \"{}\"", pending.literal),
        );
        Ok(())
    }
}

/// Rewrite a whole unit. Parameter-fed calls are logged and left alone; any
/// other error aborts the unit.
pub fn rewrite_source(
    source: &str,
    target: &MethodDescriptor,
    chunks: &ChunkSet,
    options: RewriteOptions,
) -> Result<Rewrite, ParserError> {
    let mut rewriter = Rewriter::new(target, chunks, options);
    for line in source.split_inclusive('\n') {
        rewriter.feed(line)?;
    }
    Ok(rewriter.finish())
}
