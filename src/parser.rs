//! Register-tracking parser for one smali unit.
//!
//! A single forward pass over the lines of a class. Registers are tracked
//! symbolically (constant, string literal or string array being filled), which
//! is enough to see which identifier feeds each call to the recovery method
//! and what ends up in the chunk arrays stored by the static initializer.
//!
//! Control flow is not followed: values survive across labels and branches
//! exactly as they would in straight-line code, and the table is cleared at
//! every method boundary.

use crate::descriptor::{FieldDescriptor, MethodDescriptor, STRING_ARRAY_TYPE};
use crate::errors::{Diagnostic, ParserError};
use crate::instruction::{self, AccessOp, Instruction};
use crate::register::{RegisterValue, Registers};
use crate::utils::helpers::is_parameter_register;
use std::collections::{HashMap, HashSet};

/// Arrays larger than this are not tracked.
pub const MAX_ARRAY_SIZE: i64 = 0x10000;

/// A call to the recovery method with a statically known identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// 1-based line number of the `invoke-static`.
    pub line: usize,
    pub identifier: i64,
}

/// A declared field and, for string arrays, the value last committed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub descriptor: FieldDescriptor,
    pub value: Option<Vec<Option<String>>>,
}

/// A declared method with the facts discovery needs about its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub descriptor: MethodDescriptor,
    /// Every constant loaded in the body, in order.
    pub consts: Vec<i64>,
    /// Distinct static fields read with `sget*`, in first-read order.
    pub static_reads: Vec<FieldDescriptor>,
}

/// Everything learned from one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUnit {
    pub class_name: Option<String>,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
    pub call_sites: Vec<CallSite>,
}

impl ParsedUnit {
    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.descriptor.name == name)
    }
}

/// Line-at-a-time state machine. Feed every line with [`UnitParser::feed`],
/// then take the result with [`UnitParser::finish`].
#[derive(Debug, Default)]
pub struct UnitParser<'a> {
    target: Option<&'a MethodDescriptor>,
    class_name: Option<String>,
    current_method: Option<usize>,
    in_static_initializer: bool,
    in_try_block: bool,
    registers: Registers,
    /// Registers last written by something other than a tracked load.
    opaque: HashSet<String>,
    /// Register -> names of the fields whose value it holds.
    bindings: HashMap<String, Vec<String>>,
    fields: Vec<FieldRecord>,
    methods: Vec<MethodRecord>,
    call_sites: Vec<CallSite>,
    line_number: usize,
}

impl<'a> UnitParser<'a> {
    /// `target` is the recovery method; without one no call sites are collected.
    pub fn new(target: Option<&'a MethodDescriptor>) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn in_try_block(&self) -> bool {
        self.in_try_block
    }

    pub fn in_static_initializer(&self) -> bool {
        self.in_static_initializer
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Process the next line of the unit.
    pub fn feed(&mut self, raw: &str) -> Result<(), ParserError> {
        self.line_number += 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        if line.starts_with(":try_start") {
            self.in_try_block = true;
            return Ok(());
        }
        if line.starts_with(":try_end") {
            self.in_try_block = false;
            return Ok(());
        }

        if let Some(rest) = strip_directive(line, ".class") {
            self.class_name = Some(parse_class_name(rest).ok_or_else(|| {
                ParserError::ClassDeclaration(line.to_string())
            })?);
            return Ok(());
        }
        if strip_directive(line, ".field").is_some() {
            self.declare_field(line);
            return Ok(());
        }
        if strip_directive(line, ".method").is_some() {
            self.enter_method(line);
            return Ok(());
        }
        if line == ".end method" {
            self.leave_method();
            return Ok(());
        }

        let instruction = match instruction::parse(line) {
            Ok(Some(instruction)) => instruction,
            Ok(None) => {
                self.clobber_written(line, 0);
                return Ok(());
            }
            Err(e) => {
                log::debug!("line {}: {e}", self.line_number);
                self.clobber_written(line, 0);
                return Ok(());
            }
        };
        // The destination itself is handled by the instruction; only the
        // high half of a wide pair is dropped here.
        self.clobber_written(line, 1);
        self.execute(instruction, line)
    }

    /// Consume the parser. Arrays still bound to fields are committed.
    pub fn finish(mut self) -> ParsedUnit {
        self.commit_all();
        ParsedUnit {
            class_name: self.class_name,
            fields: self.fields,
            methods: self.methods,
            call_sites: self.call_sites,
        }
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn declare_field(&mut self, line: &str) {
        match FieldDescriptor::parse(line, self.class_name.as_deref()) {
            Ok(descriptor) => self.fields.push(FieldRecord {
                descriptor,
                value: None,
            }),
            Err(e) => log::debug!("line {}: {e}", self.line_number),
        }
    }

    fn enter_method(&mut self, line: &str) {
        self.reset_method_state();
        match MethodDescriptor::parse(line, self.class_name.as_deref()) {
            Ok(descriptor) => {
                self.in_static_initializer = descriptor.is_static_initializer();
                self.methods.push(MethodRecord {
                    descriptor,
                    consts: Vec::new(),
                    static_reads: Vec::new(),
                });
                self.current_method = Some(self.methods.len() - 1);
            }
            Err(e) => log::debug!("line {}: {e}", self.line_number),
        }
    }

    fn leave_method(&mut self) {
        self.commit_all();
        self.reset_method_state();
    }

    fn reset_method_state(&mut self) {
        self.current_method = None;
        self.in_static_initializer = false;
        self.in_try_block = false;
        self.registers.clear();
        self.opaque.clear();
        self.bindings.clear();
    }

    fn method_mut(&mut self) -> Option<&mut MethodRecord> {
        self.current_method.and_then(|i| self.methods.get_mut(i))
    }

    // -----------------------------------------------------------------------
    // Instructions
    // -----------------------------------------------------------------------

    fn execute(&mut self, instruction: Instruction, line: &str) -> Result<(), ParserError> {
        match instruction {
            Instruction::ConstString { register, value } => {
                self.overwrite(&register, RegisterValue::String(value));
            }
            Instruction::Const { register, value } => {
                self.overwrite(&register, RegisterValue::Const(value));
                if let Some(method) = self.method_mut() {
                    method.consts.push(value);
                }
            }
            Instruction::StaticField {
                op: AccessOp::Get,
                register,
                class_name,
                field_name,
                field_type,
            } => {
                let field = FieldDescriptor::new(Some(&class_name), &field_name, &field_type);
                if let Some(method) = self.method_mut() {
                    if !method.static_reads.iter().any(|f| f.same_field(&field)) {
                        method.static_reads.push(field);
                    }
                }
                self.invalidate(&register);
            }
            Instruction::StaticField {
                op: AccessOp::Put,
                register,
                class_name,
                field_name,
                ..
            } => self.bind_field(&register, &class_name, &field_name),
            Instruction::NewArray {
                register,
                size_register,
                type_descriptor,
            } => self.new_array(&register, &size_register, &type_descriptor),
            Instruction::ArrayAccess {
                op: AccessOp::Put,
                value_register,
                array_register,
                index_register,
            } => self.array_put(&value_register, &array_register, &index_register),
            Instruction::InvokeStatic {
                registers,
                class_name,
                method,
                ..
            } => self.invoke_static(&registers, &class_name, &method, line)?,
            other => {
                if let Some(register) = other.defined_register() {
                    self.invalidate(register);
                }
            }
        }
        Ok(())
    }

    fn new_array(&mut self, register: &str, size_register: &str, type_descriptor: &str) {
        if type_descriptor != STRING_ARRAY_TYPE {
            self.invalidate(register);
            return;
        }
        let size = match self.registers.const_value(size_register) {
            Some(size) if (0..=MAX_ARRAY_SIZE).contains(&size) => size,
            Some(size) => {
                log::warn!("line {}: array size {size} not tracked", self.line_number);
                self.invalidate(register);
                return;
            }
            None => {
                log::debug!(
                    "line {}: array size register {size_register} is not a known constant",
                    self.line_number
                );
                self.invalidate(register);
                return;
            }
        };
        self.overwrite(register, RegisterValue::new_array(size as usize));
    }

    fn array_put(&mut self, value_register: &str, array_register: &str, index_register: &str) {
        let all_tracked = [value_register, array_register, index_register]
            .iter()
            .all(|r| self.registers.contains(r));
        if !all_tracked {
            return;
        }
        if !self.registers.get(array_register).is_some_and(RegisterValue::is_array) {
            return;
        }
        let Some(value) = self
            .registers
            .get(value_register)
            .and_then(RegisterValue::as_string)
            .map(str::to_string)
        else {
            return;
        };
        let Some(index) = self.registers.const_value(index_register) else {
            log::warn!(
                "line {}: array index register {index_register} does not hold a constant",
                self.line_number
            );
            return;
        };

        let line_number = self.line_number;
        if let Some(RegisterValue::Array(slots)) = self.registers.get_mut(array_register) {
            let len = slots.len();
            match usize::try_from(index).ok().and_then(|i| slots.get_mut(i)) {
                Some(slot) => *slot = Some(value),
                None => log::warn!("line {line_number}: index {index} outside array of {len} slot(s)"),
            }
        }
    }

    fn bind_field(&mut self, register: &str, class_name: &str, field_name: &str) {
        if self.class_name.as_deref() != Some(class_name) || self.field_index(field_name).is_none() {
            return;
        }
        for fields in self.bindings.values_mut() {
            fields.retain(|f| f != field_name);
        }
        self.bindings
            .entry(register.to_string())
            .or_default()
            .push(field_name.to_string());
        self.commit(register);
    }

    fn invoke_static(
        &mut self,
        registers: &[String],
        class_name: &str,
        method: &str,
        line: &str,
    ) -> Result<(), ParserError> {
        let Some(target) = self.target else {
            return Ok(());
        };
        if registers.len() != 2 || !target.matches_call(class_name, method) {
            return Ok(());
        }

        let register = &registers[0];
        match self.registers.get(register) {
            Some(RegisterValue::Const(identifier)) => {
                self.call_sites.push(CallSite {
                    line: self.line_number,
                    identifier: *identifier,
                });
                Ok(())
            }
            Some(_) => {
                log::warn!(
                    "line {}: {register} does not hold a constant, call skipped",
                    self.line_number
                );
                Ok(())
            }
            None if self.opaque.contains(register) => {
                log::warn!(
                    "line {}: {register} was overwritten by an untracked instruction, call skipped",
                    self.line_number
                );
                Ok(())
            }
            None => {
                let diagnostic = Box::new(self.diagnostic(line, register));
                if is_parameter_register(register) {
                    Err(ParserError::ParametersNotSupported(diagnostic))
                } else {
                    Err(ParserError::RegisterNotFound(diagnostic))
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Register bookkeeping
    // -----------------------------------------------------------------------

    fn diagnostic(&self, line: &str, register: &str) -> Diagnostic {
        Diagnostic {
            line_number: self.line_number,
            line: line.to_string(),
            register: register.to_string(),
            registers: self.registers.snapshot(),
        }
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.descriptor.name == name)
    }

    /// Copy the array held by `register` into every field bound to it.
    fn commit(&mut self, register: &str) {
        let Some(RegisterValue::Array(slots)) = self.registers.get(register) else {
            return;
        };
        let Some(fields) = self.bindings.get(register) else {
            return;
        };
        for name in fields {
            if let Some(i) = self.fields.iter().position(|f| &f.descriptor.name == name) {
                log::debug!("committing {} slot(s) to field {name}", slots.len());
                self.fields[i].value = Some(slots.clone());
            }
        }
    }

    fn commit_all(&mut self) {
        let registers: Vec<String> = self.bindings.keys().cloned().collect();
        for register in registers {
            self.commit(&register);
        }
    }

    /// Commit any bound array, then forget the register. Its new value is
    /// unknown.
    fn invalidate(&mut self, register: &str) {
        self.commit(register);
        self.bindings.remove(register);
        self.registers.remove(register);
        self.opaque.insert(register.to_string());
    }

    fn overwrite(&mut self, register: &str, value: RegisterValue) {
        self.invalidate(register);
        self.opaque.remove(register);
        self.registers.set(register, value);
    }

    /// Invalidate every register `line` writes, skipping the first `skip`.
    fn clobber_written(&mut self, line: &str, skip: usize) {
        for register in instruction::written_registers(line).into_iter().skip(skip) {
            self.invalidate(&register);
        }
    }
}

fn strip_directive<'l>(line: &'l str, directive: &str) -> Option<&'l str> {
    let rest = line.strip_prefix(directive)?;
    rest.starts_with(char::is_whitespace).then_some(rest)
}

fn parse_class_name(rest: &str) -> Option<String> {
    let name = rest.split_whitespace().last()?;
    (name.starts_with('L') && name.ends_with(';') && name.len() > 2).then(|| name.to_string())
}

/// Parse a whole unit. Call sites fed by parameter registers are logged and
/// skipped; any other error aborts the unit.
pub fn parse_source(
    source: &str,
    target: Option<&MethodDescriptor>,
    origin: &str,
) -> Result<ParsedUnit, ParserError> {
    let mut parser = UnitParser::new(target);
    for line in source.lines() {
        if let Err(e) = parser.feed(line) {
            if e.is_recoverable() {
                log::warn!("{origin}: {e}");
            } else {
                return Err(e);
            }
        }
    }
    Ok(parser.finish())
}
