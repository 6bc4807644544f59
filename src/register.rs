//! Symbolic register table used by the parser and the rewriter.

use serde::Serialize;
use std::collections::BTreeMap;

/// The value a register is statically known to hold.
///
/// Strings and array slots keep the raw escaped literal exactly as it
/// appeared in the source, so chunk data survives untouched until it is
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RegisterValue {
    Const(i64),
    String(String),
    Array(Vec<Option<String>>),
}

impl RegisterValue {
    /// Fresh array-in-progress with every slot empty.
    pub fn new_array(size: usize) -> Self {
        RegisterValue::Array(vec![None; size])
    }

    pub fn as_const(&self) -> Option<i64> {
        match self {
            RegisterValue::Const(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            RegisterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, RegisterValue::Array(_))
    }
}

/// Register name to symbolic value, scoped to one method body.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    values: BTreeMap<String, RegisterValue>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, register: &str) -> Option<&RegisterValue> {
        self.values.get(register)
    }

    pub fn get_mut(&mut self, register: &str) -> Option<&mut RegisterValue> {
        self.values.get_mut(register)
    }

    pub fn contains(&self, register: &str) -> bool {
        self.values.contains_key(register)
    }

    /// Replace whatever the register held, returning the previous value.
    pub fn set(&mut self, register: &str, value: RegisterValue) -> Option<RegisterValue> {
        self.values.insert(register.to_string(), value)
    }

    pub fn remove(&mut self, register: &str) -> Option<RegisterValue> {
        self.values.remove(register)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Constant held by `register`, if any.
    pub fn const_value(&self, register: &str) -> Option<i64> {
        self.get(register).and_then(RegisterValue::as_const)
    }

    /// Copy of the whole table, for diagnostics.
    pub fn snapshot(&self) -> BTreeMap<String, RegisterValue> {
        self.values.clone()
    }
}
