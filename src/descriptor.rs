//! Field and method descriptors.
//!
//! Parsed from `.field` / `.method` declarations and from `Lcls;->name...`
//! references, rendered back to smali, and used as keys when correlating
//! the chunk field and the recovery method across the corpus.

use crate::errors::DescriptorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The descriptor of a `String[]`, the type of every chunk field.
pub const STRING_ARRAY_TYPE: &str = "[Ljava/lang/String;";

const PRIMITIVES: &str = "VZBSCIJFD";

/// Split a concatenated type list (`"I[JLjava/lang/String;"`) into tokens.
///
/// Grammar: any number of `[`, then either one primitive code or an
/// `L...;` class name.
pub fn split_type_list(data: &str) -> Result<Vec<String>, DescriptorError> {
    let bytes = data.as_bytes();
    let mut types = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i] == b'[' {
            i += 1;
        }
        let malformed = || DescriptorError::MalformedType {
            descriptor: data.to_string(),
            offset: start,
        };
        match bytes.get(i) {
            Some(b'L') => {
                let end = data[i..].find(';').ok_or_else(malformed)?;
                i += end + 1;
            }
            Some(c) if PRIMITIVES.as_bytes().contains(c) => i += 1,
            _ => return Err(malformed()),
        }
        types.push(data[start..i].to_string());
    }

    Ok(types)
}

/// Parse a single complete type descriptor.
pub fn parse_type(data: &str) -> Result<String, DescriptorError> {
    match split_type_list(data)?.as_slice() {
        [single] => Ok(single.clone()),
        _ => Err(DescriptorError::MalformedType {
            descriptor: data.to_string(),
            offset: 0,
        }),
    }
}

/// Split `name(args)ret` into its three parts.
pub fn parse_method_signature(data: &str) -> Result<(String, Vec<String>, String), DescriptorError> {
    let malformed = || DescriptorError::MalformedSignature(data.to_string());
    let (name, rest) = data.split_once('(').ok_or_else(malformed)?;
    let (arguments, return_type) = rest.split_once(')').ok_or_else(malformed)?;
    if name.is_empty() {
        return Err(malformed());
    }
    Ok((
        name.to_string(),
        split_type_list(arguments)?,
        parse_type(return_type)?,
    ))
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A static or instance field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub class_name: Option<String>,
    pub name: String,
    pub type_descriptor: String,
    pub modifiers: Vec<String>,
    pub init_value: Option<String>,
}

impl FieldDescriptor {
    /// Create a field reference without modifiers or initial value.
    pub fn new(class_name: Option<&str>, name: &str, type_descriptor: &str) -> Self {
        Self {
            class_name: class_name.map(str::to_string),
            name: name.to_string(),
            type_descriptor: type_descriptor.to_string(),
            modifiers: Vec::new(),
            init_value: None,
        }
    }

    /// Parse a `.field` declaration line.
    pub fn parse(line: &str, class_name: Option<&str>) -> Result<Self, DescriptorError> {
        let not_a_field = || DescriptorError::NotAField(line.to_string());
        let body = line.trim().strip_prefix(".field").ok_or_else(not_a_field)?;
        if !body.starts_with(char::is_whitespace) {
            return Err(not_a_field());
        }

        let (decl, init_value) = match body.split_once(" = ") {
            Some((decl, value)) => (decl, Some(value.trim().to_string())),
            None => (body, None),
        };

        let mut parts: Vec<&str> = decl.split_whitespace().collect();
        let name_and_type = parts.pop().ok_or_else(not_a_field)?;
        let (name, type_descriptor) = name_and_type.rsplit_once(':').ok_or_else(not_a_field)?;
        if name.is_empty() {
            return Err(not_a_field());
        }

        Ok(Self {
            class_name: class_name.map(str::to_string),
            name: name.to_string(),
            type_descriptor: parse_type(type_descriptor)?,
            modifiers: parts.into_iter().map(str::to_string).collect(),
            init_value,
        })
    }

    /// Render back into a `.field` declaration.
    pub fn to_smali(&self) -> String {
        let mut out = String::from(".field");
        for m in &self.modifiers {
            out.push(' ');
            out.push_str(m);
        }
        out.push_str(&format!(" {}:{}", self.name, self.type_descriptor));
        if let Some(value) = &self.init_value {
            out.push_str(&format!(" = {value}"));
        }
        out
    }

    /// Same class and name, ignoring modifiers and initial value.
    pub fn same_field(&self, other: &FieldDescriptor) -> bool {
        self.class_name == other.class_name && self.name == other.name
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}:{}",
            self.class_name.as_deref().unwrap_or("?"),
            self.name,
            self.type_descriptor
        )
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// A method declaration or reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub class_name: Option<String>,
    pub name: String,
    pub arguments: Vec<String>,
    pub return_type: String,
    pub modifiers: Vec<String>,
}

impl MethodDescriptor {
    /// Parse a `.method` declaration line.
    pub fn parse(line: &str, class_name: Option<&str>) -> Result<Self, DescriptorError> {
        let not_a_method = || DescriptorError::NotAMethod(line.to_string());
        let body = line.trim().strip_prefix(".method").ok_or_else(not_a_method)?;
        if !body.starts_with(char::is_whitespace) {
            return Err(not_a_method());
        }

        let mut parts: Vec<&str> = body.split_whitespace().collect();
        let signature = parts.pop().ok_or_else(not_a_method)?;
        let (name, arguments, return_type) = parse_method_signature(signature)?;

        Ok(Self {
            class_name: class_name.map(str::to_string),
            name,
            arguments,
            return_type,
            modifiers: parts.into_iter().map(str::to_string).collect(),
        })
    }

    /// Parse a reference such as `Lfoo;->bar(J)Ljava/lang/String;`.
    pub fn from_reference(reference: &str) -> Result<Self, DescriptorError> {
        let malformed = || DescriptorError::MalformedSignature(reference.to_string());
        let (class_name, signature) = reference.trim().split_once("->").ok_or_else(malformed)?;
        let class_name = parse_type(class_name)?;
        if !class_name.starts_with('L') {
            return Err(malformed());
        }
        let (name, arguments, return_type) = parse_method_signature(signature)?;
        Ok(Self {
            class_name: Some(class_name),
            name,
            arguments,
            return_type,
            modifiers: Vec::new(),
        })
    }

    /// `name(args)ret`.
    pub fn signature(&self) -> String {
        format!("{}({}){}", self.name, self.arguments.concat(), self.return_type)
    }

    /// `Lcls;->name(args)ret`.
    pub fn to_reference(&self) -> String {
        format!("{}->{}", self.class_name.as_deref().unwrap_or("?"), self.signature())
    }

    /// Render back into a `.method` declaration.
    pub fn to_smali(&self) -> String {
        let mut out = String::from(".method");
        for m in &self.modifiers {
            out.push(' ');
            out.push_str(m);
        }
        out.push(' ');
        out.push_str(&self.signature());
        out
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// `static constructor <clinit>()V`.
    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>" && self.has_modifier("static") && self.has_modifier("constructor")
    }

    /// Whether an invocation of `class_name->signature` targets this method.
    /// Modifiers are not part of a call, so they are not compared.
    pub fn matches_call(&self, class_name: &str, signature: &str) -> bool {
        if self.class_name.as_deref() != Some(class_name) {
            return false;
        }
        match parse_method_signature(signature) {
            Ok((name, arguments, return_type)) => {
                name == self.name && arguments == self.arguments && return_type == self.return_type
            }
            Err(_) => false,
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_reference())
    }
}
