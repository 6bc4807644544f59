//! Locating the recovery method and its chunk array across a corpus.
//!
//! Paranoid generates one `static String getString(long)` helper that reads a
//! single `String[]` field filled in a static initializer. Both are found from
//! the first-pass [`ParsedUnit`]s of every class.

use crate::core::recovery::ChunkSet;
use crate::descriptor::{FieldDescriptor, MethodDescriptor, STRING_ARRAY_TYPE};
use crate::errors::DiscoveryError;
use crate::parser::{MethodRecord, ParsedUnit};
use crate::utils::literal;

pub const RECOVERY_ARGUMENTS: &[&str] = &["J"];
pub const RECOVERY_RETURN_TYPE: &str = "Ljava/lang/String;";

/// The recovery method, the field it reads and the decoded chunk pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub target: MethodDescriptor,
    pub chunk_field: FieldDescriptor,
    /// Chunks as escaped literal bodies, exactly as found in the source.
    pub chunk_literals: Vec<String>,
    pub chunks: ChunkSet,
}

/// String-array fields read by `method`.
fn string_array_reads(method: &MethodRecord) -> Vec<&FieldDescriptor> {
    method
        .static_reads
        .iter()
        .filter(|f| f.type_descriptor == STRING_ARRAY_TYPE)
        .collect()
}

/// Whether `method` looks like the generated `getString(long)`.
pub fn is_recovery_candidate(method: &MethodRecord, signature_consts: &[i64]) -> bool {
    let d = &method.descriptor;
    d.arguments.iter().map(String::as_str).eq(RECOVERY_ARGUMENTS.iter().copied())
        && d.return_type == RECOVERY_RETURN_TYPE
        && d.has_modifier("static")
        && signature_consts.iter().all(|c| method.consts.contains(c))
        && !string_array_reads(method).is_empty()
}

/// Pick the single recovery method and decode the chunks it reads.
pub fn resolve(units: &[ParsedUnit], signature_consts: &[i64]) -> Result<Discovery, DiscoveryError> {
    let candidates: Vec<&MethodRecord> = units
        .iter()
        .flat_map(|u| u.methods.iter())
        .filter(|m| is_recovery_candidate(m, signature_consts))
        .collect();

    let method = match candidates.as_slice() {
        [] => return Err(DiscoveryError::NoRecoveryMethod),
        [method] => *method,
        many => return Err(DiscoveryError::AmbiguousRecoveryMethod(many.len())),
    };
    log::debug!("recovery method: {}", method.descriptor);

    let chunk_field = match string_array_reads(method).as_slice() {
        [field] => (*field).clone(),
        many => return Err(DiscoveryError::AmbiguousChunkField(many.len())),
    };
    log::debug!("chunk field: {chunk_field}");

    let value = units
        .iter()
        .filter(|u| u.class_name == chunk_field.class_name)
        .find_map(|u| u.field(&chunk_field.name))
        .and_then(|f| f.value.clone())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DiscoveryError::ChunksNotFound(chunk_field.to_string()))?;

    let chunk_literals = value
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| DiscoveryError::IncompleteChunks {
                field: chunk_field.to_string(),
                index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let pages = chunk_literals
        .iter()
        .enumerate()
        .map(|(index, l)| {
            literal::unescape(l).map_err(|source| DiscoveryError::InvalidChunk { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("{} chunk(s) decoded", pages.len());

    Ok(Discovery {
        target: method.descriptor.clone(),
        chunk_field,
        chunk_literals,
        chunks: ChunkSet::new(pages),
    })
}
