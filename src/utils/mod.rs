//! Shared helpers.

pub mod helpers;
pub mod literal;
