//! Bit-exact replay of the runtime string-recovery routine.

pub mod fixed;
pub mod random;
pub mod recovery;
