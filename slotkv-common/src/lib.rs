// slotkv-common - Shared error taxonomy, slot constants, and record model
//
// This crate defines the types shared by the slot client and its host shells

pub mod error;
pub mod record;

// Re-export for convenience
pub use error::*;
pub use record::*;

/// Number of connection slots in a slot table (fixed at compile time).
pub const NUM_SLOTS: usize = 16;

/// Maximum positional arguments accepted by the fixed-arity command path.
pub const MAX_FIXED_ARGS: usize = 4;
