//! Invariant ceilings shared across the tree and overflow chains.

/// Inline record-pointer capacity of one leaf slot before the overflow chain
/// is allocated. Kept at the source's choice of 8 (inline, not out-of-line).
pub const IN_BLOCK_RECORDS: usize = 8;

/// Tree depth ceiling. Exceeding it on descent indicates corruption.
pub const MAX_HEIGHT: usize = 20;

/// Ceiling on overflow chain length walked for one leaf slot. Exceeding it
/// indicates corruption (a chain that never terminates).
pub const MAX_OVERFLOW_BLOCKS: usize = 10_000;
