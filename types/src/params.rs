//! Protocol parameters: heights, ranks and quorum sizes.

/// Index of the consensus slot a block belongs to. Monotonically increasing.
pub type Height = u64;

/// Identifies the replica designated as proposer for a round.
pub type Rank = u64;

/// How far ahead of the current height a message may be and still be
/// buffered. Anything further ahead is dropped.
pub const HEIGHT_CEILING: Height = 1000;

/// Maximum number of Byzantine replicas tolerated by `n` replicas.
pub fn max_faulty(n: usize) -> usize {
    n.saturating_sub(1) / 3
}

/// Number of distinct signatures needed for a quorum among `n` replicas
/// (`2f + 1`).
pub fn quorum(n: usize) -> usize {
    2 * max_faulty(n) + 1
}
