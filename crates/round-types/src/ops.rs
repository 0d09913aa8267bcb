//! The tagged sum of database operations `RoundOps` emits (spec §4.5, §9).
//!
//! Keeping this a closed enum rather than a trait object means a
//! `RoundTransaction` implementation can exhaustively match it, and tests can
//! assert on the exact emitted sequence.

use crate::{Address, AccountDiff, BlockId, Height};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoundOp {
    /// Merge an additive diff into one delegate's account.
    MergeAccount { address: Address, diff: AccountDiff },
    /// Stamp the block id that produced this op batch, for idempotent replay
    /// detection.
    MarkBlockId { height: Height, block_id: BlockId },
    /// Snapshot-mode only: drop all persisted blocks above `from_height`.
    TruncateBlocks { from_height: Height },
}
