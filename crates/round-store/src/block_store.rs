//! The `BlockStore` interface the engine reads blocks through, and the
//! summary it hands back for one round (spec §4.3, §6).

use ippan_round_types::{Block, BlockId, Height, PublicKey, RoundId, StoreError};

/// The persisted facts a round-end settlement needs: total fees, the
/// per-height reward schedule actually paid, and the generator of each
/// height, all in height-ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub fees: i64,
    pub rewards: Vec<i64>,
    pub delegates: Vec<PublicKey>,
}

impl RoundSummary {
    pub fn heights_in_round(&self) -> usize {
        self.delegates.len()
    }
}

pub trait BlockStore {
    /// Sum round `round` (whose slate is sized `n`) from persisted blocks.
    ///
    /// Sums the height-ascending *prefix* of `first_in_round(round, n)..=
    /// last_in_round(round, n)` that is actually persisted, stopping at the
    /// first missing height rather than erroring. This is what lets the
    /// genesis block's own `tick` (height 1, always a round-end per spec
    /// §4.1) summarize correctly before the rest of round 1 has been mined:
    /// it finds exactly the one persisted block and returns a
    /// single-delegate summary, with no special-cased round-1 read path.
    fn sum_round(&self, n: usize, round: RoundId) -> Result<RoundSummary, StoreError>;

    fn find_by_height(&self, height: Height) -> Result<Option<Block>, StoreError>;

    fn find_by_id(&self, id: BlockId) -> Result<Option<Block>, StoreError>;

    /// Snapshot mode only (spec §4.6): drop all persisted blocks above
    /// `from_height`.
    fn truncate_blocks(&self, from_height: Height) -> Result<(), StoreError>;

    /// Stamp the block id that caused a round-end op batch, enabling
    /// idempotent replay detection.
    fn mark_block_id(&self, height: Height, id: BlockId) -> Result<(), StoreError>;
}
