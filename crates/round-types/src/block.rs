//! The minimal block view this engine reads. The raw block/transaction data
//! model beyond these fields is owned by the surrounding pipeline (see
//! spec §1, "out of scope").

use crate::{Height, PublicKey};
use serde::{Deserialize, Serialize};

/// Canonical identifier for a block, used only to stamp round-end ops via
/// `mark_block_id` and to support idempotent replay detection.
pub type BlockId = [u8; 32];

/// The fields the round engine reads off a persisted block.
///
/// `round` is deliberately not a field here: it is always derived from
/// `height` via `RoundMath::round_of`, so there is no denormalized copy that
/// forward/backward application could disagree about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub height: Height,
    pub generator_public_key: PublicKey,
    /// Total fee collected by this block's transactions, in satoshi.
    pub total_fee: i64,
    /// Block reward for this height, in satoshi.
    pub reward: i64,
}

impl Block {
    pub fn new(
        id: BlockId,
        height: Height,
        generator_public_key: PublicKey,
        total_fee: i64,
        reward: i64,
    ) -> Self {
        Self {
            id,
            height,
            generator_public_key,
            total_fee,
            reward,
        }
    }
}
