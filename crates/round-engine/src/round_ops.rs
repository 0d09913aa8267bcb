//! C5: builds the ordered sequence of `RoundOp`s that implement apply/undo
//! for one round-end (spec §4.5, §5).
//!
//! `RoundOps::build` is a pure function of `RoundContext`: no store access,
//! no I/O. Addresses are derived from public keys via
//! `ippan_round_types::generate_address`, which is itself pure, so this
//! module never needs an `AccountStore` handle.

use ippan_round_types::{AccountDiff, Block, PublicKey, RoundId, RoundOp};

/// Everything `RoundOps::build` needs to know about one round-end
/// transition, assembled by `RoundEngine` from `BlockStore`/`DelegateSlate`
/// reads before any op is built.
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub round: RoundId,
    pub backwards: bool,
    pub block: Block,
    pub finish_round: bool,
    pub active_delegates: u32,
    /// Present only when `finish_round`: the round's total fees.
    pub round_fees: i64,
    /// Present only when `finish_round`: per-height reward, height-ascending.
    pub round_rewards: Vec<i64>,
    /// Present only when `finish_round`: actual generator per height,
    /// height-ascending — the last entry is the round's last forger.
    pub round_delegates: Vec<PublicKey>,
    /// Present only when `finish_round`: `expected_slate(round) \ round_delegates`.
    pub round_outsiders: Vec<PublicKey>,
    pub dpos_v2: bool,
    /// Snapshot-mode round boundary, if a truncate is pending for this round.
    pub snapshot_round: Option<RoundId>,
}

pub struct RoundOps;

impl RoundOps {
    /// Ordering within a tick (spec §4.5): `[merge_block_generator,
    /// ...apply|undo, mark_block_id, (truncate?)]`.
    pub fn build(ctx: &RoundContext) -> Vec<RoundOp> {
        let mut ops = Vec::new();

        ops.push(Self::merge_block_generator(ctx));

        if ctx.finish_round {
            if ctx.backwards {
                ops.extend(Self::undo(ctx));
            } else {
                ops.extend(Self::apply(ctx));
            }
        }

        ops.push(Self::mark_block_id(ctx));

        if let Some(truncate_op) = Self::truncate_blocks(ctx) {
            ops.push(truncate_op);
        }

        ops
    }

    /// Credits the block's own reward, never its fee: fees are pooled for
    /// the whole round and only settled in `apply`/`undo` below. See
    /// DESIGN.md ("merge_block_generator vs. apply fee double-credit") for
    /// why this departs from a literal reading of spec §4.5.
    fn merge_block_generator(ctx: &RoundContext) -> RoundOp {
        let address = ippan_round_types::generate_address(&ctx.block.generator_public_key);
        let diff = AccountDiff::producer(ctx.round, ctx.block.reward, 0);
        let diff = if ctx.backwards { -diff } else { diff };
        RoundOp::MergeAccount { address, diff }
    }

    /// Forward settlement: per-delegate fee share plus the last forger's
    /// remainder, then one `missed_blocks` increment per outsider. Reward is
    /// not re-credited here — `merge_block_generator` already paid it out
    /// per block.
    fn apply(ctx: &RoundContext) -> Vec<RoundOp> {
        let n = ctx.active_delegates as usize;
        let (per_fee, remainder) = crate::round_math::split_fees(ctx.round_fees, n);
        let last_index = ctx.round_delegates.len().saturating_sub(1);

        let mut ops = Vec::with_capacity(ctx.round_delegates.len() + ctx.round_outsiders.len());
        for (i, pk) in ctx.round_delegates.iter().enumerate() {
            let mut diff = AccountDiff::settlement(ctx.round, per_fee, 0);
            if i == last_index {
                diff += AccountDiff::remainder(remainder);
            }
            ops.push(RoundOp::MergeAccount {
                address: ippan_round_types::generate_address(pk),
                diff,
            });
        }

        for pk in &ctx.round_outsiders {
            ops.push(RoundOp::MergeAccount {
                address: ippan_round_types::generate_address(pk),
                diff: AccountDiff::missed_block(),
            });
        }

        ops
    }

    /// Exact negation of `apply`, in reverse order: outsiders first, then
    /// delegate settlements from the last index back to zero (spec §4.5).
    fn undo(ctx: &RoundContext) -> Vec<RoundOp> {
        let n = ctx.active_delegates as usize;
        let (per_fee, remainder) = crate::round_math::split_fees(ctx.round_fees, n);
        let last_index = ctx.round_delegates.len().saturating_sub(1);

        let mut ops = Vec::with_capacity(ctx.round_delegates.len() + ctx.round_outsiders.len());

        for pk in ctx.round_outsiders.iter().rev() {
            ops.push(RoundOp::MergeAccount {
                address: ippan_round_types::generate_address(pk),
                diff: -AccountDiff::missed_block(),
            });
        }

        for (i, pk) in ctx.round_delegates.iter().enumerate().rev() {
            let mut diff = AccountDiff::settlement(ctx.round, per_fee, 0);
            if i == last_index {
                diff += AccountDiff::remainder(remainder);
            }
            ops.push(RoundOp::MergeAccount {
                address: ippan_round_types::generate_address(pk),
                diff: -diff,
            });
        }

        ops
    }

    fn mark_block_id(ctx: &RoundContext) -> RoundOp {
        RoundOp::MarkBlockId {
            height: ctx.block.height,
            block_id: ctx.block.id,
        }
    }

    fn truncate_blocks(ctx: &RoundContext) -> Option<RoundOp> {
        let snapshot_round = ctx.snapshot_round?;
        if !ctx.finish_round || snapshot_round != ctx.round {
            return None;
        }
        Some(RoundOp::TruncateBlocks {
            from_height: crate::round_math::first_in_round(ctx.round, ctx.active_delegates) - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64, generator: PublicKey) -> Block {
        Block::new(*blake3::hash(&height.to_be_bytes()).as_bytes(), height, generator, 500, 1_000)
    }

    fn base_ctx() -> RoundContext {
        RoundContext {
            round: 1,
            backwards: false,
            block: block(101, [9u8; 32]),
            finish_round: true,
            active_delegates: 101,
            round_fees: 10_000_000,
            round_rewards: vec![1_000; 101],
            round_delegates: (0..101u8).map(|i| [i; 32]).collect(),
            round_outsiders: vec![[201u8; 32]],
            dpos_v2: false,
            snapshot_round: None,
        }
    }

    #[test]
    fn build_orders_generator_settlement_mark() {
        let ctx = base_ctx();
        let ops = RoundOps::build(&ctx);

        assert!(matches!(ops[0], RoundOp::MergeAccount { .. }));
        // generator + 101 settlements + 1 outsider = 103, then mark = 104 ops.
        assert_eq!(ops.len(), 1 + 101 + 1 + 1);
        assert!(matches!(ops.last().unwrap(), RoundOp::MarkBlockId { .. }));
    }

    #[test]
    fn last_forger_receives_remainder() {
        let ctx = base_ctx();
        let ops = RoundOps::build(&ctx);
        let RoundOp::MergeAccount { diff, .. } = &ops[101] else {
            panic!("expected settlement op at index 101");
        };
        // per = floor(10_000_000/101) = 99_009, remainder = 91.
        assert_eq!(diff.fees, 99_009 + 91);
    }

    #[test]
    fn non_last_forger_receives_no_remainder() {
        let ctx = base_ctx();
        let ops = RoundOps::build(&ctx);
        let RoundOp::MergeAccount { diff, .. } = &ops[1] else {
            panic!("expected settlement op at index 1");
        };
        assert_eq!(diff.fees, 99_009);
    }

    #[test]
    fn undo_is_reverse_negation_of_apply() {
        let forward = base_ctx();
        let mut backward = forward.clone();
        backward.backwards = true;

        let forward_ops = RoundOps::build(&forward);
        let backward_ops = RoundOps::build(&backward);

        // Strip the leading generator op and trailing mark op from both;
        // the remaining settlement+outsider ops must be exact reverse
        // negations of one another.
        let forward_mid = &forward_ops[1..forward_ops.len() - 1];
        let mut backward_mid: Vec<_> = backward_ops[1..backward_ops.len() - 1].to_vec();
        backward_mid.reverse();

        for (f, b) in forward_mid.iter().zip(backward_mid.iter()) {
            let (RoundOp::MergeAccount { address: fa, diff: fd }, RoundOp::MergeAccount { address: ba, diff: bd }) = (f, b) else {
                panic!("expected MergeAccount ops");
            };
            assert_eq!(fa, ba);
            assert!((*fd + *bd).is_zero());
        }
    }

    #[test]
    fn no_settlement_ops_when_round_not_finishing() {
        let mut ctx = base_ctx();
        ctx.finish_round = false;
        let ops = RoundOps::build(&ctx);
        // Just the generator merge and the mark.
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn truncate_only_emitted_for_matching_snapshot_round() {
        let mut ctx = base_ctx();
        ctx.snapshot_round = Some(1);
        let ops = RoundOps::build(&ctx);
        assert!(matches!(ops.last().unwrap(), RoundOp::TruncateBlocks { .. }));

        let mut ctx2 = base_ctx();
        ctx2.snapshot_round = Some(2);
        let ops2 = RoundOps::build(&ctx2);
        assert!(!matches!(ops2.last().unwrap(), RoundOp::TruncateBlocks { .. }));
    }
}
