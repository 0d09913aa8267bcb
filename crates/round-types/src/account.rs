//! Delegate account state, mutated only by queued `AccountDiff`s applied
//! through a `RoundTransaction` (never directly).

use crate::diff::{AccountDiff, AuditAction};
use crate::{Address, EngineError, PublicKey, RoundId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateAccount {
    pub public_key: PublicKey,
    pub address: Address,
    pub balance: i64,
    pub u_balance: i64,
    pub vote: i64,
    pub votes_weight: i64,
    pub produced_blocks: u64,
    pub missed_blocks: u64,
    pub fees: i64,
    pub rewards: i64,
    /// 1-based rank by `vote DESC`; populated by the caller after a v1/v2
    /// slate rebuild, not by the engine itself.
    pub rank: Option<u32>,
    /// Round ids this delegate's balance was touched by a round-end
    /// settlement, oldest first. Used for reversal bookkeeping and audit.
    pub round_audit: Vec<RoundId>,
}

impl DelegateAccount {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            address: crate::address::generate_address(&public_key),
            balance: 0,
            u_balance: 0,
            vote: 0,
            votes_weight: 0,
            produced_blocks: 0,
            missed_blocks: 0,
            fees: 0,
            rewards: 0,
            rank: None,
            round_audit: Vec::new(),
        }
    }

    /// Apply a diff in place. `produced_blocks`/`missed_blocks` are stored
    /// unsigned; the signed diff is clamped at zero so that well-formed
    /// apply/undo pairs always land back on the original value without ever
    /// observing a negative intermediate (undo decrements only ever cancel a
    /// prior increment in the same transaction).
    ///
    /// Every accumulator uses `checked_add` (spec §7: overflow is
    /// "Arithmetic" class, treated as `InvariantViolation`, never a silent
    /// wraparound) and returns `EngineError::Arithmetic` the moment one
    /// overflows, before any later field in the same diff is touched.
    pub fn apply_diff(&mut self, diff: &AccountDiff) -> Result<(), EngineError> {
        self.balance = self
            .balance
            .checked_add(diff.balance)
            .ok_or_else(|| EngineError::arithmetic("balance overflow"))?;
        self.u_balance = self
            .u_balance
            .checked_add(diff.u_balance)
            .ok_or_else(|| EngineError::arithmetic("u_balance overflow"))?;
        self.vote = self
            .vote
            .checked_add(diff.vote)
            .ok_or_else(|| EngineError::arithmetic("vote overflow"))?;
        self.votes_weight = self
            .votes_weight
            .checked_add(diff.votes_weight)
            .ok_or_else(|| EngineError::arithmetic("votes_weight overflow"))?;
        self.produced_blocks = (self.produced_blocks as i64)
            .checked_add(diff.produced_blocks)
            .ok_or_else(|| EngineError::arithmetic("produced_blocks overflow"))?
            .max(0) as u64;
        self.missed_blocks = (self.missed_blocks as i64)
            .checked_add(diff.missed_blocks)
            .ok_or_else(|| EngineError::arithmetic("missed_blocks overflow"))?
            .max(0) as u64;
        self.fees = self
            .fees
            .checked_add(diff.fees)
            .ok_or_else(|| EngineError::arithmetic("fees overflow"))?;
        self.rewards = self
            .rewards
            .checked_add(diff.rewards)
            .ok_or_else(|| EngineError::arithmetic("rewards overflow"))?;

        match diff.round_audit {
            Some(AuditAction::Push(round)) => self.round_audit.push(round),
            Some(AuditAction::Pop(round)) => {
                if let Some(pos) = self.round_audit.iter().rposition(|r| *r == round) {
                    self.round_audit.remove(pos);
                }
            }
            None => {}
        }
        Ok(())
    }
}

/// Query filter passed to `AccountStore::get`/`get_all`.
#[derive(Debug, Clone, Default)]
pub enum AccountFilter {
    #[default]
    All,
    ByAddress(Address),
    ByPublicKey(PublicKey),
    /// Delegates with `vote > 0` (v1 slate candidates).
    VotingDelegates,
    /// Non-banned delegates with `votes_weight > 0` (v2 slate candidates).
    WeightedDelegates,
}
