//! Additive deltas queued against a delegate account.
//!
//! `AccountDiff` is never applied eagerly (spec §4.2): `RoundOps` builds a
//! sequence of `RoundOp::MergeAccount { diff, .. }` values, and the supplied
//! `RoundTransaction` is the only thing that actually mutates stored state.
//! `Neg` makes `undo()` a mechanical negation of `apply()` rather than a
//! hand-duplicated mirror implementation.

use crate::RoundId;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg};

/// Explicit push/pop of a round id onto a delegate's audit trail. Kept
/// separate from the numeric fields so `Neg` never has to guess intent from
/// a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Push(RoundId),
    Pop(RoundId),
}

impl AuditAction {
    fn negate(self) -> Self {
        match self {
            AuditAction::Push(r) => AuditAction::Pop(r),
            AuditAction::Pop(r) => AuditAction::Push(r),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDiff {
    pub balance: i64,
    pub u_balance: i64,
    pub vote: i64,
    pub votes_weight: i64,
    pub produced_blocks: i64,
    pub missed_blocks: i64,
    pub fees: i64,
    pub rewards: i64,
    pub round_audit: Option<AuditAction>,
}

impl AccountDiff {
    pub fn producer(round: RoundId, reward: i64, fee: i64) -> Self {
        Self {
            balance: reward + fee,
            u_balance: reward + fee,
            produced_blocks: 1,
            rewards: reward,
            fees: fee,
            round_audit: Some(AuditAction::Push(round)),
            ..Default::default()
        }
    }

    pub fn settlement(round: RoundId, per_fee: i64, per_reward: i64) -> Self {
        Self {
            balance: per_fee + per_reward,
            u_balance: per_fee + per_reward,
            fees: per_fee,
            rewards: per_reward,
            round_audit: Some(AuditAction::Push(round)),
            ..Default::default()
        }
    }

    pub fn remainder(amount: i64) -> Self {
        Self {
            balance: amount,
            u_balance: amount,
            fees: amount,
            ..Default::default()
        }
    }

    pub fn missed_block() -> Self {
        Self {
            missed_blocks: 1,
            ..Default::default()
        }
    }

    /// True when every numeric delta is zero; ignores `round_audit`, which
    /// carries no quantity to cancel out.
    pub fn is_zero(&self) -> bool {
        self.balance == 0
            && self.u_balance == 0
            && self.vote == 0
            && self.votes_weight == 0
            && self.produced_blocks == 0
            && self.missed_blocks == 0
            && self.fees == 0
            && self.rewards == 0
    }
}

impl Add for AccountDiff {
    type Output = AccountDiff;

    fn add(self, other: AccountDiff) -> AccountDiff {
        AccountDiff {
            balance: self.balance + other.balance,
            u_balance: self.u_balance + other.u_balance,
            vote: self.vote + other.vote,
            votes_weight: self.votes_weight + other.votes_weight,
            produced_blocks: self.produced_blocks + other.produced_blocks,
            missed_blocks: self.missed_blocks + other.missed_blocks,
            fees: self.fees + other.fees,
            rewards: self.rewards + other.rewards,
            round_audit: other.round_audit.or(self.round_audit),
        }
    }
}

impl AddAssign for AccountDiff {
    fn add_assign(&mut self, other: AccountDiff) {
        *self = *self + other;
    }
}

impl Neg for AccountDiff {
    type Output = AccountDiff;

    fn neg(self) -> AccountDiff {
        AccountDiff {
            balance: -self.balance,
            u_balance: -self.u_balance,
            vote: -self.vote,
            votes_weight: -self.votes_weight,
            produced_blocks: -self.produced_blocks,
            missed_blocks: -self.missed_blocks,
            fees: -self.fees,
            rewards: -self.rewards,
            round_audit: self.round_audit.map(AuditAction::negate),
        }
    }
}
