//! C6: orchestrates `tick`/`backward_tick` (spec §4.6).
//!
//! `RoundEngine` owns no store state itself — it is handed read access to an
//! `AccountStore`/`BlockStore` pair and a `&mut dyn RoundTransaction` to
//! write through, per the injected-interfaces design note (spec §9). The
//! engine commits nothing; the caller's transaction is the unit of
//! atomicity (spec §3, §5).

use ippan_round_types::{AccountFilter, Block, EngineError, Height, PublicKey, RoundId};
use ippan_round_store::{AccountStore, BlockStore, RoundTransaction};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::app_state::RoundAppState;
use crate::config::EngineConfig;
use crate::delegate_slate;
use crate::event_bus::{RoundEvent, RoundEventBus};
use crate::round_math;
use crate::round_ops::{RoundContext, RoundOps};

pub struct RoundEngine {
    config: EngineConfig,
    state: RoundAppState,
    events: RoundEventBus,
    /// Expected slate per round, computed once and reused (spec §4.4
    /// Contract: "pure function of the persisted state visible before
    /// height `first_in_round(round_of(height))` ... Callers cache
    /// per-round"). Without this, a `backward_tick` issued after vote/unvote
    /// activity has moved the account table would recompute a different
    /// slate than the original `tick` saw, corrupting outsider detection
    /// (invariant 4) and breaking exact reversal (invariant 5).
    slate_cache: Mutex<HashMap<RoundId, Vec<PublicKey>>>,
}

/// Clears `rounds.isTicking` on every exit path, including early returns via
/// `?` (spec invariant 6: "always cleared on every exit path").
struct TickGuard<'a> {
    state: &'a RoundAppState,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.state.end_tick();
    }
}

impl RoundEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: RoundAppState::new(),
            events: RoundEventBus::default(),
            slate_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_state(config: EngineConfig, state: RoundAppState, events: RoundEventBus) -> Self {
        Self {
            config,
            state,
            events,
            slate_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn app_state(&self) -> &RoundAppState {
        &self.state
    }

    pub fn events(&self) -> &RoundEventBus {
        &self.events
    }

    /// Marks the pipeline as having finished initial load; writable only by
    /// the pipeline bootstrap (spec §5).
    pub fn on_blockchain_ready(&self) {
        self.state.set_loaded(true);
    }

    /// Resets any stuck `isTicking` flag left over from a crash between
    /// ticks. Idempotent.
    pub fn cleanup(&self) -> Result<(), EngineError> {
        self.state.end_tick();
        Ok(())
    }

    /// Forward application of one block's round-level effects (spec §4.6).
    pub fn tick(
        &self,
        block: &Block,
        accounts: &dyn AccountStore,
        blocks: &dyn BlockStore,
        txn: &mut dyn RoundTransaction,
    ) -> Result<(), EngineError> {
        if !self.state.begin_tick() {
            return Err(EngineError::invariant(
                "tick already in flight on this engine instance",
            ));
        }
        let _guard = TickGuard { state: &self.state };

        let round = round_math::round_of(block.height, self.config.active_delegates);
        let finish_round = round_math::is_round_end(block.height, self.config.active_delegates);

        let (round_fees, round_rewards, round_delegates, round_outsiders) = if finish_round {
            let summary = self.summarize_round(block, round, accounts, blocks)?;
            summary
        } else {
            (0, Vec::new(), Vec::new(), Vec::new())
        };

        let ctx = RoundContext {
            round,
            backwards: false,
            block: *block,
            finish_round,
            active_delegates: self.config.active_delegates,
            round_fees,
            round_rewards,
            round_delegates,
            round_outsiders,
            dpos_v2: self.config.uses_v2(block.height),
            snapshot_round: self.state.snapshot_round(),
        };

        self.execute(&ctx, txn)?;

        if finish_round {
            info!(target: "round_engine", round, height = block.height, "round finished");
            self.events.publish(RoundEvent::FinishRound(round));
        }

        Ok(())
    }

    /// Reversal of `tick` for the same block (spec §4.6).
    pub fn backward_tick(
        &self,
        block: &Block,
        previous: &Block,
        accounts: &dyn AccountStore,
        blocks: &dyn BlockStore,
        txn: &mut dyn RoundTransaction,
    ) -> Result<(), EngineError> {
        if !self.state.begin_tick() {
            return Err(EngineError::invariant(
                "tick already in flight on this engine instance",
            ));
        }
        let _guard = TickGuard { state: &self.state };

        if block.height > 1 && previous.height != block.height - 1 {
            return Err(EngineError::invariant(format!(
                "backward_tick: previous.height {} is not block.height {} - 1",
                previous.height, block.height
            )));
        }

        self.events.publish(RoundEvent::RoundBackwardTick {
            height: block.height,
            block_id: block.id,
        });

        let round = round_math::round_of(block.height, self.config.active_delegates);
        let finish_round = round_math::is_round_end(block.height, self.config.active_delegates);

        let (round_fees, round_rewards, round_delegates, round_outsiders) = if finish_round {
            self.summarize_round(block, round, accounts, blocks)?
        } else {
            (0, Vec::new(), Vec::new(), Vec::new())
        };

        let ctx = RoundContext {
            round,
            backwards: true,
            block: *block,
            finish_round,
            active_delegates: self.config.active_delegates,
            round_fees,
            round_rewards,
            round_delegates,
            round_outsiders,
            dpos_v2: self.config.uses_v2(block.height),
            snapshot_round: self.state.snapshot_round(),
        };

        self.execute(&ctx, txn)
    }

    fn execute(
        &self,
        ctx: &RoundContext,
        txn: &mut dyn RoundTransaction,
    ) -> Result<(), EngineError> {
        let ops = RoundOps::build(ctx);
        debug!(target: "round_engine", count = ops.len(), round = ctx.round, backwards = ctx.backwards, "executing round ops");
        for op in &ops {
            txn.apply(op)?;
        }
        Ok(())
    }

    /// Sums the round's blocks, applies the genesis correction (spec §4.6
    /// step 3), and computes outsiders (spec §4.6 step 4).
    fn summarize_round(
        &self,
        block: &Block,
        round: RoundId,
        accounts: &dyn AccountStore,
        blocks: &dyn BlockStore,
    ) -> Result<(i64, Vec<i64>, Vec<PublicKey>, Vec<PublicKey>), EngineError> {
        let summary = blocks.sum_round(self.config.active_delegates as usize, round)?;

        let (round_fees, round_rewards, round_delegates) =
            if block.height == 1 && summary.delegates.len() != 1 {
                (0, vec![0], vec![block.generator_public_key])
            } else {
                (summary.fees, summary.rewards, summary.delegates)
            };

        let expected_slate = self.expected_slate(round, block.height, accounts, blocks)?;

        let actual: HashSet<PublicKey> = round_delegates.iter().copied().collect();
        let round_outsiders: Vec<PublicKey> = expected_slate
            .into_iter()
            .filter(|pk| !actual.contains(pk))
            .collect();

        if !round_outsiders.is_empty() {
            warn!(
                target: "round_engine",
                round,
                outsiders = round_outsiders.len(),
                "round finished with outsiders"
            );
        }

        // Resolve each outsider to its address up front so a bad public key
        // (one no account exists for) fails the tick before any op is
        // queued, rather than surfacing as a write error mid-transaction.
        for pk in &round_outsiders {
            accounts.get(&AccountFilter::ByPublicKey(*pk))?;
        }

        Ok((round_fees, round_rewards, round_delegates, round_outsiders))
    }

    /// Returns round `round`'s expected slate, computing it via
    /// `DelegateSlate::generate_list` on first use and caching the result so
    /// every later call for the same round — in particular, a `tick` and the
    /// `backward_tick` that later reverses it — observes the identical slate
    /// regardless of what the account table looks like by then (spec §4.4).
    fn expected_slate(
        &self,
        round: RoundId,
        height: Height,
        accounts: &dyn AccountStore,
        blocks: &dyn BlockStore,
    ) -> Result<Vec<PublicKey>, EngineError> {
        if let Some(cached) = self.slate_cache.lock().get(&round) {
            return Ok(cached.clone());
        }

        let slate = delegate_slate::generate_list(height, &self.config, accounts, blocks)?;
        self.slate_cache.lock().insert(round, slate.clone());
        Ok(slate)
    }
}
