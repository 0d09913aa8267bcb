//! End-to-end coverage of the concrete round-lifecycle scenarios (spec §8):
//! round-end balance settlement with remainder, rollback idempotence, the
//! replay-stability sequences, and full-round undo symmetry.
//!
//! Every scenario here starts from a round-1 checkpoint mined with zero fee
//! and zero reward on every block, so the genesis block's own extra
//! round-finish (spec §4.1's `h == 1` special case, layered on top of the
//! ordinary `round_of`-based boundary at `last_in_round(1)`) never touches a
//! nonzero amount. That sidesteps round 1's well-known overlap between the
//! genesis correction and round 1's regular settlement — a spec-literal
//! quirk documented in DESIGN.md, not a bug in this test harness — and lets
//! every assertion below be about round 2's settlement alone.

use ippan_round_engine::{EngineConfig, RoundEngine};
use ippan_round_store::{AccountStore, BlockStore, InMemoryRoundStore};
use ippan_round_types::{AccountFilter, Block, DelegateAccount, PublicKey};

const N: u32 = 5;

fn delegate_key(i: u32) -> PublicKey {
    [(i + 1) as u8; 32]
}

fn block(height: u64, generator: PublicKey, fee: i64, reward: i64) -> Block {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&height.to_be_bytes());
    hasher.update(&generator);
    let id = *hasher.finalize().as_bytes();
    Block::new(id, height, generator, fee, reward)
}

/// Seeds `n` delegate accounts with strictly descending votes (so `vote > 0`
/// holds for all of them, making every one a v1 slate candidate) and mines
/// round 1 (heights `1..=n`) with zero fee/reward, one block per delegate.
fn seeded_store(n: u32) -> InMemoryRoundStore {
    let store = InMemoryRoundStore::new();
    for i in 0..n {
        let mut account = DelegateAccount::new(delegate_key(i));
        account.vote = (n - i) as i64;
        store.put_account(account);
    }

    let engine = RoundEngine::new(EngineConfig {
        active_delegates: n,
        dposv2_first_block: u64::MAX,
    });
    engine.on_blockchain_ready();

    for height in 1..=n as u64 {
        let generator = delegate_key((height - 1) as u32);
        let b = block(height, generator, 0, 0);
        store.put_block(b);
        let mut txn = store.begin();
        engine.tick(&b, &store, &store, &mut txn).unwrap();
        txn.commit().unwrap();
    }

    store
}

fn tick_height(
    store: &InMemoryRoundStore,
    engine: &RoundEngine,
    height: u64,
    generator: PublicKey,
    fee: i64,
    reward: i64,
) {
    let b = block(height, generator, fee, reward);
    store.put_block(b);
    let mut txn = store.begin();
    engine.tick(&b, store, store, &mut txn).unwrap();
    txn.commit().unwrap();
}

fn backward_tick_height(store: &InMemoryRoundStore, engine: &RoundEngine, height: u64) {
    let b = store.find_by_height(height).unwrap().unwrap();
    let previous = store.find_by_height(height - 1).unwrap().unwrap();
    let mut txn = store.begin();
    engine
        .backward_tick(&b, &previous, store, store, &mut txn)
        .unwrap();
    txn.commit().unwrap();
}

fn snapshot(store: &InMemoryRoundStore) -> Vec<DelegateAccount> {
    let mut accounts = store.get_all(&AccountFilter::All).unwrap();
    accounts.sort_by(|a, b| a.address.cmp(&b.address));
    accounts
}

#[test]
fn round_end_balance_update_and_remainder() {
    let store = seeded_store(N);
    let engine = RoundEngine::new(EngineConfig {
        active_delegates: N,
        dposv2_first_block: u64::MAX,
    });

    let reward = 5_000;
    let total_fees = 10_007; // not evenly divisible by 5
    let per_fee = total_fees / N as i64;
    let remainder = total_fees - per_fee * N as i64;

    for offset in 0..N as u64 {
        let height = N as u64 + 1 + offset;
        let generator = delegate_key(offset as u32);
        let fee = if offset == N as u64 - 1 { total_fees } else { 0 };
        tick_height(&store, &engine, height, generator, fee, reward);
    }

    for i in 0..N {
        let account = store.get(&AccountFilter::ByPublicKey(delegate_key(i))).unwrap();
        let expected = if i == N - 1 {
            reward + per_fee + remainder
        } else {
            reward + per_fee
        };
        assert_eq!(account.balance, expected, "delegate {i} balance mismatch");
        assert_eq!(account.fees, per_fee + if i == N - 1 { remainder } else { 0 });
        assert_eq!(account.rewards, reward);
        assert_eq!(account.produced_blocks, 2);
        assert_eq!(account.missed_blocks, 0);
    }
}

#[test]
fn remainder_matches_scenario_3_exact_numbers() {
    let n = 101u32;
    let store = seeded_store(n);
    let engine = RoundEngine::new(EngineConfig {
        active_delegates: n,
        dposv2_first_block: u64::MAX,
    });

    let total_fees = 10_000_000i64;
    for offset in 0..n as u64 {
        let height = n as u64 + 1 + offset;
        let generator = delegate_key(offset as u32);
        let fee = if offset == n as u64 - 1 { total_fees } else { 0 };
        tick_height(&store, &engine, height, generator, fee, 0);
    }

    let last = store.get(&AccountFilter::ByPublicKey(delegate_key(n - 1))).unwrap();
    let other = store.get(&AccountFilter::ByPublicKey(delegate_key(0))).unwrap();
    assert_eq!(other.fees, 99_009);
    assert_eq!(last.fees, 99_009 + 91);
}

#[test]
fn outsiders_get_missed_block_credit() {
    let store = seeded_store(N);
    let engine = RoundEngine::new(EngineConfig {
        active_delegates: N,
        dposv2_first_block: u64::MAX,
    });

    // Delegate 0 never forges in round 2 — delegate 1 forges twice instead.
    let heights = [N as u64 + 1, N as u64 + 2, N as u64 + 3, N as u64 + 4, N as u64 + 5];
    let generators = [1u32, 1, 2, 3, 4];
    for (height, gen_idx) in heights.into_iter().zip(generators) {
        tick_height(&store, &engine, height, delegate_key(gen_idx), 0, 1_000);
    }

    let absent = store.get(&AccountFilter::ByPublicKey(delegate_key(0))).unwrap();
    assert_eq!(absent.missed_blocks, 1);
    assert_eq!(absent.produced_blocks, 1); // only its round-1 block

    let double = store.get(&AccountFilter::ByPublicKey(delegate_key(1))).unwrap();
    assert_eq!(double.missed_blocks, 0);
    assert_eq!(double.produced_blocks, 3); // round 1 + two round-2 blocks
}

#[test]
fn rollback_idempotence_matches_pre_tick_state() {
    let store = seeded_store(N);
    let engine = RoundEngine::new(EngineConfig {
        active_delegates: N,
        dposv2_first_block: u64::MAX,
    });

    for offset in 0..N as u64 - 1 {
        let height = N as u64 + 1 + offset;
        tick_height(&store, &engine, height, delegate_key(offset as u32), 50, 500);
    }
    let pre_last = snapshot(&store);

    let last_height = 2 * N as u64;
    tick_height(&store, &engine, last_height, delegate_key(N - 1), 900, 500);
    backward_tick_height(&store, &engine, last_height);

    assert_eq!(snapshot(&store), pre_last);
}

#[test]
fn end_delete_end_matches_single_tick() {
    let baseline = seeded_store(N);
    let complex = seeded_store(N);
    let engine_a = RoundEngine::new(EngineConfig { active_delegates: N, dposv2_first_block: u64::MAX });
    let engine_b = RoundEngine::new(EngineConfig { active_delegates: N, dposv2_first_block: u64::MAX });

    for offset in 0..N as u64 - 1 {
        let height = N as u64 + 1 + offset;
        tick_height(&baseline, &engine_a, height, delegate_key(offset as u32), 50, 500);
        tick_height(&complex, &engine_b, height, delegate_key(offset as u32), 50, 500);
    }

    let last_height = 2 * N as u64;
    let last_gen = delegate_key(N - 1);

    tick_height(&baseline, &engine_a, last_height, last_gen, 900, 500);

    tick_height(&complex, &engine_b, last_height, last_gen, 900, 500);
    backward_tick_height(&complex, &engine_b, last_height);
    tick_height(&complex, &engine_b, last_height, last_gen, 900, 500);

    assert_eq!(snapshot(&baseline), snapshot(&complex));
}

#[test]
fn end_two_deletes_two_mines_matches_single_tick() {
    let baseline = seeded_store(N);
    let complex = seeded_store(N);
    let engine_a = RoundEngine::new(EngineConfig { active_delegates: N, dposv2_first_block: u64::MAX });
    let engine_b = RoundEngine::new(EngineConfig { active_delegates: N, dposv2_first_block: u64::MAX });

    for (store, engine) in [(&baseline, &engine_a), (&complex, &engine_b)] {
        for offset in 0..N as u64 - 2 {
            let height = N as u64 + 1 + offset;
            tick_height(store, engine, height, delegate_key(offset as u32), 10, 100);
        }
    }

    let second_last_height = 2 * N as u64 - 1;
    let last_height = 2 * N as u64;
    let second_last_gen = delegate_key(N - 2);
    let last_gen = delegate_key(N - 1);

    tick_height(&baseline, &engine_a, second_last_height, second_last_gen, 30, 100);
    tick_height(&baseline, &engine_a, last_height, last_gen, 40, 100);

    tick_height(&complex, &engine_b, second_last_height, second_last_gen, 30, 100);
    tick_height(&complex, &engine_b, last_height, last_gen, 40, 100);
    backward_tick_height(&complex, &engine_b, last_height);
    backward_tick_height(&complex, &engine_b, second_last_height);
    tick_height(&complex, &engine_b, second_last_height, second_last_gen, 30, 100);
    tick_height(&complex, &engine_b, last_height, last_gen, 40, 100);

    assert_eq!(snapshot(&baseline), snapshot(&complex));
}

#[test]
fn full_round_mine_then_undo_restores_pre_round_state() {
    let store = seeded_store(N);
    let engine = RoundEngine::new(EngineConfig { active_delegates: N, dposv2_first_block: u64::MAX });

    let pre_round2 = snapshot(&store);

    for offset in 0..N as u64 {
        let height = N as u64 + 1 + offset;
        tick_height(&store, &engine, height, delegate_key(offset as u32), 77, 333);
    }

    for offset in (0..N as u64).rev() {
        let height = N as u64 + 1 + offset;
        backward_tick_height(&store, &engine, height);
    }

    assert_eq!(snapshot(&store), pre_round2);
}

#[test]
fn rank_by_vote_is_well_ordered_after_round_end() {
    let store = seeded_store(N);
    let engine = RoundEngine::new(EngineConfig { active_delegates: N, dposv2_first_block: u64::MAX });

    for offset in 0..N as u64 {
        let height = N as u64 + 1 + offset;
        tick_height(&store, &engine, height, delegate_key(offset as u32), 0, 10);
    }

    // `rank` is assigned by the caller from a vote-sorted read (account.rs),
    // not by the engine — this reproduces that step and checks the
    // resulting order is exactly `1..=N` with no ties broken incorrectly.
    let mut accounts = store.get_all(&AccountFilter::All).unwrap();
    accounts.sort_by(|a, b| b.vote.cmp(&a.vote).then_with(|| a.public_key.cmp(&b.public_key)));
    for (rank, account) in accounts.iter().enumerate() {
        assert_eq!(account.public_key, delegate_key(rank as u32));
    }
}
