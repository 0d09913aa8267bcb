//! In-memory `AccountStore`/`BlockStore` pair, used by the engine's own test
//! suite and by embedding callers that keep chain state in process. Mirrors
//! the reference workspace's `MemoryStorage` (`ippan-storage`): plain
//! `RwLock`-guarded maps, no persistence.

use std::collections::BTreeMap;

use ippan_round_types::{
    AccountDiff, AccountFilter, Address, Block, BlockId, DelegateAccount, Height, RoundId,
    RoundOp, StoreError,
};
use parking_lot::RwLock;

use crate::account_store::AccountStore;
use crate::block_store::{BlockStore, RoundSummary};
use crate::transaction::RoundTransaction;

#[derive(Default)]
pub struct InMemoryRoundStore {
    accounts: RwLock<BTreeMap<Address, DelegateAccount>>,
    blocks: RwLock<BTreeMap<Height, Block>>,
    block_marks: RwLock<BTreeMap<Height, BlockId>>,
}

impl InMemoryRoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/seed helper: insert or replace a delegate account by address.
    pub fn put_account(&self, account: DelegateAccount) {
        self.accounts.write().insert(account.address.clone(), account);
    }

    /// Test/seed helper: insert or replace a persisted block.
    pub fn put_block(&self, block: Block) {
        self.blocks.write().insert(block.height, block);
    }

    pub fn begin(&self) -> MemoryTransaction<'_> {
        MemoryTransaction {
            store: self,
            pending: Vec::new(),
        }
    }
}

impl AccountStore for InMemoryRoundStore {
    fn get(&self, filter: &AccountFilter) -> Result<DelegateAccount, StoreError> {
        self.get_all(filter)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::AccountNotFound(format!("{filter:?}")))
    }

    fn get_all(&self, filter: &AccountFilter) -> Result<Vec<DelegateAccount>, StoreError> {
        let accounts = self.accounts.read();
        let matched: Vec<DelegateAccount> = match filter {
            AccountFilter::All => accounts.values().cloned().collect(),
            AccountFilter::ByAddress(addr) => {
                accounts.get(addr).cloned().into_iter().collect()
            }
            AccountFilter::ByPublicKey(pk) => accounts
                .values()
                .filter(|a| &a.public_key == pk)
                .cloned()
                .collect(),
            AccountFilter::VotingDelegates => accounts
                .values()
                .filter(|a| a.vote > 0)
                .cloned()
                .collect(),
            AccountFilter::WeightedDelegates => accounts
                .values()
                .filter(|a| a.votes_weight > 0)
                .cloned()
                .collect(),
        };
        Ok(matched)
    }
}

impl BlockStore for InMemoryRoundStore {
    fn sum_round(&self, n: usize, round: RoundId) -> Result<RoundSummary, StoreError> {
        let n = n as u64;
        let first = (round - 1) * n + 1;
        let last = round * n;
        let blocks = self.blocks.read();
        let mut fees = 0i64;
        let mut rewards = Vec::new();
        let mut delegates = Vec::new();
        for height in first..=last {
            let Some(block) = blocks.get(&height) else {
                break;
            };
            fees = fees
                .checked_add(block.total_fee)
                .ok_or_else(|| StoreError::Write("fee sum overflow".into()))?;
            rewards.push(block.reward);
            delegates.push(block.generator_public_key);
        }
        Ok(RoundSummary {
            fees,
            rewards,
            delegates,
        })
    }

    fn find_by_height(&self, height: Height) -> Result<Option<Block>, StoreError> {
        Ok(self.blocks.read().get(&height).copied())
    }

    fn find_by_id(&self, id: BlockId) -> Result<Option<Block>, StoreError> {
        Ok(self.blocks.read().values().find(|b| b.id == id).copied())
    }

    fn truncate_blocks(&self, from_height: Height) -> Result<(), StoreError> {
        self.blocks.write().retain(|h, _| *h <= from_height);
        self.block_marks.write().retain(|h, _| *h <= from_height);
        Ok(())
    }

    fn mark_block_id(&self, height: Height, id: BlockId) -> Result<(), StoreError> {
        self.block_marks.write().insert(height, id);
        Ok(())
    }
}

/// Buffers ops until `commit`; dropping without committing discards them,
/// which is how a failed tick leaves no durable effect (spec §5, §7).
pub struct MemoryTransaction<'a> {
    store: &'a InMemoryRoundStore,
    pending: Vec<RoundOp>,
}

impl RoundTransaction for MemoryTransaction<'_> {
    fn apply(&mut self, op: &RoundOp) -> Result<(), StoreError> {
        self.pending.push(op.clone());
        Ok(())
    }

    fn pending(&self) -> &[RoundOp] {
        &self.pending
    }
}

impl MemoryTransaction<'_> {
    pub fn commit(self) -> Result<(), StoreError> {
        for op in &self.pending {
            match op {
                RoundOp::MergeAccount { address, diff } => {
                    self.apply_merge(address, diff)?;
                }
                RoundOp::MarkBlockId { height, block_id } => {
                    self.store.mark_block_id(*height, *block_id)?;
                }
                RoundOp::TruncateBlocks { from_height } => {
                    self.store.truncate_blocks(*from_height)?;
                }
            }
        }
        Ok(())
    }

    fn apply_merge(&self, address: &Address, diff: &AccountDiff) -> Result<(), StoreError> {
        let mut accounts = self.store.accounts.write();
        let account = accounts
            .get_mut(address)
            .ok_or_else(|| StoreError::AccountNotFound(address.clone()))?;
        account
            .apply_diff(diff)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ippan_round_types::DelegateAccount;

    fn seeded_store() -> InMemoryRoundStore {
        let store = InMemoryRoundStore::new();
        let mut account = DelegateAccount::new([1u8; 32]);
        account.vote = 100;
        store.put_account(account);
        store
    }

    #[test]
    fn uncommitted_transaction_has_no_effect() {
        let store = seeded_store();
        let address = store.get(&AccountFilter::All).unwrap().address;
        let mut txn = store.begin();
        txn.apply(&RoundOp::MergeAccount {
            address: address.clone(),
            diff: AccountDiff::producer(1, 100, 5),
        })
        .unwrap();
        drop(txn);

        let account = store.get(&AccountFilter::ByAddress(address)).unwrap();
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn committed_transaction_mutates_account() {
        let store = seeded_store();
        let address = store.get(&AccountFilter::All).unwrap().address;
        let mut txn = store.begin();
        txn.apply(&RoundOp::MergeAccount {
            address: address.clone(),
            diff: AccountDiff::producer(1, 100, 5),
        })
        .unwrap();
        txn.commit().unwrap();

        let account = store.get(&AccountFilter::ByAddress(address)).unwrap();
        assert_eq!(account.balance, 105);
        assert_eq!(account.produced_blocks, 1);
    }
}
