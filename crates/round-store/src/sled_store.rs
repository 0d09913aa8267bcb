//! Sled-backed `AccountStore`/`BlockStore` pair, mirroring the reference
//! workspace's `SledStorage` (`ippan-storage`): one `Tree` per logical table,
//! `serde_json` for value encoding, big-endian height keys for range scans.

use std::path::Path;

use ippan_round_types::{
    AccountDiff, AccountFilter, Address, Block, BlockId, DelegateAccount, Height, RoundId,
    RoundOp, StoreError,
};
use sled::{transaction::TransactionError, Db, Transactional, Tree};

use crate::account_store::AccountStore;
use crate::block_store::{BlockStore, RoundSummary};
use crate::transaction::RoundTransaction;

pub struct SledRoundStore {
    db: Db,
    accounts: Tree,
    blocks: Tree,
    block_marks: Tree,
}

impl SledRoundStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Read(e.to_string()))?;
        let accounts = db
            .open_tree("round_accounts")
            .map_err(|e| StoreError::Read(e.to_string()))?;
        let blocks = db
            .open_tree("round_blocks")
            .map_err(|e| StoreError::Read(e.to_string()))?;
        let block_marks = db
            .open_tree("round_block_marks")
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(Self {
            db,
            accounts,
            blocks,
            block_marks,
        })
    }

    pub fn put_account(&self, account: &DelegateAccount) -> Result<(), StoreError> {
        let data = serde_json::to_vec(account)?;
        self.accounts
            .insert(account.address.as_bytes(), data)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    pub fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        let data = serde_json::to_vec(block)?;
        self.blocks
            .insert(&block.height.to_be_bytes(), data)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    fn read_account(&self, address: &Address) -> Result<Option<DelegateAccount>, StoreError> {
        self.accounts
            .get(address.as_bytes())
            .map_err(|e| StoreError::Read(e.to_string()))?
            .map(|v| serde_json::from_slice(&v).map_err(StoreError::from))
            .transpose()
    }

    fn read_block(&self, height: Height) -> Result<Option<Block>, StoreError> {
        self.blocks
            .get(height.to_be_bytes())
            .map_err(|e| StoreError::Read(e.to_string()))?
            .map(|v| serde_json::from_slice(&v).map_err(StoreError::from))
            .transpose()
    }

    pub fn begin(&self) -> SledTransaction<'_> {
        SledTransaction {
            store: self,
            pending: Vec::new(),
        }
    }
}

impl AccountStore for SledRoundStore {
    fn get(&self, filter: &AccountFilter) -> Result<DelegateAccount, StoreError> {
        self.get_all(filter)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::AccountNotFound(format!("{filter:?}")))
    }

    fn get_all(&self, filter: &AccountFilter) -> Result<Vec<DelegateAccount>, StoreError> {
        let mut out = Vec::new();
        for item in self.accounts.iter() {
            let (_, v) = item.map_err(|e| StoreError::Read(e.to_string()))?;
            let account: DelegateAccount = serde_json::from_slice(&v)?;
            let matches = match filter {
                AccountFilter::All => true,
                AccountFilter::ByAddress(addr) => &account.address == addr,
                AccountFilter::ByPublicKey(pk) => &account.public_key == pk,
                AccountFilter::VotingDelegates => account.vote > 0,
                AccountFilter::WeightedDelegates => account.votes_weight > 0,
            };
            if matches {
                out.push(account);
            }
        }
        Ok(out)
    }
}

impl BlockStore for SledRoundStore {
    fn sum_round(&self, n: usize, round: RoundId) -> Result<RoundSummary, StoreError> {
        let n = n as u64;
        let first = (round - 1) * n + 1;
        let last = round * n;
        let mut fees = 0i64;
        let mut rewards = Vec::new();
        let mut delegates = Vec::new();
        for height in first..=last {
            let Some(block) = self.read_block(height)? else {
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
        self.read_block(height)
    }

    fn find_by_id(&self, id: BlockId) -> Result<Option<Block>, StoreError> {
        for item in self.blocks.iter() {
            let (_, v) = item.map_err(|e| StoreError::Read(e.to_string()))?;
            let block: Block = serde_json::from_slice(&v)?;
            if block.id == id {
                return Ok(Some(block));
            }
        }
        Ok(None)
    }

    fn truncate_blocks(&self, from_height: Height) -> Result<(), StoreError> {
        let stale: Vec<Height> = self
            .blocks
            .iter()
            .keys()
            .filter_map(|k| k.ok())
            .filter_map(|k| {
                let bytes: [u8; 8] = k.as_ref().try_into().ok()?;
                Some(Height::from_be_bytes(bytes))
            })
            .filter(|h| *h > from_height)
            .collect();
        for height in stale {
            self.blocks
                .remove(height.to_be_bytes())
                .map_err(|e| StoreError::Write(e.to_string()))?;
            self.block_marks
                .remove(height.to_be_bytes())
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }
        Ok(())
    }

    fn mark_block_id(&self, height: Height, id: BlockId) -> Result<(), StoreError> {
        self.block_marks
            .insert(height.to_be_bytes(), &id)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }
}

/// Buffers ops and flushes them inside one `sled` transaction on `commit`,
/// so a dropped-without-commit batch leaves the trees untouched.
pub struct SledTransaction<'a> {
    store: &'a SledRoundStore,
    pending: Vec<RoundOp>,
}

impl RoundTransaction for SledTransaction<'_> {
    fn apply(&mut self, op: &RoundOp) -> Result<(), StoreError> {
        self.pending.push(op.clone());
        Ok(())
    }

    fn pending(&self) -> &[RoundOp] {
        &self.pending
    }
}

impl SledTransaction<'_> {
    /// `MergeAccount`/`MarkBlockId` commit inside one `sled` transaction;
    /// `TruncateBlocks` runs afterward via the plain (non-transactional)
    /// `Tree` API, since `sled::transaction::TransactionalTree` has no
    /// range/scan operation to find the stale keys with. `isTicking`
    /// already serializes every tick against this store, and snapshot mode
    /// is the only caller of `TruncateBlocks`, so the two-step commit never
    /// races a concurrent writer in practice.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut truncate_from: Option<Height> = None;

        let result: Result<(), TransactionError<StoreError>> =
            (&self.store.accounts, &self.store.block_marks).transaction(|(accounts, block_marks)| {
                for op in &self.pending {
                    match op {
                        RoundOp::MergeAccount { address, diff } => {
                            merge_account_in_tree(accounts, address, diff)?;
                        }
                        RoundOp::MarkBlockId { height, block_id } => {
                            block_marks.insert(&height.to_be_bytes(), block_id)?;
                        }
                        RoundOp::TruncateBlocks { .. } => {}
                    }
                }
                Ok(())
            });
        result.map_err(|e| StoreError::Write(e.to_string()))?;

        for op in &self.pending {
            if let RoundOp::TruncateBlocks { from_height } = op {
                truncate_from = Some(*from_height);
            }
        }
        if let Some(from_height) = truncate_from {
            self.store.truncate_blocks(from_height)?;
        }

        self.store
            .db
            .flush()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }
}

fn merge_account_in_tree(
    tree: &sled::transaction::TransactionalTree,
    address: &Address,
    diff: &AccountDiff,
) -> sled::transaction::ConflictableTransactionResult<(), StoreError> {
    let current = tree.get(address.as_bytes())?;
    let mut account: DelegateAccount = match current {
        Some(v) => serde_json::from_slice(&v)
            .map_err(|e| sled::transaction::ConflictableTransactionError::Abort(
                StoreError::Serialization(e),
            ))?,
        None => {
            return Err(sled::transaction::ConflictableTransactionError::Abort(
                StoreError::AccountNotFound(address.clone()),
            ))
        }
    };
    account.apply_diff(diff).map_err(|e| {
        sled::transaction::ConflictableTransactionError::Abort(StoreError::Write(e.to_string()))
    })?;
    let data = serde_json::to_vec(&account).map_err(|e| {
        sled::transaction::ConflictableTransactionError::Abort(StoreError::Serialization(e))
    })?;
    tree.insert(address.as_bytes(), data)?;
    Ok(())
}
