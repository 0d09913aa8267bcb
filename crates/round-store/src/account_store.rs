//! The `AccountStore` interface the engine reads delegate accounts through
//! (spec §4.2, §6).

use ippan_round_types::{AccountDiff, AccountFilter, Address, DelegateAccount, PublicKey, RoundOp, StoreError};

/// Read access to delegate accounts, plus the pure op-builder the engine uses
/// to queue mutations. Implementations never apply a diff eagerly — `merge_op`
/// only builds the `RoundOp`; a `RoundTransaction` is what actually mutates
/// state (spec §4.2: "must be queued as typed ops, not applied eagerly").
pub trait AccountStore {
    fn get(&self, filter: &AccountFilter) -> Result<DelegateAccount, StoreError>;

    fn get_all(&self, filter: &AccountFilter) -> Result<Vec<DelegateAccount>, StoreError>;

    fn generate_address(&self, public_key: &PublicKey) -> Address {
        ippan_round_types::generate_address(public_key)
    }

    /// Pure helper: no I/O, never fails, just wraps the diff as an op.
    fn merge(&self, address: Address, diff: AccountDiff) -> RoundOp {
        RoundOp::MergeAccount { address, diff }
    }
}
