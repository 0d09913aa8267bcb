//! Shared data model for the round lifecycle engine: heights, delegate
//! accounts, additive diffs, and the tagged round-op sum that RoundOps emits
//! and RoundTransaction consumes.

pub mod account;
pub mod address;
pub mod block;
pub mod diff;
pub mod error;
pub mod ops;

pub use account::{AccountFilter, DelegateAccount};
pub use address::generate_address;
pub use block::{Block, BlockId};
pub use diff::{AccountDiff, AuditAction};
pub use error::{EngineError, StoreError};
pub use ops::RoundOp;

/// 1-based monotonically increasing block height.
pub type Height = u64;

/// 1-based round number; `round_of(h) = ceil(h / active_delegates)`.
pub type RoundId = u64;

/// Ed25519 (or equivalent) public key identifying a delegate.
pub type PublicKey = [u8; 32];

/// Hash-derived human-readable account identifier.
pub type Address = String;
