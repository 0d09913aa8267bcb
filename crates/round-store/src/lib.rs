//! `AccountStore`/`BlockStore` interfaces (spec §4.2, §4.3) and the atomic
//! `RoundTransaction` envelope (spec §4.5, §5), plus an in-memory
//! implementation (engine test suite, in-process embedding) and a
//! `sled`-backed one (matching the reference workspace's persistence
//! choice).

pub mod account_store;
pub mod block_store;
pub mod memory_store;
pub mod sled_store;
pub mod transaction;

pub use account_store::AccountStore;
pub use block_store::{BlockStore, RoundSummary};
pub use memory_store::{InMemoryRoundStore, MemoryTransaction};
pub use sled_store::{SledRoundStore, SledTransaction};
pub use transaction::RoundTransaction;
