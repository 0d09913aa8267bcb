//! The atomic transactional envelope the caller supplies to `RoundEngine`
//! (spec §3, §4.5, §5): "the database transaction supplied by the caller is
//! the unit of atomicity — all ops for one tick commit or none do."
//!
//! The engine only ever calls `apply`. Nothing in this crate calls `commit`
//! on the engine's behalf — per spec §4.6 step 7, the caller may still abort
//! after the engine returns, so committing is the caller's decision alone.

use ippan_round_types::{RoundOp, StoreError};

pub trait RoundTransaction {
    /// Queue one op. Implementations must not make it visible to readers
    /// until `commit` (or the implementation's equivalent) is called.
    fn apply(&mut self, op: &RoundOp) -> Result<(), StoreError>;

    /// Ops queued so far, in emission order. Exposed for tests that assert
    /// on the exact sequence `RoundOps` built (spec §9's "test
    /// introspection").
    fn pending(&self) -> &[RoundOp];
}
