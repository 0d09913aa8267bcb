//! Constants the engine is parameterized over (spec §6 "Configuration
//! inputs"). The engine never parses configuration itself — per spec §1 that
//! is an external collaborator's job; the `node` binary owns parsing and
//! hands the engine this plain struct.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// `N`: number of active delegates per round slate.
    pub active_delegates: u32,
    /// Height at/after which `DelegateSlate` uses the v2 (weighted-stochastic)
    /// algorithm instead of v1 (deterministic top-N).
    pub dposv2_first_block: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            active_delegates: 101,
            dposv2_first_block: u64::MAX,
        }
    }
}

impl EngineConfig {
    pub fn uses_v2(&self, height: u64) -> bool {
        height >= self.dposv2_first_block
    }
}
