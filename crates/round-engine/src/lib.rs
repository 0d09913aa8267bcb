//! Round lifecycle engine for a delegated-proof-of-stake chain (spec
//! overview, §2): round boundary detection, fee/reward settlement with
//! outsider accounting, v1/v2 delegate slate selection, and exactly
//! reversible forward/backward block application.

pub mod app_state;
pub mod config;
pub mod delegate_slate;
pub mod event_bus;
pub mod round_engine;
pub mod round_math;
pub mod round_ops;

pub use app_state::RoundAppState;
pub use config::EngineConfig;
pub use event_bus::{RoundEvent, RoundEventBus};
pub use round_engine::RoundEngine;
pub use round_ops::{RoundContext, RoundOps};
