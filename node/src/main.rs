//! Wiring-only binary: loads `EngineConfig` from the environment, builds an
//! in-memory store + `RoundEngine`, and feeds a run of synthetic blocks
//! through `tick`/`backward_tick` so the engine can be exercised end to end
//! without a surrounding P2P/RPC pipeline (spec §1 non-goals — those stay
//! external collaborators).

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use config::Config;
use ippan_round_engine::{EngineConfig, RoundEngine, RoundEvent};
use ippan_round_store::InMemoryRoundStore;
use ippan_round_types::{Block, DelegateAccount};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Demo-binary configuration, loaded from `IPPAN_ROUND_*` environment
/// variables and overridable from the command line, mirroring the reference
/// `node` binary's `AppConfig::load`.
#[derive(Debug, Clone)]
struct AppConfig {
    active_delegates: u32,
    dposv2_first_block: u64,
    blocks_to_feed: u64,
    base_fee: i64,
    base_reward: i64,
    log_level: String,
    log_format: String,
}

impl AppConfig {
    fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(config::Environment::with_prefix("IPPAN_ROUND"))
            .build()
            .context("loading IPPAN_ROUND_* environment configuration")?;

        Ok(Self {
            active_delegates: config.get_int("ACTIVE_DELEGATES").unwrap_or(5) as u32,
            dposv2_first_block: config
                .get_int("DPOSV2_FIRST_BLOCK")
                .map(|v| v as u64)
                .unwrap_or(u64::MAX),
            blocks_to_feed: config.get_int("BLOCKS").map(|v| v as u64).unwrap_or(12),
            base_fee: config.get_int("BASE_FEE").unwrap_or(1_000),
            base_reward: config.get_int("BASE_REWARD").unwrap_or(5_000),
            log_level: config
                .get_string("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string()),
            log_format: config
                .get_string("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),
        })
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            active_delegates: self.active_delegates,
            dposv2_first_block: self.dposv2_first_block,
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

/// A synthetic generator public key for slot `i` of an `active_delegates`-wide
/// slate: `[i, i, ..., i]`, distinct and stable across the whole demo run.
fn delegate_key(i: u32) -> [u8; 32] {
    [(i % 256) as u8; 32]
}

fn synthetic_block(height: u64, generator: u32, fee: i64, reward: i64) -> Block {
    let id = *blake3::hash(&height.to_be_bytes()).as_bytes();
    Block::new(id, height, delegate_key(generator), fee, reward)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("ippan-round-demo")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Exercises the DPoS round lifecycle engine with synthetic blocks")
        .arg(
            Arg::new("blocks")
                .short('b')
                .long("blocks")
                .value_name("N")
                .help("Number of synthetic blocks to feed through tick()"),
        )
        .arg(
            Arg::new("active-delegates")
                .short('n')
                .long("active-delegates")
                .value_name("N")
                .help("Active delegate count per round slate"),
        )
        .arg(
            Arg::new("rollback-last")
                .long("rollback-last")
                .action(ArgAction::SetTrue)
                .help("Reverse the final block with backward_tick after feeding it"),
        )
        .arg(
            Arg::new("dev")
                .long("dev")
                .action(ArgAction::SetTrue)
                .help("Run with debug-level, pretty logging"),
        )
        .get_matches();

    let mut config = AppConfig::load()?;

    if let Some(blocks) = matches.get_one::<String>("blocks") {
        config.blocks_to_feed = blocks.parse().context("parsing --blocks")?;
    }
    if let Some(active) = matches.get_one::<String>("active-delegates") {
        config.active_delegates = active.parse().context("parsing --active-delegates")?;
    }
    if matches.get_flag("dev") {
        config.log_level = "debug".to_string();
        config.log_format = "pretty".to_string();
    }

    init_logging(&config)?;

    info!(
        target: "round_engine",
        active_delegates = config.active_delegates,
        dposv2_first_block = config.dposv2_first_block,
        blocks = config.blocks_to_feed,
        "starting round lifecycle demo"
    );

    let store = InMemoryRoundStore::new();
    for i in 0..config.active_delegates {
        let mut account = DelegateAccount::new(delegate_key(i));
        account.vote = (config.active_delegates - i) as i64;
        account.votes_weight = (i as i64) + 1;
        store.put_account(account);
    }

    let engine = RoundEngine::new(config.engine_config());
    engine.on_blockchain_ready();

    let mut events = engine.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RoundEvent::FinishRound(round) => {
                    info!(target: "round_engine", round, "event: round finished")
                }
                RoundEvent::RoundBackwardTick { height, .. } => {
                    info!(target: "round_engine", height, "event: backward tick")
                }
            }
        }
    });

    let mut fed = Vec::with_capacity(config.blocks_to_feed as usize);
    for height in 1..=config.blocks_to_feed {
        let generator = (height - 1) as u32 % config.active_delegates;
        let block = synthetic_block(height, generator, config.base_fee, config.base_reward);
        store.put_block(block);

        let mut txn = store.begin();
        engine.tick(&block, &store, &store, &mut txn)?;
        txn.commit().context("committing tick")?;

        fed.push(block);
    }

    if matches.get_flag("rollback-last") {
        if fed.len() >= 2 {
            let last = fed[fed.len() - 1];
            let previous = fed[fed.len() - 2];
            let mut txn = store.begin();
            engine.backward_tick(&last, &previous, &store, &store, &mut txn)?;
            txn.commit().context("committing backward_tick")?;
            info!(target: "round_engine", height = last.height, "rolled back last block");
        } else {
            warn!(target: "round_engine", "not enough blocks fed to roll back");
        }
    }

    engine.cleanup()?;
    info!(target: "round_engine", "demo run complete");
    Ok(())
}
