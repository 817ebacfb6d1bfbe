//! Stage Rank - Binary Entry Point
//!
//! Walks through a small board: three cards in one stage, a drag between
//! two of them, a move to another stage, and a rebalance under a tight key
//! length limit. Set `RUST_LOG=stage_rank=debug` to see every placement.

use stage_rank::hooks::{RankHooks, Ranked};
use stage_rank::{RankConfig, RankEngine, RankError, MemoryRankStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const BACKLOG: u64 = 1;
const DOING: u64 = 2;

struct Card {
    id: u64,
    stage_id: u64,
}

impl Ranked for Card {
    fn record_id(&self) -> u64 {
        self.id
    }

    fn group_id(&self) -> u64 {
        self.stage_id
    }
}

fn print_stage<S: stage_rank::RankStore>(engine: &RankEngine<S>, stage: u64) -> Result<(), RankError> {
    let ordered = engine.ordered(stage)?;
    let cards: Vec<String> = ordered
        .iter()
        .map(|(id, rank)| format!("#{id}@{rank}"))
        .collect();
    println!("  stage {stage}: [{}]", cards.join(", "));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("===========================================");
    println!("  Stage Rank - ranked ordering demo");
    println!("===========================================");
    println!();

    let config = RankConfig::default().with_max_rank_len(3);
    let engine = RankEngine::new(Arc::new(MemoryRankStore::new()), config)?;

    println!("Creating cards...");
    for id in 1..=3 {
        engine.on_create(&Card { id, stage_id: BACKLOG })?;
    }
    print_stage(&engine, BACKLOG)?;

    println!("Dragging #3 between #1 and #2...");
    engine.reorder(3, Some(1), Some(2), None)?;
    print_stage(&engine, BACKLOG)?;

    println!("Moving #1 to stage {DOING}...");
    engine.on_group_change(&Card { id: 1, stage_id: DOING })?;
    print_stage(&engine, BACKLOG)?;
    print_stage(&engine, DOING)?;

    println!("Squeezing 40 cards in after #3...");
    for id in 100..140 {
        engine.reorder(id, Some(3), Some(2), Some(BACKLOG))?;
    }
    let root = engine.state_root(BACKLOG)?;
    println!("  stage {BACKLOG}: {} cards, state root {}", engine.order_of(BACKLOG)?.len(), hex::encode(root));

    let stats = engine.stats();
    println!();
    println!("Commits: {}  Retries: {}  Rebalances: {}", stats.commits, stats.retries, stats.rebalances);
    Ok(())
}
