//! Content-quality demo
//!
//! Runs the live feed pipeline for a few topics under fixed telemetry profiles
//! and prints what a reader would receive.

use anyhow::{Context, bail};
use clap::Parser;
use sciscroll_api::{config::Config, state::build_feed};
use sciscroll_core::{ExplorationFeed, GenerateRequest, slug::slugify, strategy::Strategy};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const DEMO_TOPICS: [&str; 6] = [
    "Black Holes",
    "Quantum Mechanics",
    "CRISPR Gene Editing",
    "Dark Matter",
    "Climate Science",
    "Neural Networks",
];

#[derive(Parser, Debug)]
#[command(
    name = "sciscroll-demo",
    about = "Generate feed batches for sample topics and print them"
)]
struct DemoCli {
    /// Topic to explore; all built-in topics when omitted
    topic: Option<String>,

    /// Telemetry profile to replay (deeper, branch or pivot); all when omitted
    strategy: Option<String>,
}

/// Telemetry that lands on each strategy.
fn telemetry_profile(strategy: Strategy) -> Value {
    let (total, scrolls, clicks, sections, per_section) = match strategy {
        Strategy::Deeper => (60000, 12, 2, 4, 15000),
        Strategy::Branch => (25000, 5, 0, 4, 6250),
        Strategy::Pivot => (3000, 1, 0, 4, 750),
    };
    json!({
        "total_time_on_node_ms": total,
        "scroll_events": scrolls,
        "go_deeper_clicks": clicks,
        "sections_in_current_node": sections,
        "time_per_section_ms": per_section,
    })
}

async fn run_topic(feed: &ExplorationFeed, topic: &str, strategies: &[Strategy]) {
    println!("\n=== {topic} ===");
    let initial = match feed.initial(topic).await {
        Ok(initial) => initial,
        Err(e) => {
            println!("  initial failed: {e}");
            return;
        }
    };
    println!(
        "  initial: {} blocks, {} graph nodes",
        initial.blocks.len(),
        initial.graph.nodes.len()
    );

    let last_passage = initial
        .blocks
        .iter()
        .rev()
        .find(|b| b.block_type() == "text")
        .map(|b| b.content().to_string());

    for strategy in strategies {
        let request = GenerateRequest {
            current_node: slugify(topic),
            telemetry: Some(telemetry_profile(*strategy)),
            visited_node_ids: vec![slugify(topic)],
            last_read_passage: last_passage.clone(),
        };
        match feed.generate(&request).await {
            Ok(generated) => {
                println!(
                    "\n  --- {} (score {:.3}) ---",
                    generated.strategy, generated.engagement_score
                );
                for block in &generated.blocks {
                    match block.media() {
                        Some(media) => println!(
                            "  [{} / {}] {} ({})",
                            block.block_type(),
                            block.role(),
                            media.url,
                            media.attribution
                        ),
                        None => println!(
                            "  [{} / {}] {}",
                            block.block_type(),
                            block.role(),
                            block.content()
                        ),
                    }
                }
                let next: Vec<&str> = generated.next_nodes.iter().map(|n| n.label.as_str()).collect();
                println!("  next: {}", next.join(", "));
            }
            Err(e) => println!("  {strategy} failed: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = DemoCli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let strategies = match cli.strategy.as_deref() {
        None => Strategy::ALL.to_vec(),
        Some(raw) => match Strategy::parse(&raw.to_lowercase()) {
            Some(strategy) => vec![strategy],
            None => bail!("unknown strategy '{raw}', expected deeper, branch or pivot"),
        },
    };
    let topics: Vec<String> = match cli.topic {
        Some(topic) => vec![topic],
        None => DEMO_TOPICS.iter().map(|t| t.to_string()).collect(),
    };

    let config = Config::from_env().context("Failed to load configuration")?;
    let feed = build_feed(&config)?;
    println!("Available APIs:");
    for (name, available) in feed.availability() {
        println!("  {name}: {}", if available { "yes" } else { "no" });
    }

    for topic in &topics {
        run_topic(&feed, topic, &strategies).await;
    }
    Ok(())
}
