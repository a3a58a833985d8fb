//! Ask a question about a plan snapshot stored as JSON.
//!
//! cargo run -p planrag-hybrid --example ask -- plan.json "What is the SEA scoping status?" [policies.json] [top_k]
//!
//! Set `APP_USE_FAKE_EMBEDDINGS=1` to skip loading the BGE-M3 model.

use std::env;
use std::fs;

use planrag_core::{PlanSnapshot, PolicySet};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut args = env::args().skip(1);
    let (Some(plan_path), Some(query)) = (args.next(), args.next()) else {
        eprintln!("Usage: ask <plan.json> <question> [policies.json] [top_k]");
        std::process::exit(1);
    };
    let plan: PlanSnapshot = serde_json::from_str(&fs::read_to_string(&plan_path)?)?;
    let policies: Option<PolicySet> = match args.next() {
        Some(path) => Some(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => None,
    };
    let top_k = args.next().map(|k| k.parse::<usize>()).transpose()?;

    let passages = planrag_hybrid::retrieve(&query, &plan, policies.as_ref(), top_k).await;
    if passages.is_empty() {
        println!("No passages for plan {}", plan.id);
    }
    for (rank, p) in passages.iter().enumerate() {
        println!("{:>2}. [{}] {}", rank + 1, p.source_tag, p.text);
    }
    Ok(())
}
