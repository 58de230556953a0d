// run.rs — `ct run`: one enrichment pass over the goal store.
//
// Prints `{"processedCount": n, "results": {...}}` to stdout. Per-record
// failures are in the report; only a config, client, or scan failure exits
// non-zero.

use anyhow::Context;
use ct_enrich::{EnrichConfig, Enricher, HttpGenerator, RunReport, TrackerConfig};
use ct_goal::JsonFileGoalStore;

pub fn execute(config: &TrackerConfig) -> anyhow::Result<()> {
    let report = run_once(config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_once(config: &TrackerConfig) -> anyhow::Result<RunReport> {
    let enrich_config = EnrichConfig::load_or_default(&config.enrich_config)
        .with_context(|| format!("loading {}", config.enrich_config.display()))?;
    let store = JsonFileGoalStore::open(&config.goals_dir)
        .with_context(|| format!("opening goal store {}", config.goals_dir.display()))?;
    let generator = HttpGenerator::new(enrich_config.generator.clone())
        .context("building message generator")?;

    let enricher = Enricher::from_config(store, generator, &enrich_config);
    let report = enricher.run()?;
    Ok(report)
}
