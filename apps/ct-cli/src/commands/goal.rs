// goal.rs — Goal subcommands: list, show. Read-only.

use clap::Subcommand;
use ct_enrich::TrackerConfig;
use ct_goal::{Goal, GoalStore, JsonFileGoalStore};

#[derive(Subcommand)]
pub enum GoalCommands {
    /// List all goals with their last enrichment time.
    List,
    /// Show a goal record as JSON.
    Show {
        /// Goal ID.
        id: String,
    },
}

pub fn execute(cmd: &GoalCommands, config: &TrackerConfig) -> anyhow::Result<()> {
    let store = JsonFileGoalStore::open(&config.goals_dir)?;

    match cmd {
        GoalCommands::List => list_goals(&store),
        GoalCommands::Show { id } => show_goal(&store, id),
    }
}

/// Every goal the store can decode; unreadable records are logged.
fn readable_goals(store: &JsonFileGoalStore) -> anyhow::Result<Vec<Goal>> {
    let mut goals = Vec::new();
    for item in store.scan()? {
        match item {
            Ok(goal) => goals.push(goal),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable goal record"),
        }
    }
    Ok(goals)
}

fn list_goals(store: &JsonFileGoalStore) -> anyhow::Result<()> {
    let goals = readable_goals(store)?;

    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }

    println!("{:<24} {:<30} {:<26}", "ID", "NAME", "LAST ENCOURAGEMENT");
    println!("{}", "-".repeat(82));
    for g in &goals {
        println!("{}", list_row(g));
    }
    println!("\n{} goal(s) total.", goals.len());

    Ok(())
}

fn list_row(goal: &Goal) -> String {
    let last = goal
        .last_encouragement_date
        .map(|d| d.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "never".to_string());
    format!(
        "{:<24} {:<30} {:<26}",
        truncate(&goal.goal_id, 22),
        truncate(goal.goal_name.as_deref().unwrap_or("-"), 28),
        last,
    )
}

fn show_goal(store: &JsonFileGoalStore, id: &str) -> anyhow::Result<()> {
    match store.get(id)? {
        Some(goal) => {
            println!("{}", serde_json::to_string_pretty(&goal)?);
            Ok(())
        }
        None => anyhow::bail!("goal not found: {}", id),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
