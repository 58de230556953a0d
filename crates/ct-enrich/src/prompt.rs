// prompt.rs — Prompt construction for a single goal.
//
// Pure and total: no I/O, no clock, and missing fields fall back to fixed
// placeholders so an incomplete record never fails a run.

use ct_goal::Goal;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNSET_TARGET_DATE: &str = "Not set";
pub const NO_PROGRESS_DETAILS: &str = "No details";

/// Build the language-model prompt for a goal.
pub fn build_prompt(goal: &Goal) -> String {
    let name = field_or(goal.goal_name.as_deref(), UNKNOWN_NAME);
    let target_date = field_or(goal.target_date.as_deref(), UNSET_TARGET_DATE);
    let progress = field_or(goal.progress_details.as_deref(), NO_PROGRESS_DETAILS);

    format!(
        "Generate a short, personalized motivational message for this goal:\n\
         \n\
         Goal: {name}\n\
         Target Date: {target_date}\n\
         Progress: {progress}\n\
         \n\
         Keep the message encouraging and under 100 words."
    )
}

/// Blank counts as missing. Anything else is passed through as stored.
fn field_or<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder,
    }
}
