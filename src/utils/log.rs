// src/utils/log.rs

//! Run banners and summaries on top of the `log` facade.
//!
//! Plain messages go through `log::info!` and friends directly; these
//! helpers only keep multi-line output consistent.

/// Width of banner and separator lines.
const RULE_WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("{}", format_summary_title(title));
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}

fn format_summary_title(title: &str) -> String {
    format!("[SUMMARY] {}", title)
}
