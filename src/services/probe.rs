// src/services/probe.rs

//! First-matching-candidate probe.
//!
//! Every selector list in the config (list readiness, rows, detail
//! readiness) is an ordered set of fallbacks evaluated with this one rule.

use std::time::Duration;

use crate::browser::PageDriver;

/// Wait for each candidate in order, each with its own `timeout`, and
/// return the first one that appears.
pub async fn first_ready(
    driver: &mut dyn PageDriver,
    candidates: &[String],
    timeout: Duration,
) -> Option<String> {
    for selector in candidates {
        match driver.wait_for_selector(selector, timeout).await {
            Ok(()) => return Some(selector.clone()),
            Err(e) => log::debug!("Candidate '{}' not ready: {}", selector, e),
        }
    }
    None
}
