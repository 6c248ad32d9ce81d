//! Pipeline entry points.
//!
//! - `run_crawl`: One resumable crawl over an open page
//! - `run_every`: Repeat runs on an interval

pub mod crawl;
pub mod schedule;

#[cfg(feature = "browser")]
pub use crawl::run_crawl_in_browser;
pub use crawl::{CrawlSummary, StopReason, run_crawl};
pub use schedule::{MIN_INTERVAL, run_every};
