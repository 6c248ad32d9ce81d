//! Page-level crawl services.
//!
//! - Readiness probing over candidate selectors (`probe`)
//! - Bid list navigation and recovery (`Navigator`)
//! - List row extraction (`ListExtractor`)
//! - Detail page extraction and sectioning (`DetailExtractor`)
//! - Pagination (`Paginator`)

pub mod detail;
pub mod list;
pub mod navigator;
pub mod pagination;
pub mod probe;

pub use detail::{DetailExtractor, ExtractedDetail, extract_fields};
pub use list::{ListExtractor, filter_by_keywords};
pub use navigator::Navigator;
pub use pagination::{PageTurn, Paginator};
pub use probe::first_ready;

/// Timeouts and settle delays tuned to the portal.
pub mod timing {
    use std::time::Duration;

    pub const GOTO: Duration = Duration::from_secs(20);
    pub const AFTER_GOTO: Duration = Duration::from_millis(100);
    pub const MENU_VISIBLE: Duration = Duration::from_secs(5);
    pub const AFTER_HOVER: Duration = Duration::from_millis(100);
    pub const MENU_CLICK: Duration = Duration::from_secs(3);
    pub const BEFORE_SEARCH: Duration = Duration::from_millis(300);
    /// Search request, response and grid render
    pub const AFTER_SEARCH: Duration = Duration::from_millis(1500);
    pub const CLICK: Duration = Duration::from_secs(8);
    pub const LIST_READY: Duration = Duration::from_secs(20);
    pub const RECOVER_PROBE: Duration = Duration::from_secs(8);
    pub const ROW_PROBE: Duration = Duration::from_secs(15);
    pub const AFTER_ROW_CLICK: Duration = Duration::from_millis(300);
    pub const DETAIL_READY: Duration = Duration::from_secs(15);
    pub const DETAIL_SETTLE: Duration = Duration::from_millis(1500);
    pub const GO_BACK: Duration = Duration::from_secs(15);
    pub const BEFORE_PAGINATE: Duration = Duration::from_millis(500);
}
