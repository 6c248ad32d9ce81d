// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod notice;
mod run;

// Re-export all public types
pub use config::{CrawlConfig, DetailConfig, FilterConfig, ListConfig, MegaMenu, NavigationConfig};
pub use notice::{
    DetailFields, DetailRecord, DetailSection, ListItem, NoticeBody, NoticeStatus, RawSnapshot,
    RowLocator, SITE, SourceMeta,
};
pub use run::{CancelToken, Paths, RunOptions, run_id_at};
