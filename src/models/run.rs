//! Per-run parameters and the on-disk output layout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

/// Cooperative stop flag, checked between pages and between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Plain values handed to the crawl entry point.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_id: String,
    pub max_pages: u32,
    pub max_items: usize,
    pub list_only: bool,
    /// Keep rows whose title or text contains any of these
    pub keywords: Vec<String>,
    pub headless: bool,
    /// Delay before every browser action; only used when headed
    pub slow_mo_ms: u64,
    pub out_raw_list: PathBuf,
    pub out_normalized: PathBuf,
    pub errors_dir: PathBuf,
    pub state_db: PathBuf,
    pub cancel: CancelToken,
}

impl RunOptions {
    /// Options for a run writing into `paths`, with the CLI defaults.
    pub fn new(run_id: impl Into<String>, paths: &Paths) -> Self {
        Self {
            run_id: run_id.into(),
            max_pages: 1,
            max_items: 30,
            list_only: false,
            keywords: Vec::new(),
            headless: true,
            slow_mo_ms: 0,
            out_raw_list: paths.raw_list.clone(),
            out_normalized: paths.normalized.clone(),
            errors_dir: paths.errors_dir.clone(),
            state_db: paths.state_db.clone(),
            cancel: CancelToken::new(),
        }
    }
}

/// Resolved output locations under a workspace root.
///
/// ```text
/// {root}/
/// ├── data/
/// │   ├── raw/list_YYYYMMDD.jsonl
/// │   ├── normalized/notices.jsonl
/// │   └── errors/
/// └── state/state.sqlite
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub raw_list: PathBuf,
    pub normalized: PathBuf,
    pub errors_dir: PathBuf,
    pub state_db: PathBuf,
}

impl Paths {
    /// Default layout for `run_id`.
    pub fn new(root: &Path, run_id: &str) -> Self {
        Self::with_names(root, run_id, None, None)
    }

    /// Layout with optional stream file names.
    ///
    /// A custom normalized name also gets its own state database so an
    /// older state cannot skip notices that the new file has never seen.
    pub fn with_names(
        root: &Path,
        run_id: &str,
        raw_name: Option<&str>,
        normalized_name: Option<&str>,
    ) -> Self {
        let data = root.join("data");
        let date = run_id.get(..8).unwrap_or(run_id);

        let raw_base = stream_base(raw_name).unwrap_or_else(|| format!("list_{date}"));
        let (norm_base, state_file) = match stream_base(normalized_name) {
            Some(base) => {
                let state = format!("state_{base}.sqlite");
                (base, state)
            }
            None => ("notices".to_string(), "state.sqlite".to_string()),
        };

        Self {
            raw_list: data.join("raw").join(format!("{raw_base}.jsonl")),
            normalized: data.join("normalized").join(format!("{norm_base}.jsonl")),
            errors_dir: data.join("errors"),
            state_db: root.join("state").join(state_file),
        }
    }
}

fn stream_base(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() {
        return None;
    }
    let split = name.len().saturating_sub(".jsonl".len());
    let base = match name.get(split..) {
        Some(ext) if ext.eq_ignore_ascii_case(".jsonl") => &name[..split],
        _ => name,
    };
    Some(base.to_string())
}

/// Run identifier: the UTC timestamp `YYYYMMDDTHHMMSSZ`.
pub fn run_id_at(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}
