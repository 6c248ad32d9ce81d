//! Persistence: resume state, output streams and failure evidence.
//!
//! ```text
//! {root}/
//! ├── data/
//! │   ├── raw/list_YYYYMMDD.jsonl     # one ListItem per line
//! │   ├── normalized/notices.jsonl    # one DetailRecord per line
//! │   └── errors/{id}_{ts}.{html,png,json}
//! └── state/state.sqlite
//! ```

pub mod evidence;
pub mod jsonl;
pub mod state;

pub use evidence::{EvidenceBundle, EvidenceMeta, save_evidence};
pub use jsonl::{JsonlWriter, count_lines};
pub use state::{PAGE_CHECKPOINT, StateStore};
