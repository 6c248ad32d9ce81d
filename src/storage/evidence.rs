// src/storage/evidence.rs

//! Failure evidence bundles.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::browser::PageDriver;
use crate::error::AppError;
use crate::utils::{safe_filename, utc_now_compact, utc_now_iso};

/// Metadata file written next to the captured page.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceMeta {
    pub notice_id: String,
    pub error: String,
    pub url: String,
    pub collected_at_utc: String,
}

/// Files actually written for one failure.
#[derive(Debug, Default)]
pub struct EvidenceBundle {
    pub html: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
    pub meta: Option<PathBuf>,
}

/// Capture `{id}_{ts}.html`, `.png` and `.json` into `errors_dir`.
///
/// Each capture is independent: a failed screenshot still leaves the
/// markup and the metadata. Failures are logged, never returned.
pub async fn save_evidence(
    errors_dir: &Path,
    notice_id: &str,
    driver: &mut dyn PageDriver,
    error: &AppError,
) -> EvidenceBundle {
    let mut bundle = EvidenceBundle::default();
    if let Err(e) = tokio::fs::create_dir_all(errors_dir).await {
        log::warn!("Cannot create {}: {}", errors_dir.display(), e);
        return bundle;
    }
    let stem = format!("{}_{}", safe_filename(notice_id), utc_now_compact());
    let html_path = errors_dir.join(format!("{stem}.html"));
    let png_path = errors_dir.join(format!("{stem}.png"));
    let meta_path = errors_dir.join(format!("{stem}.json"));

    match driver.content().await {
        Ok(html) => match tokio::fs::write(&html_path, html).await {
            Ok(()) => bundle.html = Some(html_path),
            Err(e) => log::warn!("Evidence html write failed: {}", e),
        },
        Err(e) => log::warn!("Evidence html capture failed: {}", e),
    }

    match driver.screenshot().await {
        Ok(png) => match tokio::fs::write(&png_path, png).await {
            Ok(()) => bundle.screenshot = Some(png_path),
            Err(e) => log::warn!("Evidence screenshot write failed: {}", e),
        },
        Err(e) => log::warn!("Evidence screenshot capture failed: {}", e),
    }

    let meta = EvidenceMeta {
        notice_id: notice_id.to_string(),
        error: error.to_string(),
        url: driver.current_url().await.unwrap_or_default(),
        collected_at_utc: utc_now_iso(),
    };
    match serde_json::to_vec_pretty(&meta) {
        Ok(bytes) => match tokio::fs::write(&meta_path, bytes).await {
            Ok(()) => bundle.meta = Some(meta_path),
            Err(e) => log::warn!("Evidence metadata write failed: {}", e),
        },
        Err(e) => log::warn!("Evidence metadata encode failed: {}", e),
    }

    bundle
}
