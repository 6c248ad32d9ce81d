// src/storage/jsonl.rs

//! Append-only JSON Lines output streams.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Appends one JSON document per line to a file.
///
/// The file and its parent directories are created on the first write, so
/// a run that writes nothing leaves no file behind.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `value` and append it as one line.
    pub async fn write_one<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Number of non-empty lines in a JSONL file; 0 when the file is missing.
pub async fn count_lines(path: impl AsRef<Path>) -> Result<usize> {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(content) => Ok(content.lines().filter(|l| !l.trim().is_empty()).count()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}
