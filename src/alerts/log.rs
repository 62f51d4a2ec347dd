//! Failure log alert
//!
//! Appends one line per failing result to a log file. The file is opened once
//! when the alert is built and never truncated; concurrent failures are
//! serialized through the file mutex.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

use crate::{CheckResult, alerts::Alert, util::get_default_log_file};

/// Parameters accepted by the `log` alert type
#[derive(Debug, Clone, Deserialize)]
pub struct LogParams {
    #[serde(default = "get_default_log_file")]
    pub filename: String,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            filename: get_default_log_file(),
        }
    }
}

pub struct LogAlert {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogAlert {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        debug!("log alert writing to {}", path.display());

        Ok(Self {
            path,
            file: Mutex::new(File::from_std(file)),
        })
    }

    pub fn from_params(params: LogParams) -> Result<Self> {
        Self::open(params.filename)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_line(result: &CheckResult) -> String {
        format!(
            "{} - ERROR - Check '{}' failed: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            result.name,
            result.message
        )
    }
}

#[async_trait]
impl Alert for LogAlert {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, result: &CheckResult) -> Result<()> {
        if result.status {
            return Ok(());
        }

        let line = format!("{}\n", Self::format_line(result));
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to write to {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}
