use std::io::Write;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{CheckResult, alerts::Alert};

/// Prints every result, healthy or not.
pub struct ConsoleAlert {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleAlert {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    pub fn format_line(result: &CheckResult) -> String {
        let label = if result.status {
            "✅ SUCCESS"
        } else {
            "❌ FAILURE"
        };
        format!(
            "[{label}] {}: {} ({}s)",
            result.name, result.message, result.response_time
        )
    }
}

impl Default for ConsoleAlert {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Alert for ConsoleAlert {
    fn name(&self) -> &str {
        "console"
    }

    async fn handle(&self, result: &CheckResult) -> anyhow::Result<()> {
        let line = Self::format_line(result);
        let mut out = self.out.lock().await;
        writeln!(out, "{line}").context("failed to write console alert")?;
        out.flush().context("failed to flush console alert")?;
        Ok(())
    }
}
