//! HTTP reachability check
//!
//! Issues a GET against the configured URL and reports healthy only on a
//! `200 OK`. The HTTP client is built once and reused across cycles.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::{CheckResult, checks::Check, util::round_millis};

/// Parameters accepted by the `http` check type
#[derive(Debug, Clone, Deserialize)]
pub struct HttpParams {
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    5
}

pub struct HttpCheck {
    name: String,
    url: String,
    timeout: Duration,

    /// HTTP client (reused across requests)
    client: reqwest::Client,
}

impl HttpCheck {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(name, url, Duration::from_secs(default_timeout()))
    }

    pub fn with_timeout(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        ensure!(!timeout.is_zero(), "timeout must be non-zero");

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            timeout,
            client,
        })
    }

    pub fn from_params(name: impl Into<String>, params: HttpParams) -> Result<Self> {
        Self::with_timeout(name, params.url, Duration::from_secs(params.timeout))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Check for HttpCheck {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(check = %self.name))]
    async fn run(&self) -> CheckResult {
        trace!("requesting {}", self.url);

        let start = Instant::now();
        let response = self.client.get(&self.url).send().await;
        let elapsed = round_millis(start.elapsed());

        match response {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                CheckResult::healthy(&self.name, "Website is healthy").with_response_time(elapsed)
            }
            Ok(response) => CheckResult::failure(
                &self.name,
                format!("Server returned status {}", response.status().as_u16()),
            )
            .with_response_time(elapsed),
            Err(e) => {
                debug!("{}: request failed: {e}", self.url);
                CheckResult::failure(&self.name, format!("Connection failed: {e}"))
            }
        }
    }
}
