//! Type registry
//!
//! Maps the `type` tag of a configuration entry to a constructor. The registry
//! is an ordinary value built by the caller, so tests can register fakes
//! without touching any shared state.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::{
    alerts::{Alert, ConsoleAlert, LogAlert, LogParams},
    checks::{Check, HttpCheck, HttpParams, SystemCheck, SystemParams},
    config::{AlertConfig, CheckConfig},
    error::{MonitorError, MonitorResult},
};

/// Builds a check from its name and raw parameters
pub type CheckConstructor =
    Box<dyn Fn(&str, Value) -> anyhow::Result<Arc<dyn Check>> + Send + Sync>;

/// Builds an alert from its raw parameters
pub type AlertConstructor = Box<dyn Fn(Value) -> anyhow::Result<Arc<dyn Alert>> + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    checks: HashMap<String, CheckConstructor>,
    alerts: HashMap<String, AlertConstructor>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the `http`, `system`, `console` and `log` types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_check("http", |name, params| {
            let params: HttpParams = parse_params(params)?;
            Ok(Arc::new(HttpCheck::from_params(name, params)?))
        });
        registry.register_check("system", |name, params| {
            let params: SystemParams = parse_params(params)?;
            Ok(Arc::new(SystemCheck::new(name, params)))
        });
        registry.register_alert("console", |_| Ok(Arc::new(ConsoleAlert::new())));
        registry.register_alert("log", |params| {
            let params: LogParams = parse_params(params)?;
            Ok(Arc::new(LogAlert::from_params(params)?))
        });

        registry
    }

    pub fn register_check<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&str, Value) -> anyhow::Result<Arc<dyn Check>> + Send + Sync + 'static,
    {
        self.checks.insert(kind.into(), Box::new(constructor));
    }

    pub fn register_alert<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(Value) -> anyhow::Result<Arc<dyn Alert>> + Send + Sync + 'static,
    {
        self.alerts.insert(kind.into(), Box::new(constructor));
    }

    pub fn has_check_type(&self, kind: &str) -> bool {
        self.checks.contains_key(kind)
    }

    pub fn has_alert_type(&self, kind: &str) -> bool {
        self.alerts.contains_key(kind)
    }

    pub fn create_check(&self, config: &CheckConfig) -> MonitorResult<Arc<dyn Check>> {
        let constructor = self
            .checks
            .get(&config.kind)
            .ok_or_else(|| MonitorError::UnknownCheckType(config.kind.clone()))?;

        trace!("building {} check {}", config.kind, config.name);
        let check = constructor(&config.name, config.params.clone())
            .map_err(|e| invalid_params(&config.kind, e))?;

        if check.name() != config.name {
            return Err(MonitorError::ResultNameMismatch {
                expected: config.name.clone(),
                actual: check.name().to_string(),
            });
        }

        Ok(check)
    }

    pub fn create_alert(&self, config: &AlertConfig) -> MonitorResult<Arc<dyn Alert>> {
        let constructor = self
            .alerts
            .get(&config.kind)
            .ok_or_else(|| MonitorError::UnknownAlertType(config.kind.clone()))?;

        trace!("building {} alert", config.kind);
        constructor(config.params.clone()).map_err(|e| invalid_params(&config.kind, e))
    }
}

/// Deserialize constructor parameters; a missing `params` object means "all
/// defaults".
pub fn parse_params<T: DeserializeOwned>(params: Value) -> anyhow::Result<T> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(params).context("failed to parse parameters")
}

fn invalid_params(kind: &str, error: anyhow::Error) -> MonitorError {
    MonitorError::InvalidParams {
        kind: kind.to_string(),
        reason: format!("{error:#}"),
    }
}
