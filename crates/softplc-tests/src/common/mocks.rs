// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Sources
//!
//! Scripted sources for exercising the supervisor without a network.
//!
//! A [`MockSourceConfig`] carries a [`MockBehavior`] and a [`MockProbe`].
//! Every source it creates shares the probe, so a test keeps counting calls
//! across reconnects.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use softplc_core::{
    ConfigError, ConfigResult, Duration, Source, SourceConfig, SourceError, SourceRegistry,
    SourceResult, SourceTiming, ValidatedConfig, VariableValue,
};

/// Protocol type under which mocks are registered.
pub const MOCK_TYPE: &str = "mock";

// =============================================================================
// Behavior & Probe
// =============================================================================

/// What a mock source does when the supervisor drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MockBehavior {
    /// Connects at once and every poll succeeds.
    #[default]
    Healthy,
    /// Every connect is refused.
    FailingConnect,
    /// Connect never completes.
    HangingConnect,
    /// The Nth poll call (1-based, counted across reconnects) fails.
    PollFailsOn(u64),
    /// The Nth poll call (1-based, counted across reconnects) never completes.
    PollHangsOn(u64),
}

/// Call counters shared between a mock config and its sources.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    inner: Arc<ProbeCounters>,
}

#[derive(Debug, Default)]
struct ProbeCounters {
    connects: AtomicU64,
    polls: AtomicU64,
    closes: AtomicU64,
}

impl MockProbe {
    /// Creates a probe with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `connect` calls.
    pub fn connects(&self) -> u64 {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of `poll` calls.
    pub fn polls(&self) -> u64 {
        self.inner.polls.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    pub fn closes(&self) -> u64 {
        self.inner.closes.load(Ordering::SeqCst)
    }
}

// =============================================================================
// MockSourceConfig
// =============================================================================

/// Configuration that builds [`MockSource`]s.
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    name: String,
    behavior: MockBehavior,
    timing: SourceTiming,
    probe: MockProbe,
}

impl MockSourceConfig {
    /// Default operation timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);
    /// Default poll interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Default retry interval.
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(200);

    /// Creates a config with the default timing and a fresh probe.
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            timing: SourceTiming {
                timeout: Self::DEFAULT_TIMEOUT,
                poll_interval: Self::DEFAULT_POLL_INTERVAL,
                retry_interval: Self::DEFAULT_RETRY_INTERVAL,
            },
            probe: MockProbe::new(),
        }
    }

    /// Overrides the timing, in milliseconds.
    pub fn with_timing(mut self, timeout_ms: i64, poll_ms: i64, retry_ms: i64) -> Self {
        self.timing = SourceTiming {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(poll_ms),
            retry_interval: Duration::from_millis(retry_ms),
        };
        self
    }

    /// Returns a handle to the shared call counters.
    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    /// Validates the config for the supervisor.
    ///
    /// # Panics
    ///
    /// Panics if the timing is not positive.
    pub fn validated(self) -> ValidatedConfig {
        match ValidatedConfig::new(Box::new(self)) {
            Ok(config) => config,
            Err(e) => panic!("mock config must validate: {}", e),
        }
    }
}

impl SourceConfig for MockSourceConfig {
    fn validate(&mut self) -> ConfigResult<()> {
        if self.timing.timeout.is_positive() {
            Ok(())
        } else {
            Err(ConfigError::validation("timeout", "must be positive"))
        }
    }

    fn protocol_type(&self) -> &str {
        MOCK_TYPE
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn timing(&self) -> SourceTiming {
        self.timing
    }

    fn endpoint(&self) -> String {
        format!("mock://{}", self.name)
    }

    fn create_source(&self) -> ConfigResult<Box<dyn Source>> {
        Ok(Box::new(MockSource {
            name: self.name.clone(),
            behavior: self.behavior,
            probe: self.probe.clone(),
            connected: false,
        }))
    }
}

// =============================================================================
// Registry Integration
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MockSettings {
    #[serde(default)]
    behavior: MockBehavior,
    timeout: Option<Duration>,
    #[serde(alias = "pollinterval")]
    poll_interval: Option<Duration>,
    #[serde(alias = "retryinterval")]
    retry_interval: Option<Duration>,
}

/// Registers the mock driver under [`MOCK_TYPE`].
///
/// Accepted settings: `behavior` (`healthy`, `failing-connect`,
/// `hanging-connect`, `{poll-fails-on: N}` or `{poll-hangs-on: N}`) and the
/// three timing fields.
pub fn register_mock(registry: &SourceRegistry) {
    registry.register(MOCK_TYPE, |name, raw| {
        let settings: MockSettings = serde_json::from_value(raw.clone())
            .map_err(|e| ConfigError::parse(name, e.to_string()))?;

        let mut config = MockSourceConfig::new(name, settings.behavior);
        if let Some(timeout) = settings.timeout {
            config.timing.timeout = timeout;
        }
        if let Some(poll_interval) = settings.poll_interval {
            config.timing.poll_interval = poll_interval;
        }
        if let Some(retry_interval) = settings.retry_interval {
            config.timing.retry_interval = retry_interval;
        }
        Ok(Box::new(config) as Box<dyn SourceConfig>)
    });
}

// =============================================================================
// MockSource
// =============================================================================

/// A source whose outcome is fixed by its [`MockBehavior`].
///
/// Successful polls return one variable, `count`, holding the poll number.
#[derive(Debug)]
pub struct MockSource {
    name: String,
    behavior: MockBehavior,
    probe: MockProbe,
    connected: bool,
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol_type(&self) -> &str {
        MOCK_TYPE
    }

    async fn connect(&mut self) -> SourceResult<()> {
        self.probe.inner.connects.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            MockBehavior::FailingConnect => {
                Err(SourceError::connection_failed("connection refused"))
            }
            MockBehavior::HangingConnect => std::future::pending().await,
            MockBehavior::Healthy | MockBehavior::PollFailsOn(_) | MockBehavior::PollHangsOn(_) => {
                self.connected = true;
                Ok(())
            }
        }
    }

    async fn poll(&mut self) -> SourceResult<Vec<VariableValue>> {
        let call = self.probe.inner.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.behavior == MockBehavior::PollFailsOn(call) {
            return Err(SourceError::protocol(format!("scripted failure on poll {}", call)));
        }
        if self.behavior == MockBehavior::PollHangsOn(call) {
            std::future::pending::<()>().await;
        }
        Ok(vec![VariableValue::new("count", call as f64)])
    }

    async fn close(&mut self) -> SourceResult<()> {
        self.probe.inner.closes.fetch_add(1, Ordering::SeqCst);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_fails_on_nth_call_only() {
        let config = MockSourceConfig::new("m", MockBehavior::PollFailsOn(2));
        let probe = config.probe();
        let mut source = config.create_source().unwrap();

        source.connect().await.unwrap();
        assert!(source.poll().await.is_ok());
        assert!(source.poll().await.is_err());
        assert!(source.poll().await.is_ok());
        assert_eq!(probe.polls(), 3);
        assert_eq!(probe.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_hangs_on_nth_call_only() {
        let config = MockSourceConfig::new("m", MockBehavior::PollHangsOn(2));
        let mut source = config.create_source().unwrap();
        let limit = std::time::Duration::from_millis(50);

        source.connect().await.unwrap();
        assert!(tokio::time::timeout(limit, source.poll()).await.is_ok());
        assert!(tokio::time::timeout(limit, source.poll()).await.is_err());
        assert!(tokio::time::timeout(limit, source.poll()).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_shared_across_sources() {
        let config = MockSourceConfig::new("m", MockBehavior::Healthy);
        let probe = config.probe();

        for _ in 0..2 {
            let mut source = config.create_source().unwrap();
            source.connect().await.unwrap();
            source.close().await.unwrap();
        }
        assert_eq!(probe.connects(), 2);
        assert_eq!(probe.closes(), 2);
    }

    #[test]
    fn test_registered_mock_parses_settings() {
        let registry = SourceRegistry::new();
        register_mock(&registry);

        let raw = serde_json::json!({
            "behavior": {"poll-fails-on": 3},
            "pollInterval": "250ms"
        });
        let config = registry.parse_config(MOCK_TYPE, "m", &raw).unwrap();
        assert_eq!(config.timing().poll_interval, std::time::Duration::from_millis(250));
        assert_eq!(config.endpoint(), "mock://m");

        let bad = serde_json::json!({"behavior": "exploding"});
        assert!(registry.parse_config(MOCK_TYPE, "m", &bad).is_err());
    }
}
