//! Configuration for the routing client and the synchronisation engine.

use std::time::Duration;

use crate::model::RouteOptions;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const API_URL_ENV: &str = "MOTO_API_URL";
/// Environment variable overriding [`ClientConfig::timeout_secs`].
pub const API_TIMEOUT_ENV: &str = "MOTO_API_TIMEOUT_SECS";

/// Quiet period after the last change before routes are recomputed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(&base_url.into()),
            ..Self::default()
        }
    }

    /// Defaults overridden by `MOTO_API_URL` / `MOTO_API_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            config.base_url = trim_base_url(url.trim());
        }
        if let Some(secs) = lookup(API_TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            config.timeout_secs = secs;
        }
        config
    }

    pub fn routes_url(&self) -> String {
        format!("{}/routes", self.base_url)
    }

    pub fn stations_url(&self) -> String {
        format!("{}/estaciones", self.base_url)
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// How the `alternatives` flag is set on automatic routing requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlternativesPolicy {
    /// Always request a single route.
    #[default]
    ForceOff,
    /// Always request alternatives.
    ForceOn,
    /// Use whatever the current [`RouteOptions`] say.
    FromOptions,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub debounce: Duration,
    pub alternatives: AlternativesPolicy,
    /// Overrides `steps` on every request when set.
    pub force_steps: Option<bool>,
    /// Options in effect when the engine is created.
    pub initial_options: RouteOptions,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            alternatives: AlternativesPolicy::ForceOff,
            force_steps: Some(true),
            initial_options: RouteOptions::default(),
        }
    }
}

impl SyncConfig {
    /// The options actually sent on the wire for a round.
    pub fn effective_options(&self, options: &RouteOptions) -> RouteOptions {
        let mut effective = options.clone();
        match self.alternatives {
            AlternativesPolicy::ForceOff => effective.alternatives = false,
            AlternativesPolicy::ForceOn => effective.alternatives = true,
            AlternativesPolicy::FromOptions => {}
        }
        if let Some(steps) = self.force_steps {
            effective.steps = steps;
        }
        effective
    }
}
