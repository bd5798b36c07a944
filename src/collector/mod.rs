//! Collector contracts and the scrape-time registry.
//!
//! Collectors are registered explicitly by [`CollectorRegistry::with_defaults`]
//! at startup; there is no load-time self-registration, so registration order
//! is deterministic and the table is read-only once serving begins.

pub mod players;
pub mod system;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CollectorsConfig;
use crate::parse::ParseError;
use crate::rcon::{RawReply, Transport};

/// Describes one metric family: name, help text, and label schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// One emitted sample. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub desc: MetricDesc,
    /// Ordered to match `desc.labels`.
    pub label_values: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    /// Build a sample, enforcing that the label values match the
    /// descriptor's schema arity. A mismatch is a collector bug, not a
    /// runtime condition, hence the panic.
    pub fn new(desc: MetricDesc, label_values: Vec<String>, value: f64) -> Self {
        assert_eq!(
            desc.labels.len(),
            label_values.len(),
            "label arity mismatch for {}",
            desc.name
        );
        Self {
            desc,
            label_values,
            value,
        }
    }
}

/// Errors that abort one collector's update for the current scrape.
///
/// The orchestrator logs these and omits the collector's series; sibling
/// collectors still run.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The transport reported a failed exchange where data was required.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A reply did not parse; typically a mid-scrape disconnect or a
    /// server-version phrasing change.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Unwrap a reply for a collector that needs its data.
pub(crate) fn require_data(reply: RawReply) -> Result<String, CollectorError> {
    if reply.is_error {
        Err(CollectorError::Transport(reply.text))
    } else {
        Ok(reply.text)
    }
}

/// A unit producing one named group of metric samples per scrape.
///
/// Invoked once per scrape it participates in; holds no connection state
/// between invocations.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn update(&self, transport: &dyn Transport) -> Result<Vec<MetricSample>, CollectorError>;
}

/// A named collector with its resolved default-enabled flag.
pub struct Registration {
    pub name: &'static str,
    pub enabled_by_default: bool,
    pub collector: Box<dyn Collector>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("enabled_by_default", &self.enabled_by_default)
            .finish_non_exhaustive()
    }
}

/// Errors raised while building the registry. Fatal: the process must not
/// start serving over a broken table.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate collector name {0:?}")]
    Duplicate(&'static str),
}

/// Errors raised while resolving a scrape request's filters. Surfaces to the
/// scrape caller as a client error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("combined collect and exclude queries are not allowed")]
    CombinedFilters,
    #[error("unknown collector {0:?}")]
    UnknownCollector(String),
}

/// Process-wide table of collector registrations, read-only after startup.
pub struct CollectorRegistry {
    registrations: Vec<Registration>,
}

impl CollectorRegistry {
    /// Build the registry with every known collector, resolving each
    /// default-enabled flag against the configured overrides.
    pub fn with_defaults(config: &CollectorsConfig) -> Result<Self, RegistryError> {
        let mut registry = Self {
            registrations: Vec::new(),
        };
        registry.register(config, "players", true, Box::new(players::PlayersCollector))?;
        registry.register(config, "system", true, Box::new(system::SystemCollector))?;
        Ok(registry)
    }

    fn register(
        &mut self,
        config: &CollectorsConfig,
        name: &'static str,
        enabled_by_default: bool,
        collector: Box<dyn Collector>,
    ) -> Result<(), RegistryError> {
        if self.registrations.iter().any(|r| r.name == name) {
            return Err(RegistryError::Duplicate(name));
        }

        let enabled_by_default = match config.defaults.get(name) {
            Some(&configured) => configured,
            None => enabled_by_default && !config.disable_defaults,
        };

        self.registrations.push(Registration {
            name,
            enabled_by_default,
            collector,
        });
        Ok(())
    }

    /// Resolve the active collector set for one scrape request.
    ///
    /// At most one of `include` / `exclude` may be non-empty. `include`
    /// selects exactly the named collectors regardless of their defaults and
    /// rejects unknown names; `exclude` removes names from the
    /// default-enabled set (unknown names in it are harmless); neither means
    /// the default-enabled set.
    pub fn active_set(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<&Registration>, FilterError> {
        if !include.is_empty() && !exclude.is_empty() {
            return Err(FilterError::CombinedFilters);
        }

        if !include.is_empty() {
            for name in include {
                if !self.registrations.iter().any(|r| r.name == name.as_str()) {
                    return Err(FilterError::UnknownCollector(name.clone()));
                }
            }
            return Ok(self
                .registrations
                .iter()
                .filter(|r| include.iter().any(|name| name == r.name))
                .collect());
        }

        Ok(self
            .registrations
            .iter()
            .filter(|r| r.enabled_by_default && !exclude.iter().any(|name| name == r.name))
            .collect())
    }

    /// Names of the default-enabled collectors, for startup logging.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        self.registrations
            .iter()
            .filter(|r| r.enabled_by_default)
            .map(|r| r.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn names(set: &[&Registration]) -> Vec<&'static str> {
        set.iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_default_set() {
        let registry = CollectorRegistry::with_defaults(&CollectorsConfig::default()).unwrap();
        let active = registry.active_set(&[], &[]).unwrap();
        assert_eq!(names(&active), vec!["players", "system"]);
    }

    #[test]
    fn test_combined_filters_rejected() {
        let registry = CollectorRegistry::with_defaults(&CollectorsConfig::default()).unwrap();
        let err = registry
            .active_set(&["players".into()], &["system".into()])
            .unwrap_err();
        assert_eq!(err, FilterError::CombinedFilters);
    }

    #[test]
    fn test_include_unknown_name_rejected() {
        let registry = CollectorRegistry::with_defaults(&CollectorsConfig::default()).unwrap();
        let err = registry.active_set(&["nether".into()], &[]).unwrap_err();
        assert_eq!(err, FilterError::UnknownCollector("nether".into()));
    }

    #[test]
    fn test_include_overrides_disabled_default() {
        let config = CollectorsConfig {
            disable_defaults: true,
            defaults: HashMap::new(),
        };
        let registry = CollectorRegistry::with_defaults(&config).unwrap();

        assert!(registry.active_set(&[], &[]).unwrap().is_empty());

        let active = registry.active_set(&["players".into()], &[]).unwrap();
        assert_eq!(names(&active), vec!["players"]);
    }

    #[test]
    fn test_exclude_removes_from_default_set() {
        let registry = CollectorRegistry::with_defaults(&CollectorsConfig::default()).unwrap();
        let active = registry.active_set(&[], &["players".into()]).unwrap();
        assert_eq!(names(&active), vec!["system"]);
    }

    #[test]
    fn test_exclude_unknown_name_is_harmless() {
        let registry = CollectorRegistry::with_defaults(&CollectorsConfig::default()).unwrap();
        let active = registry.active_set(&[], &["nether".into()]).unwrap();
        assert_eq!(names(&active), vec!["players", "system"]);
    }

    #[test]
    fn test_per_name_default_override_wins_over_global_toggle() {
        let config = CollectorsConfig {
            disable_defaults: true,
            defaults: HashMap::from([("system".to_string(), true)]),
        };
        let registry = CollectorRegistry::with_defaults(&config).unwrap();
        assert_eq!(registry.enabled_names(), vec!["system"]);
    }

    #[test]
    fn test_sample_arity_enforced() {
        const DESC: MetricDesc = MetricDesc {
            name: "test_metric",
            help: "Test.",
            labels: &["a", "b"],
        };
        let sample = MetricSample::new(DESC, vec!["1".into(), "2".into()], 1.0);
        assert_eq!(sample.label_values.len(), 2);

        let result = std::panic::catch_unwind(|| MetricSample::new(DESC, vec!["1".into()], 1.0));
        assert!(result.is_err());
    }
}
