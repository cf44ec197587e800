//! # Node Configuration
//!
//! Engine, telemetry and wiring parameters, loaded from `OVERLAY_*`
//! environment variables.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OVERLAY_TOPICS` | `tm_default:` | `name:prefix_hex[:dep,dep]` entries separated by `;` |
//! | `OVERLAY_LOOKUP_SERVICE` | `ls_topics` | Name of the topic index lookup service |
//! | `OVERLAY_SUBMIT_TIMEOUT_SECS` | `30` | Pre-commit deadline, 0 disables |
//! | `OVERLAY_ABORT_ON_BROADCAST_FAILURE` | `true` | Broadcast failure aborts submission |
//! | `OVERLAY_MAX_DEPENDENCY_DEPTH` | `64` | Longest topic dependency chain |
//! | `OVERLAY_STORE_EVIDENCE` | `true` | Keep raw transactions on outputs |
//! | `OVERLAY_ACCEPT_UNCONFIRMED` | `false` | Accept submissions without a merkle path |
//! | `OVERLAY_RELAY_CAPACITY` | `256` | Broadcast relay queue size |
//! | `OVERLAY_REPLAY_FILE` | unset | JSON-lines submissions replayed in historical mode |
//! | `OVERLAY_KNOWN_ROOTS_FILE` | unset | JSON map of block height to merkle root hex |

use overlay_engine::EngineConfig;
use overlay_telemetry::TelemetryConfig;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Malformed topic entry '{0}', expected name:prefix_hex[:dep,dep]")]
    MalformedTopic(String),

    #[error("No topics configured")]
    NoTopics,

    #[error("Topic '{0}' configured more than once")]
    DuplicateTopic(String),

    #[error("Topic '{topic}' has invalid script prefix '{prefix}'")]
    InvalidPrefix { topic: String, prefix: String },

    #[error("Topic '{topic}' depends on unconfigured topic '{dependency}'")]
    UnknownDependency { topic: String, dependency: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("File not found: {0}")]
    MissingFile(PathBuf),
}

/// One configured topic, served by a script-prefix topic manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub name: String,
    pub script_prefix_hex: String,
    pub dependencies: Vec<String>,
}

impl TopicEntry {
    fn parse(entry: &str) -> Result<Self, ConfigError> {
        let mut fields = entry.split(':');
        let name = fields
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConfigError::MalformedTopic(entry.to_string()))?;
        let prefix = fields
            .next()
            .ok_or_else(|| ConfigError::MalformedTopic(entry.to_string()))?;
        let dependencies = fields
            .next()
            .map(|deps| {
                deps.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if fields.next().is_some() {
            return Err(ConfigError::MalformedTopic(entry.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            script_prefix_hex: prefix.trim().to_string(),
            dependencies,
        })
    }
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
    pub topics: Vec<TopicEntry>,
    pub lookup_service: String,
    pub accept_unconfirmed: bool,
    pub relay_capacity: usize,
    pub replay_file: Option<PathBuf>,
    pub known_roots_file: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            telemetry: TelemetryConfig::default(),
            topics: vec![TopicEntry {
                name: "tm_default".to_string(),
                script_prefix_hex: String::new(),
                dependencies: Vec::new(),
            }],
            lookup_service: "ls_topics".to_string(),
            accept_unconfirmed: false,
            relay_capacity: 256,
            replay_file: None,
            known_roots_file: None,
        }
    }
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.telemetry = TelemetryConfig::from_env();
        Ok(config)
    }

    /// Load from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(topics) = lookup("OVERLAY_TOPICS") {
            config.topics = topics
                .split(';')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(TopicEntry::parse)
                .collect::<Result<_, _>>()?;
        }
        if let Some(name) = lookup("OVERLAY_LOOKUP_SERVICE") {
            config.lookup_service = name;
        }
        if let Some(value) = lookup("OVERLAY_SUBMIT_TIMEOUT_SECS") {
            config.engine.submit_timeout_secs = parse("OVERLAY_SUBMIT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("OVERLAY_ABORT_ON_BROADCAST_FAILURE") {
            config.engine.abort_on_broadcast_failure =
                parse_bool("OVERLAY_ABORT_ON_BROADCAST_FAILURE", &value)?;
        }
        if let Some(value) = lookup("OVERLAY_MAX_DEPENDENCY_DEPTH") {
            config.engine.max_dependency_depth = parse("OVERLAY_MAX_DEPENDENCY_DEPTH", &value)?;
        }
        if let Some(value) = lookup("OVERLAY_STORE_EVIDENCE") {
            config.engine.store_evidence = parse_bool("OVERLAY_STORE_EVIDENCE", &value)?;
        }
        if let Some(value) = lookup("OVERLAY_ACCEPT_UNCONFIRMED") {
            config.accept_unconfirmed = parse_bool("OVERLAY_ACCEPT_UNCONFIRMED", &value)?;
        }
        if let Some(value) = lookup("OVERLAY_RELAY_CAPACITY") {
            config.relay_capacity = parse("OVERLAY_RELAY_CAPACITY", &value)?;
        }
        config.replay_file = lookup("OVERLAY_REPLAY_FILE").map(PathBuf::from);
        config.known_roots_file = lookup("OVERLAY_KNOWN_ROOTS_FILE").map(PathBuf::from);

        Ok(config)
    }

    /// Check the configuration is usable before wiring anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topics.is_empty() {
            return Err(ConfigError::NoTopics);
        }

        let mut names = HashSet::new();
        for topic in &self.topics {
            if !names.insert(topic.name.as_str()) {
                return Err(ConfigError::DuplicateTopic(topic.name.clone()));
            }
            if hex::decode(&topic.script_prefix_hex).is_err() {
                return Err(ConfigError::InvalidPrefix {
                    topic: topic.name.clone(),
                    prefix: topic.script_prefix_hex.clone(),
                });
            }
        }
        for topic in &self.topics {
            if let Some(dependency) = topic
                .dependencies
                .iter()
                .find(|d| !names.contains(d.as_str()))
            {
                return Err(ConfigError::UnknownDependency {
                    topic: topic.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }

        if self.relay_capacity == 0 {
            return Err(ConfigError::Zero("OVERLAY_RELAY_CAPACITY"));
        }
        if self.engine.max_dependency_depth == 0 {
            return Err(ConfigError::Zero("OVERLAY_MAX_DEPENDENCY_DEPTH"));
        }

        for path in [&self.replay_file, &self.known_roots_file].into_iter().flatten() {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.clone()));
            }
        }

        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
