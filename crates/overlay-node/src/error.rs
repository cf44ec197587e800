//! Node error types.

use crate::config::ConfigError;
use overlay_engine::{ChainTrackerError, TopicManagerError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path} at line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Chain tracker setup failed: {0}")]
    ChainTracker(#[from] ChainTrackerError),

    #[error("Topic manager '{topic}' setup failed: {source}")]
    TopicManager {
        topic: String,
        #[source]
        source: TopicManagerError,
    },
}

pub type NodeResult<T> = Result<T, NodeError>;
