//! Error types for the overlay engine
//!
//! `EngineError` is what `Engine::submit` and the other entry points return.
//! The capability errors (`StorageError`, `ChainTrackerError`, ...) are what
//! the outbound port implementations return; the engine wraps them.

use overlay_types::{Outpoint, TxId, TypesError};
use thiserror::Error;

/// Failure classes a caller can act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A requested topic has no registered manager. Nothing was written.
    UnknownTopic,
    /// A requested lookup service is not registered.
    UnknownService,
    /// Parse failure or failed inclusion proof. Nothing was written.
    InvalidTransaction,
    /// Network relay rejected the transaction. No commit writes happened.
    BroadcastFailure,
    /// A topic manager, its dependency graph or a resolution-time storage
    /// call failed. No topic was committed.
    DependencyFailure,
    /// Storage or lookup notification failed while committing. Topics
    /// already committed in this submission stay committed.
    StorageFailure,
    /// The pre-commit deadline elapsed.
    Timeout,
}

impl ErrorKind {
    /// Stable label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTopic => "unknown_topic",
            Self::UnknownService => "unknown_service",
            Self::InvalidTransaction => "invalid_transaction",
            Self::BroadcastFailure => "broadcast_failure",
            Self::DependencyFailure => "dependency_failure",
            Self::StorageFailure => "storage_failure",
            Self::Timeout => "timeout",
        }
    }
}

/// All errors returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested topic has no registered manager
    #[error("Unknown topic: {topic}")]
    UnknownTopic { topic: String },

    /// Requested lookup service is not registered
    #[error("Unknown lookup service: {service}")]
    UnknownLookupService { service: String },

    /// Transaction evidence did not parse
    #[error("Failed to parse transaction: {0}")]
    Parse(#[from] TypesError),

    /// Inclusion proof rejected by the chain tracker
    #[error("Invalid transaction {txid}: {reason}")]
    InvalidTransaction { txid: TxId, reason: String },

    /// Chain tracker could not answer (fails closed)
    #[error("Chain tracker failed: {0}")]
    ChainTracker(#[from] ChainTrackerError),

    /// Broadcast rejected
    #[error("Broadcast of {txid} failed: {source}")]
    Broadcast {
        txid: TxId,
        #[source]
        source: BroadcastError,
    },

    /// Topic manager returned an error
    #[error("Topic manager '{topic}' failed: {source}")]
    TopicManager {
        topic: String,
        #[source]
        source: TopicManagerError,
    },

    /// Topic manager returned indices outside the transaction
    #[error("Topic manager '{topic}' returned an invalid admittance: {reason}")]
    InvalidAdmittance { topic: String, reason: String },

    /// Topic dependency declarations form a cycle
    #[error("Cyclic topic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A declared dependency is not a registered topic
    #[error("Topic '{required_by}' depends on unknown topic '{topic}'")]
    UnknownDependency { topic: String, required_by: String },

    /// Dependency chain exceeds the configured depth
    #[error("Dependency chain for '{topic}' exceeds maximum depth {max_depth}")]
    DependencyTooDeep { topic: String, max_depth: usize },

    /// Storage failed while a topic was being resolved
    #[error("Storage failed while resolving topic '{topic}': {source}")]
    ResolutionStorage {
        topic: String,
        #[source]
        source: StorageError,
    },

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Lookup service notification failed
    #[error("Lookup service '{service}' failed: {source}")]
    LookupService {
        service: String,
        #[source]
        source: LookupServiceError,
    },

    /// Pre-commit deadline elapsed
    #[error("Submission timed out before commit")]
    Timeout,
}

impl EngineError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTopic { .. } => ErrorKind::UnknownTopic,
            Self::UnknownLookupService { .. } => ErrorKind::UnknownService,
            Self::Parse(_) | Self::InvalidTransaction { .. } | Self::ChainTracker(_) => {
                ErrorKind::InvalidTransaction
            }
            Self::Broadcast { .. } => ErrorKind::BroadcastFailure,
            Self::TopicManager { .. }
            | Self::InvalidAdmittance { .. }
            | Self::CyclicDependency { .. }
            | Self::UnknownDependency { .. }
            | Self::DependencyTooDeep { .. }
            | Self::ResolutionStorage { .. } => ErrorKind::DependencyFailure,
            Self::Storage(_) | Self::LookupService { .. } => ErrorKind::StorageFailure,
            Self::Timeout => ErrorKind::Timeout,
        }
    }
}

/// Errors from dependency ordering, before they are lifted into `EngineError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("unknown topic '{topic}'")]
    UnknownTopic {
        topic: String,
        required_by: Option<String>,
    },

    #[error("depth exceeded at '{topic}'")]
    TooDeep { topic: String, max_depth: usize },
}

impl From<DependencyError> for EngineError {
    fn from(err: DependencyError) -> Self {
        match err {
            DependencyError::Cycle(cycle) => Self::CyclicDependency { cycle },
            DependencyError::UnknownTopic {
                topic,
                required_by: Some(required_by),
            } => Self::UnknownDependency { topic, required_by },
            DependencyError::UnknownTopic {
                topic,
                required_by: None,
            } => Self::UnknownTopic { topic },
            DependencyError::TooDeep { topic, max_depth } => {
                Self::DependencyTooDeep { topic, max_depth }
            }
        }
    }
}

/// Storage backend errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("Result for {topic} has {actual} entries, expected {expected}")]
    Misaligned {
        topic: String,
        expected: usize,
        actual: usize,
    },

    #[error("Output {outpoint} not found in topic {topic}")]
    NotFound { outpoint: Outpoint, topic: String },
}

/// Chain tracker errors
#[derive(Debug, Clone, Error)]
pub enum ChainTrackerError {
    #[error("Chain state unavailable: {0}")]
    Unavailable(String),
}

/// Broadcast errors
#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    #[error("Rejected by network: {0}")]
    Rejected(String),

    #[error("Relay channel closed")]
    ChannelClosed,
}

/// Topic manager errors
#[derive(Debug, Clone, Error)]
pub enum TopicManagerError {
    #[error("Rule evaluation failed: {0}")]
    Rule(String),

    #[error("Missing dependency admittance for topic {0}")]
    MissingDependency(String),
}

/// Lookup service errors
#[derive(Debug, Clone, Error)]
pub enum LookupServiceError {
    #[error("Index update failed: {0}")]
    Index(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
}
