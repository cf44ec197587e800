//! # Overlay Node
//!
//! Process wiring for the overlay engine.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `OVERLAY_*` environment variables
//! 2. Validate topic wiring and referenced files
//! 3. Initialize logging and metrics
//! 4. Build the engine with in-process adapters, spawn the relay task
//! 5. Replay the historical backfill file, if configured
//! 6. Wait for Ctrl+C, then shut down

pub mod config;
pub mod error;
pub mod replay;
pub mod runtime;

pub use config::{ConfigError, NodeConfig, TopicEntry};
pub use error::{NodeError, NodeResult};
pub use replay::{read_submissions, replay, ReplaySummary};
pub use runtime::NodeRuntime;
