//! # Overlay Engine
//!
//! Topic-scoped UTXO tracking over a base blockchain. Submitted transactions
//! are verified, decided by pluggable topic managers, and committed with
//! provenance links; outputs no longer retained by any descendant are pruned.
//!
//! ## Architecture
//!
//! - **Domain**: `Output`, `AppliedTransaction`, `Admittance`, `SubmitContext`
//! - **Algorithms**: dependency resolution order, provenance bookkeeping
//! - **Ports**: Inbound (`OverlayEngineApi`) and Outbound (`ChainTracker`,
//!   `Broadcaster`, `OverlayStorage`, `TopicManager`, `LookupService`)
//! - **Application**: `Engine` (submission pipeline, commit, cascade)
//! - **Adapters**: in-memory storage, merkle-root chain tracker, channel
//!   broadcaster, topic index lookup, script-prefix topic manager

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{CascadeReport, Engine, EngineBuilder};
pub use config::EngineConfig;
pub use domain::context::{AdmissionContext, SubmitContext};
pub use domain::entities::*;
pub use domain::errors::*;
pub use ports::inbound::OverlayEngineApi;
pub use ports::outbound::{Broadcaster, ChainTracker, LookupService, OverlayStorage, TopicManager};
