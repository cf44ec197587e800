//! Ports module for the overlay engine
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::OverlayEngineApi;
pub use outbound::{Broadcaster, ChainTracker, LookupService, OverlayStorage, TopicManager};
