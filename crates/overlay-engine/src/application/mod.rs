//! Application layer: the engine and its submission pipeline.

mod commit;
mod resolution;
pub mod service;

pub use commit::CascadeReport;
pub use service::{Engine, EngineBuilder};
