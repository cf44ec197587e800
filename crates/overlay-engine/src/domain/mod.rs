//! Domain module for the overlay engine
//!
//! Contains core entities, the per-submission context, and errors.

pub mod context;
pub mod entities;
pub mod errors;

pub use context::*;
pub use entities::*;
pub use errors::*;
