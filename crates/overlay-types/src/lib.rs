//! # Overlay Types Crate
//!
//! Value types shared across the overlay workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `TxId`, `Outpoint` and the transaction model
//!   are defined once here and used as map/set keys everywhere.
//! - **Wire Fidelity**: `Transaction` round-trips the legacy Bitcoin wire
//!   format byte for byte, so the transaction id is always the double
//!   SHA-256 of exactly the bytes that were submitted.
//! - **No I/O**: nothing in this crate touches storage or the network.

pub mod entities;
pub mod errors;
pub mod merkle;
pub mod transaction;

pub use entities::*;
pub use errors::*;
pub use merkle::*;
pub use transaction::*;
