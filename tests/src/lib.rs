//! # Overlay Test Suite
//!
//! Cross-crate scenarios driving the engine through its public API with
//! the in-process adapters.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs      # transaction builders and test doubles
//!     ├── submission.rs   # pipeline gates, ordering, idempotency
//!     ├── provenance.rs   # referrer accounting and cascading deletion
//!     └── end_to_end.rs   # multi-transaction chains and node-level flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p overlay-tests
//! cargo test -p overlay-tests integration::provenance::
//! ```

pub mod integration;
