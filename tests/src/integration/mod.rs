//! Integration scenarios for the overlay engine.

pub mod end_to_end;
pub mod provenance;
pub mod submission;
pub mod support;
