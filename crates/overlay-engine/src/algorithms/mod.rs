//! Algorithms module for the overlay engine
//!
//! Contains:
//! - Topic dependency resolution order
//! - Provenance partitioning and referrer-list updates

pub mod dependency_order;
pub mod provenance;

pub use dependency_order::resolution_order;
pub use provenance::{
    dangling_retains, merge_referrers, partition_inputs, remove_referrer, InputPartition,
};
