//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports, used by the node
//! binary and by tests.

mod broadcaster;
mod chain_tracker;
mod lookup_index;
mod memory_storage;
mod topic_managers;

pub use broadcaster::{ChannelBroadcaster, RelayRequest};
pub use chain_tracker::MerkleRootChainTracker;
pub use lookup_index::IndexLookupService;
pub use memory_storage::{InMemoryStorage, StorageStats};
pub use topic_managers::ScriptPrefixTopicManager;
