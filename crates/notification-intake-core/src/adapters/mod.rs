//! # Infrastructure Adapters
//!
//! In-memory implementations of the endpoint repository and ingestion store.

pub mod memory_endpoints;
pub mod memory_store;

pub use memory_endpoints::InMemoryEndpointRepository;
pub use memory_store::InMemoryIngestionStore;
