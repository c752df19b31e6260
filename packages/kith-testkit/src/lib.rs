//! In-memory store and provider doubles for exercising the pipeline and the
//! search engine without Postgres, Qdrant, or any upstream HTTP service.

mod providers;
mod stores;

pub use providers::{
	CountingEmbedder, StaticConsentClient, StaticDirectoryClient, StaticProfileClient,
	StubImageAnalyzer,
};
pub use stores::{MemoryEmbeddingStore, MemoryQueryLog, MemoryReindexStore};
