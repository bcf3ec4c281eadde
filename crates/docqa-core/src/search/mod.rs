//! Session-scoped semantic retrieval
//!
//! This module turns uploaded document text into a persisted vector index and
//! answers top-k queries against it.
//!
//! ## Features
//!
//! - Fixed-size, Unicode-safe document chunking
//! - Exhaustive squared-L2 nearest-neighbor search with deterministic ties
//! - Versioned on-disk session artifacts written with atomic renames
//! - Scoped device memory leases for index build and search
//! - OpenAI-compatible embedding and chat completion clients
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docqa_core::search::{Indexer, Retriever};
//!
//! let stats = indexer.index_document(&text).await?;
//! let context = retriever
//!     .answer_context(&stats.session_id, "what is the refund policy?", None)
//!     .await?;
//! ```

mod chunker;
mod config;
mod device;
mod embedding;
mod error;
mod generator;
mod index_store;
mod indexer;
mod retriever;
mod session;
mod types;

#[cfg(test)]
mod tests;

pub use chunker::Chunker;
pub use config::{
    DeviceConfig, DocQaConfig, EmbeddingConfig, GenerationConfig, PathsConfig, RetrievalConfig,
};
pub use device::{device_from_limit, ComputeDevice, DeviceLease, HostDevice, MemoryBudgetDevice};
#[cfg(feature = "http")]
pub use embedding::EmbeddingClient;
pub use embedding::{check_embeddings, Embedder};
pub use error::{DocQaError, DocQaResult, ErrorKind};
#[cfg(feature = "http")]
pub use generator::ChatCompletionClient;
pub use generator::{build_prompt, AnswerGenerator};
pub use index_store::IndexStore;
pub use indexer::{IndexProgress, IndexStats, Indexer};
pub use retriever::Retriever;
pub use session::{SessionId, SessionManager, SessionPaths};
pub use types::*;
