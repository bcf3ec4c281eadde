//! Document indexer: chunk, embed, build and persist one session

use std::sync::Arc;

use super::chunker::Chunker;
use super::device::ComputeDevice;
use super::embedding::{check_embeddings, Embedder};
use super::error::{DocQaError, DocQaResult};
use super::index_store::IndexStore;
use super::session::{SessionId, SessionManager};

/// Upload statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    /// Session holding the new index
    pub session_id: String,
    /// Total passages stored
    pub chunk_count: usize,
    /// Embedding dimensions of the stored vectors
    pub dimension: usize,
    /// Time elapsed in milliseconds
    pub elapsed_ms: u64,
}

/// Index build progress
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexProgress {
    /// Current phase: "chunking", "embedding", "storing", "done"
    pub phase: &'static str,
    /// Percentage complete (0-100)
    pub percent: u8,
    /// Optional message
    pub message: Option<String>,
}

/// Builds a fresh session for every uploaded document
pub struct Indexer {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    sessions: SessionManager,
    device: Arc<dyn ComputeDevice>,
}

impl Indexer {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        sessions: SessionManager,
        device: Arc<dyn ComputeDevice>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            sessions,
            device,
        }
    }

    /// Index a document under a new session
    pub async fn index_document(&self, text: &str) -> DocQaResult<IndexStats> {
        self.index_document_with_progress(text, |_| {}).await
    }

    /// Index a document with progress callback
    pub async fn index_document_with_progress<F>(
        &self,
        text: &str,
        mut on_progress: F,
    ) -> DocQaResult<IndexStats>
    where
        F: FnMut(IndexProgress),
    {
        let start = std::time::Instant::now();

        // Phase 1: Chunking
        on_progress(IndexProgress {
            phase: "chunking",
            percent: 0,
            message: None,
        });
        let passages = self.chunker.chunk(text);
        if passages.is_empty() {
            return Err(DocQaError::EmptyDocument);
        }

        // Phase 2: Embedding
        on_progress(IndexProgress {
            phase: "embedding",
            percent: 33,
            message: Some(format!("Embedding {} passages", passages.len())),
        });
        let vectors = self.embedder.embed(passages.clone()).await?;
        check_embeddings(passages.len(), &vectors)?;

        // Phase 3: Storing
        on_progress(IndexProgress {
            phase: "storing",
            percent: 66,
            message: None,
        });
        let store = IndexStore::build_on(self.device.as_ref(), vectors, passages)?;
        let session_id = self.sessions.new_session();
        store.persist(&self.sessions.locate(&session_id)).await?;

        let stats = self.stats(session_id, &store, start);
        on_progress(IndexProgress {
            phase: "done",
            percent: 100,
            message: Some(format!("Stored {} passages", stats.chunk_count)),
        });

        log::info!(
            "Indexed session {} with {} passages ({}D) in {}ms on {}",
            stats.session_id,
            stats.chunk_count,
            stats.dimension,
            stats.elapsed_ms,
            self.device.name()
        );
        Ok(stats)
    }

    fn stats(
        &self,
        session_id: SessionId,
        store: &IndexStore,
        start: std::time::Instant,
    ) -> IndexStats {
        IndexStats {
            session_id: session_id.to_string(),
            chunk_count: store.len(),
            dimension: store.dimension(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }
}
