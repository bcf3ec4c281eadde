//! Query-time retrieval against one session

use std::sync::Arc;

use super::device::ComputeDevice;
use super::embedding::Embedder;
use super::error::{DocQaError, DocQaResult};
use super::index_store::IndexStore;
use super::session::{SessionId, SessionManager};
use super::types::RetrievedPassage;

/// Separator between passages in the assembled context
const CONTEXT_SEPARATOR: &str = "\n";

/// Loads a session, embeds the question and ranks its passages.
/// Nothing is cached between calls; every query reads the session from disk.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    sessions: SessionManager,
    device: Arc<dyn ComputeDevice>,
    default_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        sessions: SessionManager,
        device: Arc<dyn ComputeDevice>,
        default_k: usize,
    ) -> Self {
        Self {
            embedder,
            sessions,
            device,
            default_k,
        }
    }

    /// The `k` closest passages of a session, nearest first
    pub async fn retrieve(
        &self,
        session_id: &str,
        question: &str,
        k: usize,
    ) -> DocQaResult<Vec<RetrievedPassage>> {
        let id = SessionId::parse(session_id)?;
        let store = IndexStore::load(&self.sessions.locate(&id)).await?;

        let query = self.embedder.embed_one(question).await?;
        let hits = store.search_on(self.device.as_ref(), &query, k)?;

        log::debug!(
            "Session {}: {} of {} passages retrieved",
            id,
            hits.len(),
            store.len()
        );

        hits.into_iter()
            .map(|hit| {
                let content = store.passage(hit.passage_index).ok_or_else(|| {
                    DocQaError::InvariantViolation(format!(
                        "hit {} outside {} passages",
                        hit.passage_index,
                        store.len()
                    ))
                })?;
                Ok(RetrievedPassage {
                    passage_index: hit.passage_index,
                    distance: hit.distance,
                    content: content.to_string(),
                })
            })
            .collect()
    }

    /// Context string for the answer generator: ranked passages joined by newlines
    pub async fn answer_context(
        &self,
        session_id: &str,
        question: &str,
        k: Option<usize>,
    ) -> DocQaResult<String> {
        let passages = self
            .retrieve(session_id, question, k.unwrap_or(self.default_k))
            .await?;

        Ok(passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR))
    }
}
