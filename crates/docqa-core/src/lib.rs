
pub mod search;

use std::sync::Arc;

pub use search::{
    AskRequest, AskResponse, DocQaConfig, DocQaError, DocQaResult, ErrorKind, UploadResponse,
};
use search::{
    build_prompt, device_from_limit, AnswerGenerator, Chunker, ComputeDevice, Embedder, Indexer,
    Retriever, SessionManager,
};

/// Upload and Ask, the two operations exposed to the transport layer.
///
/// Every call is an independent unit of work: uploads write a new session,
/// asks read one back from disk. Concurrent calls on the same session are not
/// coordinated.
pub struct DocumentQa {
    indexer: Indexer,
    retriever: Retriever,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl DocumentQa {
    pub fn new(
        config: &DocQaConfig,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn AnswerGenerator>>,
    ) -> DocQaResult<Self> {
        let device = device_from_limit(config.device.memory_limit_bytes);
        Self::with_device(config, embedder, generator, device)
    }

    pub fn with_device(
        config: &DocQaConfig,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn AnswerGenerator>>,
        device: Arc<dyn ComputeDevice>,
    ) -> DocQaResult<Self> {
        config.validate()?;

        let sessions = SessionManager::new(config.paths.get_data_dir());
        let indexer = Indexer::new(
            Chunker::new(config.retrieval.chunk_size),
            embedder.clone(),
            sessions.clone(),
            device.clone(),
        );
        let retriever = Retriever::new(embedder, sessions, device, config.retrieval.top_k);

        Ok(Self {
            indexer,
            retriever,
            generator,
        })
    }

    /// Build the HTTP collaborators from configuration.
    /// Without a generation key, asks return the context only.
    #[cfg(feature = "http")]
    pub fn from_config(config: &DocQaConfig) -> DocQaResult<Self> {
        let embedder = Arc::new(search::EmbeddingClient::new(config.embedding.clone())?);

        let generator: Option<Arc<dyn AnswerGenerator>> =
            match search::ChatCompletionClient::new(config.generation.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(DocQaError::ApiKeyMissing) => {
                    log::warn!("No generation API key configured; answers are disabled");
                    None
                }
                Err(e) => return Err(e),
            };

        Self::new(config, embedder, generator)
    }

    /// Store an extracted document under a new session
    pub async fn upload(&self, text: &str) -> DocQaResult<UploadResponse> {
        let stats = self.indexer.index_document(text).await?;

        Ok(UploadResponse {
            message: "Document uploaded".to_string(),
            chunks: stats.chunk_count,
            session_id: stats.session_id,
        })
    }

    /// Answer a question against a stored session.
    /// An unknown session is a soft error payload, not a failure.
    pub async fn ask(&self, request: AskRequest) -> DocQaResult<AskResponse> {
        let context = match self
            .retriever
            .answer_context(&request.session_id, &request.question, request.top_k)
            .await
        {
            Ok(context) => context,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("Ask for unknown session {}", request.session_id);
                return Ok(AskResponse::session_not_found());
            }
            Err(e) => return Err(e),
        };

        let answer = match self.generator {
            Some(ref generator) => Some(
                generator
                    .generate(&build_prompt(&context, &request.question))
                    .await?,
            ),
            None => None,
        };

        Ok(AskResponse::answered(
            uuid::Uuid::new_v4().to_string(),
            context,
            answer,
        ))
    }
}
