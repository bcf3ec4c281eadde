//! Common types for the retrieval store

use serde::{Deserialize, Serialize};

/// One nearest-neighbor hit: a passage position and its squared L2 distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Zero-based index of the passage in document order
    pub passage_index: usize,
    /// Squared Euclidean distance to the query vector
    pub distance: f32,
}

/// A ranked passage with its text, as handed to context assembly
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub passage_index: usize,
    pub distance: f32,
    pub content: String,
}

/// Upload response
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    /// Human readable status line
    pub message: String,
    /// Number of passages stored for the session
    pub chunks: usize,
    /// Identifier to use for subsequent questions
    pub session_id: String,
}

/// Ask request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    pub session_id: String,
    pub question: String,
    /// Number of passages to retrieve; configured top_k when absent
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Ask response
/// Either carries the retrieved context (and the answer, when a generator is
/// configured) or a soft error for an unknown session.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AskResponse {
    pub fn answered(request_id: String, context: String, answer: Option<String>) -> Self {
        Self {
            request_id: Some(request_id),
            context: Some(context),
            answer,
            error: None,
        }
    }

    pub fn session_not_found() -> Self {
        Self {
            request_id: None,
            context: None,
            answer: None,
            error: Some("session not found".to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
