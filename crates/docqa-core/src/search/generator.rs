//! Answer generation collaborator

use async_trait::async_trait;

use super::error::DocQaResult;

/// Produces an answer from a fully assembled prompt
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> DocQaResult<String>;
}

/// Instruction prompt carrying the retrieved context and the question
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an assistant that answers questions based on a PDF document.\n\
         Document content: {}\n\
         Question: {}",
        context, question
    )
}

#[cfg(feature = "http")]
pub use client::ChatCompletionClient;

#[cfg(feature = "http")]
mod client {
    use async_trait::async_trait;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};

    use super::AnswerGenerator;
    use crate::search::config::GenerationConfig;
    use crate::search::error::{DocQaError, DocQaResult};

    /// OpenAI-compatible chat completion client (non-streaming)
    pub struct ChatCompletionClient {
        config: GenerationConfig,
        client: Client,
    }

    #[derive(Debug, Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        max_tokens: u32,
        stream: bool,
    }

    #[derive(Debug, Serialize)]
    struct ChatMessage<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        choices: Vec<Choice>,
    }

    #[derive(Debug, Deserialize)]
    struct Choice {
        message: ResponseMessage,
    }

    #[derive(Debug, Deserialize)]
    struct ResponseMessage {
        #[serde(default)]
        content: Option<String>,
    }

    impl ChatCompletionClient {
        pub fn new(config: GenerationConfig) -> DocQaResult<Self> {
            config.get_api_key()?;

            let client = Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?;

            Ok(Self { config, client })
        }
    }

    #[async_trait]
    impl AnswerGenerator for ChatCompletionClient {
        async fn generate(&self, prompt: &str) -> DocQaResult<String> {
            let api_key = self.config.get_api_key()?;
            let url = format!(
                "{}/chat/completions",
                self.config.api_base.trim_end_matches('/')
            );

            let request = ChatRequest {
                model: &self.config.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: self.config.max_tokens,
                stream: false,
            };

            let response = self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(DocQaError::Generation(format!(
                    "API error ({}): {}",
                    status, body
                )));
            }

            let response: ChatResponse = serde_json::from_str(&body)
                .map_err(|e| DocQaError::Generation(format!("Malformed response: {}", e)))?;

            response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| DocQaError::Generation("No completion returned".to_string()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_request_shape() {
            let request = ChatRequest {
                model: "gpt-4o-mini",
                messages: vec![ChatMessage {
                    role: "user",
                    content: "hi",
                }],
                max_tokens: 16,
                stream: false,
            };
            let json = serde_json::to_value(&request).unwrap();
            assert_eq!(json["messages"][0]["role"], "user");
            assert_eq!(json["stream"], false);
        }

        #[test]
        fn test_response_parsing() {
            let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"42"}}]}"#;
            let response: ChatResponse = serde_json::from_str(body).unwrap();
            assert_eq!(response.choices[0].message.content.as_deref(), Some("42"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_prompt("first passage\nsecond passage", "What is in it?");
        assert!(prompt.contains("first passage\nsecond passage"));
        assert!(prompt.ends_with("Question: What is in it?"));
    }
}
