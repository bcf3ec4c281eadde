//! Unit tests for search module

#[cfg(test)]
mod tests {
    use super::super::*;

    mod chunker_tests {
        use super::*;

        #[test]
        fn test_chunker_basic() {
            let chunker = Chunker::new(500);
            let content = "# Title\n\nThis is a paragraph.\n\n## Section\n\nMore content here.";
            let chunks = chunker.chunk(content);

            assert_eq!(chunks.len(), 1, "Short content fits one passage");
            assert_eq!(chunks[0], content);
        }

        #[test]
        fn test_chunker_respects_size_limit() {
            let max_size = 500;
            let chunker = Chunker::new(max_size);
            let paragraph = "This is a test paragraph with some content. ";
            let content = paragraph.repeat(50);
            let chunks = chunker.chunk(&content);

            assert!(chunks.len() > 1, "Long content should be split into multiple chunks");
            assert!(chunks.iter().all(|c| c.chars().count() <= max_size));
        }

        #[test]
        fn test_chunker_handles_empty_content() {
            let chunker = Chunker::new(500);
            assert!(chunker.chunk("").is_empty());
        }

        #[test]
        fn test_chunker_whitespace_is_content() {
            // Extracted PDF text is kept verbatim, whitespace included
            let chunks = Chunker::new(2).chunk("   ");
            assert_eq!(chunks, vec!["  ", " "]);
        }
    }

    mod index_tests {
        use super::*;

        #[test]
        fn test_three_vectors_two_passages() {
            let err = IndexStore::build(
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
                vec!["a".to_string(), "b".to_string()],
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        }

        #[test]
        fn test_k_larger_than_corpus() {
            let store = IndexStore::build(
                vec![vec![0.1], vec![0.5], vec![0.9]],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap();
            let hits = store.search(&[0.0], 10).unwrap();
            assert_eq!(hits.len(), 3);
            let order: Vec<usize> = hits.iter().map(|h| h.passage_index).collect();
            assert_eq!(order, vec![0, 1, 2]);
        }
    }

    mod types_tests {
        use super::*;

        #[test]
        fn test_ask_response_not_found() {
            let response = AskResponse::session_not_found();
            assert!(response.is_error());
            assert_eq!(response.error.as_deref(), Some("session not found"));
            assert!(response.context.is_none());
        }

        #[test]
        fn test_neighbor_serializes_snake_case() {
            let json = serde_json::to_value(Neighbor {
                passage_index: 2,
                distance: 0.5,
            })
            .unwrap();
            assert_eq!(json["passage_index"], 2);
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_config_default() {
            let config = DocQaConfig::default();
            assert!(config.embedding.dimensions > 0);
            assert!(config.retrieval.chunk_size > 0);
            assert!(config.retrieval.top_k > 0);
        }

        #[test]
        fn test_embedding_config_default() {
            let config = EmbeddingConfig::default();
            assert!(!config.model.is_empty());
            assert!(config.batch_size > 0);
        }

        #[test]
        fn test_generation_config_default() {
            let config = GenerationConfig::default();
            assert!(!config.model.is_empty());
            assert!(config.max_tokens > 0);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_error_display() {
            let err = DocQaError::InvariantViolation("test error".to_string());
            let display = format!("{}", err);
            assert!(display.contains("test error"));
        }

        #[test]
        fn test_error_from_io() {
            let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
            let err = DocQaError::from(io_err);
            assert!(format!("{}", err).contains("read only"));
            assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        }

        #[test]
        fn test_session_id_not_found_kind() {
            let err = SessionId::parse("nonexistent-id").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
