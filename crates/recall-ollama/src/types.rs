// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Ollama embedding endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/embed`.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

/// Response of `POST /api/embed`.
///
/// Current servers answer with `embeddings` (one vector per input); older
/// ones with a single `embedding`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl EmbedResponse {
    /// The first usable vector in the response, if any.
    pub fn into_vector(self) -> Option<Vec<f32>> {
        self.embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .or_else(|| self.embedding.filter(|v| !v.is_empty()))
    }
}

/// Error body returned by Ollama on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_embeddings_array() {
        let resp: EmbedResponse =
            serde_json::from_str(r#"{"embeddings": [[0.1, 0.2]], "embedding": [9.0]}"#).unwrap();
        assert_eq!(resp.into_vector(), Some(vec![0.1, 0.2]));
    }

    #[test]
    fn falls_back_to_legacy_field() {
        let resp: EmbedResponse = serde_json::from_str(r#"{"embedding": [0.5, 0.5]}"#).unwrap();
        assert_eq!(resp.into_vector(), Some(vec![0.5, 0.5]));
    }

    #[test]
    fn empty_vectors_are_absent() {
        let resp: EmbedResponse =
            serde_json::from_str(r#"{"embeddings": [[]], "embedding": []}"#).unwrap();
        assert_eq!(resp.into_vector(), None);
        let resp: EmbedResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.into_vector(), None);
    }

    #[test]
    fn request_serializes_model_and_input() {
        let body = serde_json::to_value(EmbedRequest {
            model: "nomic-embed-text",
            input: "User: hi | AI: hello",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "nomic-embed-text", "input": "User: hi | AI: hello"})
        );
    }
}
