// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recall conversational memory engine.
//!
//! This crate provides the error taxonomy, the domain types, the adapter
//! traits implemented by storage and embedding backends, and the vector
//! math shared by every other crate in the workspace.

pub mod error;
pub mod traits;
pub mod types;
pub mod vector;

pub use error::RecallError;
pub use types::{
    AdapterType, ClearSummary, Entity, HealthStatus, Interaction, InteractionId, MemoryStats,
    NewInteraction, UserId,
};
pub use vector::{blob_to_vec, cosine_similarity, vec_to_blob};

pub use traits::{EmbeddingAdapter, MemoryStore, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degradable_variants_are_classified() {
        assert!(RecallError::embedding("connection refused").is_degradable());
        assert!(
            RecallError::Timeout {
                duration: std::time::Duration::from_secs(5),
            }
            .is_degradable()
        );
        assert!(
            RecallError::MalformedEntityState {
                entity_key: "kenya".into(),
                detail: "not a JSON array".into(),
            }
            .is_degradable()
        );

        assert!(!RecallError::store(std::io::Error::other("disk full")).is_degradable());
        assert!(!RecallError::Config("bad".into()).is_degradable());
        assert!(!RecallError::Internal("bug".into()).is_degradable());
    }

    #[test]
    fn error_messages_name_the_failure() {
        let err = RecallError::store(std::io::Error::other("database is locked"));
        assert_eq!(err.to_string(), "store unavailable: database is locked");

        let err = RecallError::MalformedEntityState {
            entity_key: "nairobi".into(),
            detail: "expected integer".into(),
        };
        assert!(err.to_string().contains("`nairobi`"));
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [AdapterType::Storage, AdapterType::Embedding] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }

        let json = serde_json::to_string(&AdapterType::Embedding).expect("should serialize");
        assert_eq!(json, "\"Embedding\"");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&InteractionId(42)).expect("should serialize");
        assert_eq!(json, "42");
        let user: UserId = serde_json::from_str("7").expect("should deserialize");
        assert_eq!(user, UserId(7));
        assert_eq!(user.to_string(), "7");
    }

    #[test]
    fn interaction_reports_embedding_presence() {
        let mut interaction = Interaction {
            id: InteractionId(1),
            user_id: UserId(1),
            prompt_hash: String::new(),
            user_input: "hi".into(),
            ai_response: "hello".into(),
            model_name: "llama3".into(),
            embedding: None,
            keywords: Default::default(),
            relevance_score: 1.0,
            created_at: chrono::Utc::now(),
        };
        assert!(!interaction.has_embedding());
        interaction.embedding = Some(vec![]);
        assert!(!interaction.has_embedding());
        interaction.embedding = Some(vec![0.1, 0.2]);
        assert!(interaction.has_embedding());
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_memory_store<T: MemoryStore>() {}
    }
}
