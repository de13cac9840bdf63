// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the MemoryStore trait.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, info};

use recall_config::model::StorageConfig;
use recall_core::{
    AdapterType, ClearSummary, Entity, HealthStatus, Interaction, InteractionId, MemoryStats,
    MemoryStore, NewInteraction, PluginAdapter, RecallError, UserId,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed memory store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules.
pub struct SqliteMemoryStore {
    db: Database,
}

impl SqliteMemoryStore {
    /// Open the database described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, RecallError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite memory store initialized");
        Ok(Self { db })
    }

    /// Build a store over an already opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteMemoryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        let probe = self
            .db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err);
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn find_recent(
        &self,
        user_id: UserId,
        limit: usize,
        require_embedding: bool,
    ) -> Result<Vec<Interaction>, RecallError> {
        queries::interactions::find_recent(&self.db, user_id, limit, require_embedding).await
    }

    async fn find_by_ids(
        &self,
        user_id: UserId,
        ids: &[InteractionId],
    ) -> Result<Vec<Interaction>, RecallError> {
        queries::interactions::find_by_ids(&self.db, user_id, ids).await
    }

    async fn find_entities(
        &self,
        user_id: UserId,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<Entity>, RecallError> {
        queries::entities::find_by_keys(&self.db, user_id, keys).await
    }

    async fn insert(&self, interaction: NewInteraction) -> Result<InteractionId, RecallError> {
        queries::interactions::insert(&self.db, interaction).await
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<(), RecallError> {
        queries::entities::upsert(&self.db, entity).await
    }

    async fn decay_all(
        &self,
        user_id: UserId,
        rate: f64,
        exclude: Option<InteractionId>,
        floor: Option<f64>,
    ) -> Result<u64, RecallError> {
        queries::interactions::decay_all(&self.db, user_id, rate, exclude, floor).await
    }

    async fn boost_interactions(
        &self,
        user_id: UserId,
        ids: &[InteractionId],
        amount: f64,
    ) -> Result<u64, RecallError> {
        queries::interactions::boost(&self.db, user_id, ids, amount).await
    }

    async fn decay_entities(
        &self,
        user_id: UserId,
        rate: f64,
        floor: Option<f64>,
    ) -> Result<u64, RecallError> {
        queries::entities::decay_all(&self.db, user_id, rate, floor).await
    }

    async fn clear_user(&self, user_id: UserId) -> Result<ClearSummary, RecallError> {
        let (interactions_deleted, entities_deleted) =
            queries::entities::clear_user(&self.db, user_id).await?;
        info!(%user_id, interactions_deleted, entities_deleted, "user memory cleared");
        Ok(ClearSummary {
            interactions_deleted,
            entities_deleted,
        })
    }

    async fn stats(&self, user_id: UserId, top_n: usize) -> Result<MemoryStats, RecallError> {
        let (interactions, embedded_interactions) =
            queries::interactions::counts(&self.db, user_id).await?;
        let entities = queries::entities::count(&self.db, user_id).await?;
        let top_entities = queries::entities::top(&self.db, user_id, top_n).await?;
        Ok(MemoryStats {
            interactions,
            embedded_interactions,
            entities,
            top_entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    fn turn(user: i64, input: &str) -> NewInteraction {
        NewInteraction {
            user_id: UserId(user),
            prompt_hash: String::new(),
            user_input: input.to_string(),
            ai_response: "ok".to_string(),
            model_name: "llama3".to_string(),
            embedding: Some(vec![0.1, 0.2, 0.3]),
            keywords: BTreeSet::new(),
            relevance_score: 1.0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteMemoryStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("persist.db");
        let config = make_config(db_path.to_str().unwrap());

        let id = {
            let store = SqliteMemoryStore::open(&config).await.unwrap();
            let id = store.insert(turn(1, "remember me")).await.unwrap();
            store.shutdown().await.unwrap();
            id
        };

        let store = SqliteMemoryStore::open(&config).await.unwrap();
        let rows = store.find_by_ids(UserId(1), &[id]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_input, "remember me");
        assert_eq!(rows[0].embedding.as_deref(), Some(&[0.1f32, 0.2, 0.3][..]));
    }

    #[tokio::test]
    async fn stats_and_clear_through_adapter() {
        let store = SqliteMemoryStore::new(Database::open_in_memory().await.unwrap());
        let id = store.insert(turn(1, "kenya")).await.unwrap();
        let now = Utc::now();
        store
            .upsert_entity(&Entity {
                user_id: UserId(1),
                entity_key: "kenya".to_string(),
                display_name: "Kenya".to_string(),
                access_count: 1,
                relevance_score: 1.0,
                mentioned_in: vec![id],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let stats = store.stats(UserId(1), 5).await.unwrap();
        assert_eq!(stats.interactions, 1);
        assert_eq!(stats.embedded_interactions, 1);
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.top_entities[0].display_name, "Kenya");

        let summary = store.clear_user(UserId(1)).await.unwrap();
        assert_eq!(
            summary,
            ClearSummary {
                interactions_deleted: 1,
                entities_deleted: 1,
            }
        );
        assert_eq!(store.stats(UserId(1), 5).await.unwrap(), MemoryStats::default());
    }
}
