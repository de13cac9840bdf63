// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity lookups and upserts.
//!
//! `mentioned_in` is stored as a JSON integer array and validated here. A
//! row that fails to decode is kept but treated as linking to nothing.

use std::collections::{BTreeSet, HashSet};

use recall_core::{Entity, InteractionId, RecallError, UserId};
use rusqlite::{params, params_from_iter, Row};
use tracing::warn;

use crate::database::{format_timestamp, map_tr_err, parse_timestamp, Database};

const COLUMNS: &str = "user_id, entity_key, display_name, access_count, relevance_score, \
                       mentioned_in, created_at, updated_at";

/// Decode a stored `mentioned_in` column.
///
/// Duplicates are dropped, first occurrence wins.
pub fn decode_mentions(entity_key: &str, raw: &str) -> Result<Vec<InteractionId>, RecallError> {
    let ids: Vec<i64> =
        serde_json::from_str(raw).map_err(|e| RecallError::MalformedEntityState {
            entity_key: entity_key.to_string(),
            detail: e.to_string(),
        })?;
    let mut seen = HashSet::with_capacity(ids.len());
    Ok(ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .map(InteractionId)
        .collect())
}

/// Encode `mentioned_in` for storage.
pub fn encode_mentions(ids: &[InteractionId]) -> String {
    let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
    serde_json::to_string(&raw).unwrap_or_else(|_| "[]".to_string())
}

/// An entity row whose `mentioned_in` column has not been decoded yet.
///
/// Rows leave the database thread in this form so the decode warning is
/// emitted in the caller's span.
struct RawEntity {
    entity: Entity,
    mentions: String,
}

impl RawEntity {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let access_count: i64 = row.get(3)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(Self {
            entity: Entity {
                user_id: UserId(row.get(0)?),
                entity_key: row.get(1)?,
                display_name: row.get(2)?,
                access_count: access_count.max(0) as u64,
                relevance_score: row.get(4)?,
                mentioned_in: Vec::new(),
                created_at: parse_timestamp(6, &created_at)?,
                updated_at: parse_timestamp(7, &updated_at)?,
            },
            mentions: row.get(5)?,
        })
    }

    fn decode(self) -> Entity {
        let mut entity = self.entity;
        match decode_mentions(&entity.entity_key, &self.mentions) {
            Ok(ids) => entity.mentioned_in = ids,
            Err(e) => {
                warn!(
                    user_id = %entity.user_id,
                    entity_key = %entity.entity_key,
                    error = %e,
                    "treating entity as unlinked"
                );
            }
        }
        entity
    }
}

fn decode_all(rows: Vec<RawEntity>) -> Vec<Entity> {
    rows.into_iter().map(RawEntity::decode).collect()
}

/// Entities of a user whose key is in `keys`, ordered by key.
pub async fn find_by_keys(
    db: &Database,
    user_id: UserId,
    keys: &BTreeSet<String>,
) -> Result<Vec<Entity>, RecallError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!(
        "SELECT {COLUMNS} FROM entities
         WHERE user_id = ? AND entity_key IN ({placeholders})
         ORDER BY entity_key"
    );
    let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(keys.len() + 1);
    values.push(user_id.0.into());
    values.extend(keys.iter().map(|k| k.clone().into()));

    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), RawEntity::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows))
}

/// Insert the entity, or overwrite the row with the same `(user_id, entity_key)`.
///
/// `created_at` of an existing row is preserved.
pub async fn upsert(db: &Database, entity: &Entity) -> Result<(), RecallError> {
    let user_id = entity.user_id.0;
    let key = entity.entity_key.clone();
    let display = entity.display_name.clone();
    let access_count = i64::try_from(entity.access_count).unwrap_or(i64::MAX);
    let score = entity.relevance_score;
    let mentions = encode_mentions(&entity.mentioned_in);
    let created_at = format_timestamp(&entity.created_at);
    let updated_at = format_timestamp(&entity.updated_at);

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO entities (user_id, entity_key, display_name, access_count, relevance_score, mentioned_in, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(user_id, entity_key) DO UPDATE SET
                     display_name = excluded.display_name,
                     access_count = excluded.access_count,
                     relevance_score = excluded.relevance_score,
                     mentioned_in = excluded.mentioned_in,
                     updated_at = excluded.updated_at",
                params![user_id, key, display, access_count, score, mentions, created_at, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Subtract `rate` from every entity score of a user.
pub async fn decay_all(
    db: &Database,
    user_id: UserId,
    rate: f64,
    floor: Option<f64>,
) -> Result<u64, RecallError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entities
                 SET relevance_score = CASE
                     WHEN ?3 IS NULL THEN relevance_score - ?2
                     ELSE MAX(relevance_score - ?2, MIN(relevance_score, ?3))
                 END
                 WHERE user_id = ?1",
                params![user_id.0, rate, floor],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` highest-scored entities of a user.
pub async fn top(db: &Database, user_id: UserId, limit: usize) -> Result<Vec<Entity>, RecallError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let sql = format!(
        "SELECT {COLUMNS} FROM entities WHERE user_id = ?1
         ORDER BY relevance_score DESC, access_count DESC, entity_key ASC
         LIMIT ?2"
    );
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id.0, limit], RawEntity::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows))
}

/// Number of entities a user has.
pub async fn count(db: &Database, user_id: UserId) -> Result<u64, RecallError> {
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entities WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )?;
            Ok(n.max(0) as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete all interactions and entities of a user in one transaction.
pub async fn clear_user(db: &Database, user_id: UserId) -> Result<(u64, u64), RecallError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let entities = tx.execute("DELETE FROM entities WHERE user_id = ?1", params![user_id.0])?;
            let interactions =
                tx.execute("DELETE FROM interactions WHERE user_id = ?1", params![user_id.0])?;
            tx.commit()?;
            Ok((interactions as u64, entities as u64))
        })
        .await
        .map_err(map_tr_err)
}
