// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interaction CRUD, decay and reinforcement.

use std::collections::BTreeSet;

use recall_core::{
    blob_to_vec, vec_to_blob, Interaction, InteractionId, NewInteraction, RecallError, UserId,
};
use rusqlite::{params, params_from_iter, Row};
use tracing::warn;

use crate::database::{format_timestamp, map_tr_err, parse_timestamp, Database};

const COLUMNS: &str = "id, user_id, prompt_hash, user_input, ai_response, model_name, \
                       embedding, keywords, relevance_score, created_at";

fn row_to_interaction(row: &Row<'_>) -> Result<Interaction, rusqlite::Error> {
    let id = InteractionId(row.get(0)?);

    let embedding = row
        .get::<_, Option<Vec<u8>>>(6)?
        .and_then(|blob| match blob_to_vec(&blob) {
            Some(v) if !v.is_empty() => Some(v),
            Some(_) => None,
            None => {
                warn!(interaction_id = %id, bytes = blob.len(), "discarding malformed embedding blob");
                None
            }
        });

    let raw_keywords: String = row.get(7)?;
    let keywords = serde_json::from_str::<BTreeSet<String>>(&raw_keywords).unwrap_or_else(|e| {
        warn!(interaction_id = %id, error = %e, "discarding malformed keyword list");
        BTreeSet::new()
    });

    let created_at: String = row.get(9)?;

    Ok(Interaction {
        id,
        user_id: UserId(row.get(1)?),
        prompt_hash: row.get(2)?,
        user_input: row.get(3)?,
        ai_response: row.get(4)?,
        model_name: row.get(5)?,
        embedding,
        keywords,
        relevance_score: row.get(8)?,
        created_at: parse_timestamp(9, &created_at)?,
    })
}

/// Insert a new interaction and return its id.
pub async fn insert(db: &Database, interaction: NewInteraction) -> Result<InteractionId, RecallError> {
    let embedding = interaction.embedding.as_deref().map(vec_to_blob);
    let keywords = serde_json::to_string(&interaction.keywords)
        .map_err(|e| RecallError::Internal(format!("keyword encoding failed: {e}")))?;
    let created_at = format_timestamp(&interaction.created_at);

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO interactions (user_id, prompt_hash, user_input, ai_response, model_name, embedding, keywords, relevance_score, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    interaction.user_id.0,
                    interaction.prompt_hash,
                    interaction.user_input,
                    interaction.ai_response,
                    interaction.model_name,
                    embedding,
                    keywords,
                    interaction.relevance_score,
                    created_at,
                ],
            )?;
            Ok(InteractionId(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent interactions of a user, newest first.
pub async fn find_recent(
    db: &Database,
    user_id: UserId,
    limit: usize,
    require_embedding: bool,
) -> Result<Vec<Interaction>, RecallError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let filter = if require_embedding {
        "AND embedding IS NOT NULL AND length(embedding) > 0"
    } else {
        ""
    };
    let sql = format!(
        "SELECT {COLUMNS} FROM interactions
         WHERE user_id = ?1 {filter}
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    );

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id.0, limit], row_to_interaction)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Load the given interactions of a user. Unknown and foreign ids are skipped.
pub async fn find_by_ids(
    db: &Database,
    user_id: UserId,
    ids: &[InteractionId],
) -> Result<Vec<Interaction>, RecallError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {COLUMNS} FROM interactions WHERE user_id = ? AND id IN ({placeholders})"
    );
    let mut values: Vec<i64> = Vec::with_capacity(ids.len() + 1);
    values.push(user_id.0);
    values.extend(ids.iter().map(|id| id.0));

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), row_to_interaction)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Subtract `rate` from the scores of a user's interactions.
pub async fn decay_all(
    db: &Database,
    user_id: UserId,
    rate: f64,
    exclude: Option<InteractionId>,
    floor: Option<f64>,
) -> Result<u64, RecallError> {
    let exclude = exclude.map(|id| id.0);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE interactions
                 SET relevance_score = CASE
                     WHEN ?3 IS NULL THEN relevance_score - ?2
                     ELSE MAX(relevance_score - ?2, MIN(relevance_score, ?3))
                 END
                 WHERE user_id = ?1 AND (?4 IS NULL OR id != ?4)",
                params![user_id.0, rate, floor, exclude],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Add `amount` to the scores of the listed interactions of a user.
pub async fn boost(
    db: &Database,
    user_id: UserId,
    ids: &[InteractionId],
    amount: f64,
) -> Result<u64, RecallError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut changed = 0u64;
            {
                let mut stmt = tx.prepare(
                    "UPDATE interactions SET relevance_score = relevance_score + ?1
                     WHERE user_id = ?2 AND id = ?3",
                )?;
                for id in ids {
                    changed += stmt.execute(params![amount, user_id.0, id])? as u64;
                }
            }
            tx.commit()?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Count a user's interactions and how many of them carry an embedding.
pub async fn counts(db: &Database, user_id: UserId) -> Result<(u64, u64), RecallError> {
    db.connection()
        .call(move |conn| {
            let (total, embedded): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COUNT(embedding) FROM interactions WHERE user_id = ?1",
                params![user_id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((total.max(0) as u64, embedded.max(0) as u64))
        })
        .await
        .map_err(map_tr_err)
}
