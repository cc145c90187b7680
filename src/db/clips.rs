//! Clip artifact persistence
//!
//! [`ArtifactStore`] is the blob-storage contract the pipeline persists
//! through; [`SqliteClipStore`] is the production implementation. Binary
//! payloads live in the `clips` table, keyed by opaque id and owner.

use crate::error::{OpError, OpResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// A stored clip: payload plus ownership metadata
#[derive(Debug, Clone)]
pub struct ClipRecord {
    pub id: Uuid,
    pub owner: Uuid,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl ClipRecord {
    /// New record with a fresh id, timestamped now
    pub fn new(owner: Uuid, filename: String, content_type: String, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            filename,
            content_type,
            data,
            created_at: Utc::now(),
        }
    }
}

/// Listing entry: metadata only, no payload
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClipSummary {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Blob storage contract consumed by the pipeline
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn get(&self, id: Uuid) -> OpResult<Option<ClipRecord>>;
    async fn put(&self, clip: ClipRecord) -> OpResult<Uuid>;
    /// Swap the payload in place, keeping id and ownership
    async fn replace(&self, id: Uuid, data: Vec<u8>) -> OpResult<()>;
    async fn rename(&self, id: Uuid, filename: &str) -> OpResult<()>;
    async fn delete(&self, id: Uuid) -> OpResult<()>;
    async fn list(&self, owner: Uuid) -> OpResult<Vec<ClipSummary>>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteClipStore {
    pool: SqlitePool,
}

impl SqliteClipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactStore for SqliteClipStore {
    async fn get(&self, id: Uuid) -> OpResult<Option<ClipRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner, filename, content_type, data, created_at
            FROM clips
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let id_str: String = row.get("id");
                let owner_str: String = row.get("owner");
                let created_str: String = row.get("created_at");
                Ok(Some(ClipRecord {
                    id: Uuid::parse_str(&id_str)
                        .map_err(|e| OpError::Internal(anyhow::anyhow!("bad clip id: {}", e)))?,
                    owner: Uuid::parse_str(&owner_str)
                        .map_err(|e| OpError::Internal(anyhow::anyhow!("bad owner id: {}", e)))?,
                    filename: row.get("filename"),
                    content_type: row.get("content_type"),
                    data: row.get("data"),
                    created_at: DateTime::parse_from_rfc3339(&created_str)
                        .map_err(|e| OpError::Internal(anyhow::anyhow!("bad timestamp: {}", e)))?
                        .with_timezone(&Utc),
                }))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, clip: ClipRecord) -> OpResult<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO clips (id, owner, filename, content_type, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(clip.id.to_string())
        .bind(clip.owner.to_string())
        .bind(&clip.filename)
        .bind(&clip.content_type)
        .bind(&clip.data)
        .bind(clip.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(clip.id)
    }

    async fn replace(&self, id: Uuid, data: Vec<u8>) -> OpResult<()> {
        let result = sqlx::query("UPDATE clips SET data = ? WHERE id = ?")
            .bind(&data)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OpError::NotFound(id));
        }
        Ok(())
    }

    async fn rename(&self, id: Uuid, filename: &str) -> OpResult<()> {
        let result = sqlx::query("UPDATE clips SET filename = ? WHERE id = ?")
            .bind(filename)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OpError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> OpResult<()> {
        let result = sqlx::query("DELETE FROM clips WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OpError::NotFound(id));
        }
        Ok(())
    }

    async fn list(&self, owner: Uuid) -> OpResult<Vec<ClipSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, filename, created_at
            FROM clips
            WHERE owner = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let id_str: String = row.get("id");
            let created_str: String = row.get("created_at");
            summaries.push(ClipSummary {
                id: Uuid::parse_str(&id_str)
                    .map_err(|e| OpError::Internal(anyhow::anyhow!("bad clip id: {}", e)))?,
                filename: row.get("filename"),
                created_at: DateTime::parse_from_rfc3339(&created_str)
                    .map_err(|e| OpError::Internal(anyhow::anyhow!("bad timestamp: {}", e)))?
                    .with_timezone(&Utc),
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteClipStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        SqliteClipStore::new(pool)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = test_store().await;
        let owner = Uuid::new_v4();
        let clip = ClipRecord::new(owner, "a.mp3".into(), "audio/mpeg".into(), vec![1, 2, 3]);
        let id = clip.id;

        store.put(clip).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.owner, owner);
        assert_eq!(loaded.data, vec![1, 2, 3]);
        assert_eq!(loaded.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn replace_keeps_id_and_owner() {
        let store = test_store().await;
        let clip = ClipRecord::new(Uuid::new_v4(), "a.mp3".into(), "audio/mpeg".into(), vec![1]);
        let id = clip.id;
        let owner = clip.owner;
        store.put(clip).await.unwrap();

        store.replace(id, vec![9, 9]).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.data, vec![9, 9]);
        assert_eq!(loaded.owner, owner);
    }

    #[tokio::test]
    async fn replace_missing_clip_is_not_found() {
        let store = test_store().await;
        let err = store.replace(Uuid::new_v4(), vec![1]).await.unwrap_err();
        assert!(matches!(err, OpError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let store = test_store().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store
            .put(ClipRecord::new(alice, "a.mp3".into(), "audio/mpeg".into(), vec![1]))
            .await
            .unwrap();
        store
            .put(ClipRecord::new(bob, "b.mp3".into(), "audio/mpeg".into(), vec![2]))
            .await
            .unwrap();

        let clips = store.list(alice).await.unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].filename, "a.mp3");
    }

    #[tokio::test]
    async fn delete_removes_clip() {
        let store = test_store().await;
        let clip = ClipRecord::new(Uuid::new_v4(), "a.mp3".into(), "audio/mpeg".into(), vec![1]);
        let id = clip.id;
        store.put(clip).await.unwrap();

        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }
}
