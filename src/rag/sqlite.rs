//! SQLite-backed vector index.
//!
//! In-process store using SQLite for entries and index metadata, and
//! brute-force scoring under the index metric for search.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use super::similarity::{sort_descending, Metric};
use super::store::{check_batch_dimension, ChunkMetadata, IndexEntry, IndexLocation, SearchHit, VectorIndex};
use crate::core::errors::StoreError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    location: IndexLocation,
    metric: Metric,
    write_lock: Mutex<()>,
}

impl SqliteVectorIndex {
    /// Opens the index at `db_path`, creating it with `metric` if it does not exist.
    ///
    /// An existing index keeps its metric; asking for a different one fails
    /// with `StoreError::MetricMismatch`.
    pub async fn create_or_open(db_path: PathBuf, metric: Metric) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::unavailable)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(StoreError::unavailable)?;

        let index = Self {
            pool,
            location: IndexLocation::Persistent(db_path),
            metric,
            write_lock: Mutex::new(()),
        };

        if let Err(err) = index.init_schema().await {
            index.pool.close().await;
            return Err(err);
        }
        if let Err(err) = index.ensure_metric().await {
            index.pool.close().await;
            return Err(err);
        }

        Ok(index)
    }

    /// Deletes the database file and its WAL side files, if present.
    pub async fn remove_files(db_path: &Path) -> std::io::Result<()> {
        let mut candidates = vec![db_path.to_path_buf()];
        for suffix in ["-wal", "-shm"] {
            let mut side = db_path.as_os_str().to_owned();
            side.push(suffix);
            candidates.push(PathBuf::from(side));
        }

        for path in candidates {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_entries (
                chunk_id TEXT PRIMARY KEY,
                document_text TEXT NOT NULL,
                source_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_source ON index_entries(source_id)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        Ok(())
    }

    async fn ensure_metric(&self) -> Result<(), StoreError> {
        // INSERT OR IGNORE keeps the metric of an index created earlier.
        sqlx::query("INSERT OR IGNORE INTO index_meta (key, value) VALUES ('metric', ?1)")
            .bind(self.metric.as_str())
            .execute(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        let stored: String = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'metric'")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        let existing: Metric = stored.parse().map_err(StoreError::Corrupt)?;

        if existing != self.metric {
            return Err(StoreError::MetricMismatch {
                existing,
                requested: self.metric,
            });
        }
        Ok(())
    }

    async fn stored_dimension(
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<Option<usize>, StoreError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dimension'")
                .fetch_optional(&mut **tx)
                .await
                .map_err(StoreError::unavailable)?;

        value
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| StoreError::Corrupt(format!("bad stored dimension '{}'", v)))
            })
            .transpose()
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
        if bytes.len() % 4 != 0 {
            return Err(StoreError::Corrupt(format!(
                "embedding blob of {} bytes is not a multiple of 4",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn location(&self) -> &IndexLocation {
        &self.location
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, StoreError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(StoreError::unavailable)?;

        let stored = Self::stored_dimension(&mut tx).await?;
        let dimension = check_batch_dimension(&entries, stored)?;
        if stored.is_none() {
            if let Some(dimension) = dimension {
                sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES ('dimension', ?1)")
                    .bind(dimension.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::unavailable)?;
            }
        }

        for entry in &entries {
            let blob = Self::serialize_embedding(&entry.vector);
            // Updates in place so the row keeps its rowid, which orders ties.
            sqlx::query(
                "INSERT INTO index_entries
                    (chunk_id, document_text, source_id, chunk_index, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(chunk_id) DO UPDATE SET
                    document_text = excluded.document_text,
                    source_id = excluded.source_id,
                    chunk_index = excluded.chunk_index,
                    embedding = excluded.embedding,
                    updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )
            .bind(&entry.chunk_id)
            .bind(&entry.document_text)
            .bind(&entry.metadata.source_id)
            .bind(entry.metadata.chunk_index as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::unavailable)?;
        }

        tx.commit().await.map_err(StoreError::unavailable)?;
        Ok(entries.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, document_text, source_id, chunk_index, embedding
             FROM index_entries
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let embedding_bytes: Vec<u8> = row.get("embedding");
            let stored = Self::deserialize_embedding(&embedding_bytes)?;
            if stored.len() != vector.len() {
                return Err(StoreError::DimensionMismatch {
                    expected: stored.len(),
                    actual: vector.len(),
                });
            }

            let chunk_index: i64 = row.get("chunk_index");
            hits.push(SearchHit {
                chunk_id: row.get("chunk_id"),
                document_text: row.get("document_text"),
                metadata: ChunkMetadata {
                    source_id: row.get("source_id"),
                    chunk_index: chunk_index as usize,
                },
                score: self.metric.score(vector, &stored),
            });
        }

        sort_descending(&mut hits, |hit| hit.score);
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        Ok(count as usize)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
