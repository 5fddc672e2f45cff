//! SQLite-backed RAG store implementation.
//!
//! One database per model directory, brute-force cosine similarity for search.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::store::{ChunkSearchResult, DocumentRecord, RagStore, StoredChunk};
use crate::core::errors::ApiError;

const DB_FILE: &str = "store.db";
const DIMENSION_KEY: &str = "embedding_dimension";

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteRagStore {
    /// Opens (or creates) the store living in `dir`.
    pub async fn open_dir(dir: &Path) -> Result<Self, ApiError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            ApiError::Internal(format!(
                "Failed to create vector store directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Self::with_path(dir.join(DB_FILE)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                document_hash TEXT NOT NULL DEFAULT '',
                page INTEGER NOT NULL DEFAULT 0,
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_rag_document ON rag_chunks(document_hash)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_documents (
                content_hash TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                pages INTEGER NOT NULL DEFAULT 0,
                chunks INTEGER NOT NULL DEFAULT 0,
                ingested_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn write_chunks(
        conn: &mut SqliteConnection,
        items: &[(StoredChunk, Vec<f32>)],
    ) -> Result<(), ApiError> {
        let Some(first_len) = items.first().map(|(_, e)| e.len()) else {
            return Ok(());
        };
        if first_len == 0 {
            return Err(ApiError::BadRequest("Embeddings must not be empty".to_string()));
        }
        if let Some((chunk, embedding)) = items.iter().find(|(_, e)| e.len() != first_len) {
            return Err(ApiError::BadRequest(format!(
                "Embedding for chunk {} has {} dimensions, expected {}",
                chunk.chunk_id,
                embedding.len(),
                first_len
            )));
        }

        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = ?1")
                .bind(DIMENSION_KEY)
                .fetch_optional(&mut *conn)
                .await
                .map_err(ApiError::internal)?;

        match stored.and_then(|v| v.parse::<usize>().ok()) {
            Some(dimension) if dimension != first_len => {
                return Err(ApiError::BadRequest(format!(
                    "Embedding dimension {} does not match this store ({})",
                    first_len, dimension
                )));
            }
            Some(_) => {}
            None => {
                sqlx::query("INSERT OR REPLACE INTO rag_meta (key, value) VALUES (?1, ?2)")
                    .bind(DIMENSION_KEY)
                    .bind(first_len.to_string())
                    .execute(&mut *conn)
                    .await
                    .map_err(ApiError::internal)?;
            }
        }

        for (chunk, embedding) in items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks (chunk_id, content, source, document_hash, page, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&chunk.document_hash)
            .bind(chunk.page as i64)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *conn)
            .await
            .map_err(ApiError::internal)?;
        }

        Ok(())
    }

    async fn write_document(
        conn: &mut SqliteConnection,
        record: &DocumentRecord,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT OR REPLACE INTO rag_documents (content_hash, filename, pages, chunks, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&record.content_hash)
        .bind(&record.filename)
        .bind(record.pages as i64)
        .bind(record.chunks as i64)
        .bind(&record.ingested_at)
        .execute(&mut *conn)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: Option<String> = row.get("metadata");
        let metadata = metadata_str
            .as_deref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .filter(|v| !matches!(v, Value::Object(map) if map.is_empty()));
        let page: i64 = row.get("page");

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            document_hash: row.get("document_hash"),
            page: page.max(0) as u32,
            metadata,
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::write_chunks(&mut tx, &items).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn insert_document(
        &self,
        record: DocumentRecord,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::write_chunks(&mut tx, &items).await?;
        Self::write_document(&mut tx, &record).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, document_hash, page, metadata, embedding
             FROM rag_chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn contains_document(&self, content_hash: &str) -> Result<bool, ApiError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM rag_documents WHERE content_hash = ?1")
                .bind(content_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        Ok(found.is_some())
    }

    async fn record_document(&self, record: DocumentRecord) -> Result<(), ApiError> {
        let mut conn = self.pool.acquire().await.map_err(ApiError::internal)?;
        Self::write_document(&mut conn, &record).await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ApiError> {
        let rows = sqlx::query(
            "SELECT content_hash, filename, pages, chunks, ingested_at
             FROM rag_documents
             ORDER BY ingested_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| {
                let pages: i64 = row.get("pages");
                let chunks: i64 = row.get("chunks");
                DocumentRecord {
                    content_hash: row.get("content_hash"),
                    filename: row.get("filename"),
                    pages: pages.max(0) as usize,
                    chunks: chunks.max(0) as usize,
                    ingested_at: row.get("ingested_at"),
                }
            })
            .collect())
    }

    async fn embedding_dimension(&self) -> Result<Option<usize>, ApiError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = ?1")
                .bind(DIMENSION_KEY)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        Ok(stored.and_then(|v| v.parse().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, SqliteRagStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::open_dir(&tmp.path().join("vector_db_test"))
            .await
            .unwrap();
        (tmp, store)
    }

    fn make_chunk(id: &str, content: &str, page: u32) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: "doc.pdf".to_string(),
            document_hash: "h1".to_string(),
            page,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn insert_and_search() {
        let (_tmp, store) = test_store().await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "Hello world", 0), vec![1.0, 0.0, 0.0]),
                (make_chunk("c2", "Other text", 1), vec![0.0, 1.0, 0.0]),
                (make_chunk("c3", "Close match", 1), vec![0.9, 0.1, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert_eq!(results[1].chunk.chunk_id, "c3");
        assert!(results[0].score > 0.99);
        assert_eq!(results[1].chunk.page, 1);
        assert_eq!(results[0].chunk.metadata, None);
    }

    #[tokio::test]
    async fn search_on_empty_store_returns_nothing() {
        let (_tmp, store) = test_store().await;
        assert!(store.search(&[1.0, 0.0], 1).await.unwrap().is_empty());
        assert_eq!(store.embedding_dimension().await.unwrap(), None);
    }

    #[tokio::test]
    async fn first_insert_fixes_dimension() {
        let (_tmp, store) = test_store().await;

        store
            .insert_batch(vec![(make_chunk("c1", "a", 0), vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.embedding_dimension().await.unwrap(), Some(2));

        let err = store
            .insert_batch(vec![(make_chunk("c2", "b", 0), vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mixed_dimensions_in_one_batch_are_rejected() {
        let (_tmp, store) = test_store().await;
        let err = store
            .insert_batch(vec![
                (make_chunk("c1", "a", 0), vec![1.0, 0.0]),
                (make_chunk("c2", "b", 0), vec![1.0]),
            ])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("c2"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    fn record(hash: &str, chunks: usize) -> DocumentRecord {
        DocumentRecord {
            content_hash: hash.to_string(),
            filename: format!("{}.pdf", hash),
            pages: 1,
            chunks,
            ingested_at: "2024-05-01T10:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_document_stores_chunks_and_record_together() {
        let (_tmp, store) = test_store().await;

        store
            .insert_document(
                record("h1", 2),
                vec![
                    (make_chunk("c1", "a", 0), vec![1.0, 0.0]),
                    (make_chunk("c2", "b", 1), vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.contains_document("h1").await.unwrap());
    }

    #[tokio::test]
    async fn rejected_document_leaves_nothing_behind() {
        let (_tmp, store) = test_store().await;
        store
            .insert_batch(vec![(make_chunk("c0", "seed", 0), vec![1.0, 0.0])])
            .await
            .unwrap();

        let err = store
            .insert_document(
                record("h2", 1),
                vec![(make_chunk("c9", "wrong size", 0), vec![1.0, 0.0, 0.0])],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(!store.contains_document("h2").await.unwrap());
    }

    #[tokio::test]
    async fn documents_are_recorded_and_listed() {
        let (_tmp, store) = test_store().await;
        assert!(!store.contains_document("h1").await.unwrap());

        store
            .record_document(DocumentRecord {
                content_hash: "h1".to_string(),
                filename: "first.pdf".to_string(),
                pages: 2,
                chunks: 5,
                ingested_at: "2024-01-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();
        store
            .record_document(DocumentRecord {
                content_hash: "h2".to_string(),
                filename: "second.pdf".to_string(),
                pages: 1,
                chunks: 1,
                ingested_at: "2024-02-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();

        assert!(store.contains_document("h1").await.unwrap());
        let docs = store.list_documents().await.unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["second.pdf", "first.pdf"]);
        assert_eq!(docs[1].chunks, 5);
    }

    #[tokio::test]
    async fn reopening_keeps_data() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db_llama2_latest");
        {
            let store = SqliteRagStore::open_dir(&dir).await.unwrap();
            store
                .insert_batch(vec![(make_chunk("c1", "persisted", 0), vec![0.5, 0.5])])
                .await
                .unwrap();
        }

        let store = SqliteRagStore::open_dir(&dir).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.db_path(), dir.join("store.db").as_path());
    }
}
