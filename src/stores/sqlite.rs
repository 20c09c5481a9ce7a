//! SQLite-backed vector index.
//!
//! Local alternative to the remote REST adapter, built on `tokio-rusqlite`
//! with the `sqlite-vec` extension supplying cosine distance. Chunks live
//! in a single `chunks` table keyed by vector id, with `source_id` indexed
//! so deletion-by-document stays cheap. Embeddings are stored as JSON
//! arrays and fed to `vec_f32()` at query time.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi};

use super::{QueryMatch, VectorIndex, VectorRecord};
use crate::types::RagError;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS chunks (
    id        TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    filename  TEXT,
    text      TEXT NOT NULL,
    embedding TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS chunks_source_idx ON chunks(source_id);
";

#[derive(Clone)]
pub struct SqliteVectorIndex {
    conn: Connection,
}

impl SqliteVectorIndex {
    /// Opens (or creates) an index database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::initialize(conn).await
    }

    /// Opens a transient in-memory index.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, RagError> {
        conn.call(|conn| -> Result<(), tokio_rusqlite::rusqlite::Error> {
            // Fails fast when the extension did not load.
            conn.query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0))?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self { conn })
    }

    /// Total number of stored vectors.
    pub async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| -> Result<usize, tokio_rusqlite::rusqlite::Error> {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Number of vectors stored for one document.
    pub async fn count_for_source(&self, source_id: &str) -> Result<usize, RagError> {
        let source_id = source_id.to_string();
        self.conn
            .call(move |conn| -> Result<usize, tokio_rusqlite::rusqlite::Error> {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM chunks WHERE source_id = ?",
                        [&source_id],
                        |row| row.get(0),
                    )?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, record: VectorRecord) -> Result<(), RagError> {
        let embedding = serde_json::to_string(&record.embedding)
            .map_err(|err| RagError::VectorStore(err.to_string()))?;
        self.conn
            .call(move |conn| -> Result<(), tokio_rusqlite::rusqlite::Error> {
                conn.execute(
                    "INSERT INTO chunks (id, source_id, filename, text, embedding) \
                     VALUES (?1, ?2, ?3, ?4, ?5) \
                     ON CONFLICT(id) DO UPDATE SET \
                       source_id = excluded.source_id, \
                       filename = excluded.filename, \
                       text = excluded.text, \
                       embedding = excluded.embedding",
                    (
                        &record.id,
                        &record.metadata.source_id,
                        &record.metadata.filename,
                        &record.metadata.text,
                        &embedding,
                    ),
                )?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RagError> {
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|err| RagError::VectorStore(err.to_string()))?;
        self.conn
            .call(move |conn| -> Result<Vec<QueryMatch>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT text, source_id, \
                         1.0 - vec_distance_cosine(vec_f32(embedding), vec_f32(?)) AS score \
                         FROM chunks ORDER BY score DESC LIMIT {top_k}"
                    ))?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        Ok(QueryMatch {
                            text: row.get(0)?,
                            source_id: row.get(1)?,
                            score: row.get::<_, f64>(2)? as f32,
                        })
                    })?;

                let mut matches = Vec::new();
                for row in rows {
                    matches.push(row?);
                }
                Ok(matches)
            })
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<(), RagError> {
        let source_id = source_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, tokio_rusqlite::rusqlite::Error> {
                let deleted = conn
                    .execute("DELETE FROM chunks WHERE source_id = ?", [&source_id])?;
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;
        tracing::debug!(deleted, "removed vectors by source");
        Ok(())
    }
}

/// Registers the `sqlite-vec` extension for every subsequent connection.
///
/// `sqlite3_auto_extension` is process-global, so registration happens at
/// most once regardless of how many indexes are opened.
fn register_sqlite_vec() -> Result<(), RagError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTERED
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn = transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc == 0 {
                Ok(())
            } else {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            }
        })
        .clone()
        .map_err(RagError::Storage)
}
