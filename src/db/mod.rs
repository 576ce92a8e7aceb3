//! Vector store for chunk records using SQLite and sqlite-vec
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;
use thiserror::Error;
use tracing::info;

use crate::indexer::describe::EmbedText;

pub mod models;
pub mod records;
pub mod search;

pub use models::{IndexRecord, IndexStats, RecordMetadata};

pub const DEFAULT_TABLE_NAME: &str = "code_chunks";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("index {table} was created with {key} = {stored}, but {requested} was requested")]
    SettingsMismatch {
        table: String,
        key: String,
        stored: String,
        requested: String,
    },

    #[error("embedding has {actual} dimensions, table expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// How records with an id already present in the table are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Every record is inserted; re-indexing produces duplicate ids.
    #[default]
    Append,
    /// Rows sharing the record's id are replaced.
    Upsert,
}

/// Operations the indexing pipeline and the retriever need from storage.
pub trait ChunkStore {
    /// Persist one record.
    fn append(&mut self, record: &IndexRecord) -> Result<(), StoreError>;

    /// Up to `limit` records whose embeddings are close to `query`, nearest
    /// first by the store's own metric.
    fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<IndexRecord>, StoreError>;

    /// Up to `limit` records whose `code` or `chunk_name` contains `keyword`.
    fn keyword_search(&self, keyword: &str, limit: usize)
    -> Result<Vec<IndexRecord>, StoreError>;

    fn stats(&self) -> Result<IndexStats, StoreError>;
}

/// Table layout and write behaviour for an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub table_name: String,
    pub dimensions: usize,
    pub embed_text: EmbedText,
    pub write_policy: WritePolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            dimensions: 1536,
            embed_text: EmbedText::default(),
            write_policy: WritePolicy::default(),
        }
    }
}

const SETTINGS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS index_settings (
    table_name TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (table_name, key)
);
"#;

fn schema_sql(table: &str, vec_table: &str, dimensions: usize) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_name TEXT NOT NULL,
    chunk_type TEXT NOT NULL,
    chunk_name TEXT NOT NULL,
    code TEXT NOT NULL,
    description TEXT,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    total_lines INTEGER NOT NULL,
    file_size INTEGER NOT NULL,
    metadata TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{table}_id ON {table}(id);
CREATE INDEX IF NOT EXISTS idx_{table}_file_name ON {table}(file_name);

CREATE VIRTUAL TABLE IF NOT EXISTS {vec_table} USING vec0(
    embedding FLOAT[{dimensions}]
);
"#
    )
}

fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// A SQLite connection holding one chunk table and its vector index.
pub struct Db {
    pub(crate) conn: Connection,
    pub(crate) table: String,
    pub(crate) vec_table: String,
    dimensions: usize,
    write_policy: WritePolicy,
}

impl Db {
    /// Open or create the index at `path`.
    pub fn open<P: AsRef<Path>>(path: P, options: &StoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening database: {}", path.display());

        // Register sqlite-vec extension globally
        init_sqlite_vec();
        let conn = Connection::open(path)?;
        Self::init(conn, options)
    }

    /// Open an in-memory index (useful for testing).
    pub fn open_in_memory(options: &StoreOptions) -> Result<Self, StoreError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        Self::init(conn, options)
    }

    fn init(conn: Connection, options: &StoreOptions) -> Result<Self, StoreError> {
        if !is_valid_table_name(&options.table_name) {
            return Err(StoreError::InvalidTableName(options.table_name.clone()));
        }
        let table = options.table_name.clone();
        let vec_table = format!("vec_{table}");

        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        info!("sqlite-vec version: {}", vec_version);

        conn.execute_batch(SETTINGS_SQL)?;
        check_setting(&conn, &table, "dimensions", &options.dimensions.to_string())?;
        check_setting(&conn, &table, "embed_text", options.embed_text.as_str())?;
        conn.execute_batch(&schema_sql(&table, &vec_table, options.dimensions))?;

        info!(
            "Table {} ready ({} dimensions, embedding {})",
            table, options.dimensions, options.embed_text
        );

        Ok(Self {
            conn,
            table,
            vec_table,
            dimensions: options.dimensions,
            write_policy: options.write_policy,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }
}

/// Record `value` for `key` on first use, or fail if a different value was
/// recorded when the table was created.
fn check_setting(conn: &Connection, table: &str, key: &str, value: &str) -> Result<(), StoreError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM index_settings WHERE table_name = ? AND key = ?",
            params![table, key],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(stored) if stored != value => Err(StoreError::SettingsMismatch {
            table: table.to_string(),
            key: key.to_string(),
            stored,
            requested: value.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO index_settings (table_name, key, value) VALUES (?, ?, ?)",
                params![table, key, value],
            )?;
            Ok(())
        }
    }
}

/// Helper to serialize a float32 vector into bytes for vec0 virtual table
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Inverse of [`serialize_vector`]. Trailing bytes that do not form a whole
/// float are ignored.
pub fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
