use super::{
    ChunkStore, Db, IndexRecord, IndexStats, StoreError, deserialize_vector, serialize_vector,
};
use rusqlite::{OptionalExtension, params};
use std::collections::BTreeMap;

/// Largest `k` a vec0 KNN query accepts.
const MAX_KNN_K: usize = 4096;

const RECORD_COLUMNS: &str = "c.seq, c.id, c.file_path, c.file_name, c.chunk_type, c.chunk_name, \
     c.code, c.description, c.start_line, c.end_line, c.total_lines, c.file_size, c.metadata";

fn map_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, IndexRecord)> {
    Ok((
        row.get(0)?,
        IndexRecord {
            id: row.get(1)?,
            file_path: row.get(2)?,
            file_name: row.get(3)?,
            chunk_type: row.get(4)?,
            chunk_name: row.get(5)?,
            code: row.get(6)?,
            description: row.get(7)?,
            start_line: row.get(8)?,
            end_line: row.get(9)?,
            total_lines: row.get(10)?,
            file_size: row.get(11)?,
            embedding: Vec::new(),
            metadata: row.get(12)?,
        },
    ))
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Db {
    /// Attach stored embeddings to rows fetched from the chunk table.
    fn with_embeddings(
        &self,
        rows: Vec<(i64, IndexRecord)>,
    ) -> Result<Vec<IndexRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT embedding FROM {} WHERE rowid = ?", self.vec_table))?;

        let mut records = Vec::with_capacity(rows.len());
        for (seq, mut record) in rows {
            let blob: Option<Vec<u8>> = stmt
                .query_row(params![seq], |row| row.get(0))
                .optional()?;
            record.embedding = blob.map(|b| deserialize_vector(&b)).unwrap_or_default();
            records.push(record);
        }
        Ok(records)
    }

    /// KNN search over the vector index (L2 distance), nearest first.
    ///
    /// `limit` is capped at the vec0 maximum of 4096 candidates.
    pub fn search_nearest(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<IndexRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions(),
                actual: query.len(),
            });
        }

        let sql = format!(
            r#"
            WITH knn AS (
                SELECT rowid, distance
                FROM {vec}
                WHERE embedding MATCH ?1 AND k = ?2
            )
            SELECT {RECORD_COLUMNS}
            FROM knn
            JOIN {table} c ON c.seq = knn.rowid
            ORDER BY knn.distance ASC
            "#,
            vec = self.vec_table,
            table = self.table,
        );

        let k = limit.min(MAX_KNN_K) as i64;
        let rows = {
            let mut stmt = self.conn.prepare(&sql)?;
            let mapped = stmt.query_map(params![serialize_vector(query), k], map_record_row)?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };

        self.with_embeddings(rows)
    }

    /// Records whose `code` or `chunk_name` contains `keyword`, in insertion
    /// order.
    ///
    /// `%`, `_` and `\` match literally. Matching is case-insensitive for
    /// ASCII letters only (SQLite `LIKE`).
    pub fn search_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<IndexRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM {table} c
            WHERE c.code LIKE ?1 ESCAPE '\' OR c.chunk_name LIKE ?1 ESCAPE '\'
            ORDER BY c.seq ASC
            LIMIT ?2
            "#,
            table = self.table,
        );

        let pattern = format!("%{}%", escape_like(keyword));
        let rows = {
            let mut stmt = self.conn.prepare(&sql)?;
            let mapped = stmt.query_map(params![pattern, limit as i64], map_record_row)?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };

        self.with_embeddings(rows)
    }

    /// Record count plus `chunk_type` and `file_name` distributions.
    pub fn index_stats(&self) -> Result<IndexStats, StoreError> {
        let total: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                    row.get(0)
                })?;

        Ok(IndexStats {
            total_chunks: total as usize,
            chunk_types: self.count_by_column("chunk_type")?,
            files: self.count_by_column("file_name")?,
        })
    }

    fn count_by_column(&self, column: &str) -> Result<BTreeMap<String, usize>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column}, COUNT(*) FROM {} GROUP BY {column}",
            self.table
        ))?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((key, count as usize))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            counts.insert(key, count);
        }
        Ok(counts)
    }
}

impl ChunkStore for Db {
    fn append(&mut self, record: &IndexRecord) -> Result<(), StoreError> {
        self.insert_record(record)
    }

    fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<IndexRecord>, StoreError> {
        self.search_nearest(query, limit)
    }

    fn keyword_search(&self, keyword: &str, limit: usize) -> Result<Vec<IndexRecord>, StoreError> {
        self.search_keyword(keyword, limit)
    }

    fn stats(&self) -> Result<IndexStats, StoreError> {
        self.index_stats()
    }
}
