use super::{Db, IndexRecord, StoreError, WritePolicy, serialize_vector};
use rusqlite::params;

impl Db {
    /// Insert one record and its embedding in a single transaction.
    ///
    /// Under [`WritePolicy::Upsert`] rows with the same id, and their vectors,
    /// are removed first.
    pub fn insert_record(&mut self, record: &IndexRecord) -> Result<(), StoreError> {
        if record.embedding.len() != self.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions(),
                actual: record.embedding.len(),
            });
        }

        let table = self.table.clone();
        let vec_table = self.vec_table.clone();
        let policy = self.write_policy();
        let tx = self.conn.transaction()?;

        if policy == WritePolicy::Upsert {
            // Virtual table has no cascade; remove vectors explicitly
            let sql = format!(
                "DELETE FROM {vec_table} WHERE rowid IN (SELECT seq FROM {table} WHERE id = ?)"
            );
            tx.execute(&sql, params![record.id])?;
            tx.execute(&format!("DELETE FROM {table} WHERE id = ?"), params![record.id])?;
        }

        tx.execute(
            &format!(
                r#"
                INSERT INTO {table} (
                    id, file_path, file_name, chunk_type, chunk_name, code, description,
                    start_line, end_line, total_lines, file_size, metadata
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#
            ),
            params![
                record.id,
                record.file_path,
                record.file_name,
                record.chunk_type,
                record.chunk_name,
                record.code,
                record.description,
                record.start_line,
                record.end_line,
                record.total_lines,
                record.file_size,
                record.metadata,
            ],
        )?;
        let seq = tx.last_insert_rowid();

        tx.execute(
            &format!("INSERT INTO {vec_table} (rowid, embedding) VALUES (?, ?)"),
            params![seq, serialize_vector(&record.embedding)],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Number of rows carrying `id`.
    pub fn count_by_id(&self, id: &str) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE id = ?", self.table),
            params![id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{StoreOptions, deserialize_vector};

    fn record(id: &str, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            file_path: "src/math.ts".into(),
            file_name: "math.ts".into(),
            chunk_type: "function".into(),
            chunk_name: "add".into(),
            code: "function add(a, b) { return a + b; }".into(),
            description: Some("File: src/math.ts".into()),
            start_line: 0,
            end_line: 0,
            total_lines: 2,
            file_size: 38,
            embedding,
            metadata: "{}".into(),
        }
    }

    fn open(policy: WritePolicy) -> Db {
        Db::open_in_memory(&StoreOptions {
            dimensions: 3,
            write_policy: policy,
            ..StoreOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let mut db = open(WritePolicy::Append);
        db.insert_record(&record("a:function:add:0", vec![1.0, 0.0, 0.0]))
            .unwrap();
        db.insert_record(&record("a:function:add:0", vec![1.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(db.count_by_id("a:function:add:0").unwrap(), 2);
    }

    #[test]
    fn test_upsert_replaces_row_and_vector() {
        let mut db = open(WritePolicy::Upsert);
        db.insert_record(&record("a:function:add:0", vec![1.0, 0.0, 0.0]))
            .unwrap();
        db.insert_record(&record("a:function:add:0", vec![0.0, 1.0, 0.0]))
            .unwrap();
        assert_eq!(db.count_by_id("a:function:add:0").unwrap(), 1);

        let vectors: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM vec_code_chunks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(vectors, 1);

        let blob: Vec<u8> = db
            .conn
            .query_row("SELECT embedding FROM vec_code_chunks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(deserialize_vector(&blob), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_wrong_dimensions_rejected() {
        let mut db = open(WritePolicy::Append);
        let err = db.insert_record(&record("x", vec![1.0])).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 3, actual: 1 }
        ));
        assert_eq!(db.count_by_id("x").unwrap(), 0);
    }
}
