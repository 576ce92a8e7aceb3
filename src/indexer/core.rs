use crate::db::{ChunkStore, IndexRecord, RecordMetadata};
use crate::embedder::{Embedder, embed_or_zero};
use crate::indexer::chunk::Chunk;
use crate::indexer::describe::EmbedText;
use crate::indexer::identity::chunk_id;
use crate::indexer::splitter::ChunkSplitter;
use tracing::{debug, info, warn};

/// Turns extracted chunks into stored, embedded records.
pub struct Indexer<'a, S: ChunkStore + ?Sized, E: Embedder + ?Sized> {
    pub store: &'a mut S,
    pub embedder: &'a E,
    pub splitter: ChunkSplitter,
    pub embed_text: EmbedText,
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl<'a, S: ChunkStore + ?Sized, E: Embedder + ?Sized> Indexer<'a, S, E> {
    pub fn new(
        store: &'a mut S,
        embedder: &'a E,
        splitter: ChunkSplitter,
        embed_text: EmbedText,
    ) -> Self {
        Self {
            store,
            embedder,
            splitter,
            embed_text,
        }
    }

    /// Split, describe, embed and append every chunk, in order.
    ///
    /// Embedding failures store a zero vector; append failures are logged and
    /// skipped. Returns the number of records appended.
    pub fn index_chunks(&mut self, chunks: &[Chunk]) -> usize {
        let mut indexed = 0;

        for chunk in chunks {
            let parts = self.splitter.split(&chunk.code);
            let total_parts = parts.len();

            for (i, part) in parts.iter().enumerate() {
                let record = self.build_record(chunk, part, i, total_parts);
                match self.store.append(&record) {
                    Ok(()) => indexed += 1,
                    Err(e) => warn!("Error indexing chunk {}: {e}", record.id),
                }
            }
        }

        info!("Successfully indexed {indexed} chunks");
        indexed
    }

    fn build_record(
        &self,
        chunk: &Chunk,
        part: &str,
        part_index: usize,
        total_parts: usize,
    ) -> IndexRecord {
        let id = chunk_id(
            &chunk.file.file_path,
            &chunk.chunk_type,
            &chunk.name,
            chunk.start_line,
            part_index,
            total_parts,
        );
        debug!("Embedding {id}");

        let text = self.embed_text.render(chunk, part);
        let embedding = embed_or_zero(self.embedder, &text);
        let metadata = RecordMetadata {
            node_type: chunk.node_type.clone(),
            part_index,
            total_parts,
        };

        IndexRecord {
            id,
            file_path: chunk.file.file_path.clone(),
            file_name: chunk.file.file_name.clone(),
            chunk_type: chunk.chunk_type.clone(),
            chunk_name: chunk.name.clone(),
            code: part.to_string(),
            description: self.embed_text.stored_description(&text),
            start_line: to_i32(chunk.start_line),
            end_line: to_i32(chunk.end_line),
            total_lines: to_i32(chunk.file.total_lines),
            file_size: to_i32(chunk.file.file_size),
            embedding,
            metadata: metadata.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{IndexStats, StoreError};
    use crate::embedder::EmbedderError;
    use crate::embedder::mock::MockEmbedder;
    use crate::indexer::chunk::{FileInfo, kind};

    /// In-memory store that can be told to reject specific ids.
    #[derive(Default)]
    struct VecStore {
        records: Vec<IndexRecord>,
        reject: Vec<String>,
    }

    impl ChunkStore for VecStore {
        fn append(&mut self, record: &IndexRecord) -> Result<(), StoreError> {
            if self.reject.contains(&record.id) {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.records.push(record.clone());
            Ok(())
        }

        fn nearest(&self, _query: &[f32], limit: usize) -> Result<Vec<IndexRecord>, StoreError> {
            Ok(self.records.iter().take(limit).cloned().collect())
        }

        fn keyword_search(
            &self,
            _keyword: &str,
            _limit: usize,
        ) -> Result<Vec<IndexRecord>, StoreError> {
            Ok(Vec::new())
        }

        fn stats(&self) -> Result<IndexStats, StoreError> {
            Ok(IndexStats::default())
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedderError> {
            Err(EmbedderError::Request("rate limited".into()))
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            Err(EmbedderError::Request("rate limited".into()))
        }

        fn dimensions(&self) -> usize {
            6
        }
    }

    fn chunk(name: &str, code: &str, start: usize) -> Chunk {
        let file = FileInfo::new("src/math.ts", "line\nline\nline\nline");
        let lines = (start, start + 1);
        Chunk::new(kind::FUNCTION, Some(name), code, lines, "function_declaration", &file)
    }

    #[test]
    fn test_single_part_record() {
        let mut store = VecStore::default();
        let embedder = MockEmbedder::new(6);
        let mut indexer = Indexer::new(
            &mut store,
            &embedder,
            ChunkSplitter::default(),
            EmbedText::Description,
        );

        let add = chunk("add", "function add(a, b) { return a + b; }", 0);
        let count = indexer.index_chunks(&[add]);
        assert_eq!(count, 1);

        let record = &store.records[0];
        assert_eq!(record.id, "src/math.ts:function:add:0");
        assert_eq!(record.file_name, "math.ts");
        assert_eq!(record.total_lines, 4);
        assert_eq!(record.embedding.len(), 6);
        let description = record.description.as_deref().unwrap();
        assert!(description.starts_with("File: src/math.ts\nChunk Name: add"));
        let meta = RecordMetadata::from_json(&record.metadata).unwrap();
        assert_eq!((meta.part_index, meta.total_parts), (0, 1));
        assert_eq!(meta.node_type, "function_declaration");
    }

    #[test]
    fn test_split_parts_get_suffixed_ids() {
        let mut store = VecStore::default();
        let embedder = MockEmbedder::new(6);
        let code = "let value = 1;\n".repeat(20);
        let mut indexer = Indexer::new(
            &mut store,
            &embedder,
            ChunkSplitter::new(100, 20),
            EmbedText::RawCode,
        );

        let count = indexer.index_chunks(&[chunk("big", &code, 3)]);
        assert!(count > 1);
        assert_eq!(store.records.len(), count);
        for (i, record) in store.records.iter().enumerate() {
            assert_eq!(record.id, format!("src/math.ts:function:big:3:part_{i}"));
            assert!(record.code.chars().count() <= 100);
            assert_eq!(record.description, None);
            assert_eq!(record.embedding, embedder.embed(&record.code).unwrap());
        }
    }

    #[test]
    fn test_embedding_failure_stores_zero_vector() {
        let mut store = VecStore::default();
        let mut indexer = Indexer::new(
            &mut store,
            &FailingEmbedder,
            ChunkSplitter::default(),
            EmbedText::Description,
        );

        let count = indexer.index_chunks(&[chunk("a", "a()", 0), chunk("b", "b()", 2)]);
        assert_eq!(count, 2);
        assert!(store.records.iter().all(|r| r.embedding == vec![0.0; 6]));
    }

    #[test]
    fn test_append_failure_is_not_counted() {
        let mut store = VecStore {
            reject: vec!["src/math.ts:function:b:2".into()],
            ..VecStore::default()
        };
        let embedder = MockEmbedder::new(6);
        let mut indexer = Indexer::new(
            &mut store,
            &embedder,
            ChunkSplitter::default(),
            EmbedText::Description,
        );

        let chunks = [chunk("a", "a()", 0), chunk("b", "b()", 2), chunk("c", "c()", 4)];
        let count = indexer.index_chunks(&chunks);
        assert_eq!(count, 2);
        let names: Vec<&str> = store.records.iter().map(|r| r.chunk_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_no_chunks() {
        let mut store = VecStore::default();
        let embedder = MockEmbedder::new(6);
        let mut indexer = Indexer::new(
            &mut store,
            &embedder,
            ChunkSplitter::default(),
            EmbedText::Description,
        );
        assert_eq!(indexer.index_chunks(&[]), 0);
    }
}
