// Database module
// LanceDB holds the chunk vectors together with the chunk text

pub mod lancedb;

pub use self::lancedb::{ChunkMetadata, EmbeddingRecord, SearchResult, VectorStore};
