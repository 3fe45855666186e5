// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings


pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{SearchResult, VectorStore};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding; every record in a table shares one dimension
    pub vector: Vec<f32>,
    /// The chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Index of this chunk within the document
    pub chunk_index: u32,
    /// The actual text content of the chunk
    pub content: String,
    /// Length of the content in characters
    pub char_count: u32,
    /// File the chunk was extracted from
    pub source: String,
    /// Timestamp when this embedding was created
    pub created_at: String,
}
