// Embeddings module
// Ollama integration for embeddings and generation, plus text chunking

pub mod chunking;
pub mod ollama;

pub use chunking::{
    ChunkStrategy, ChunkingConfig, ContentChunk, TextSplitter, char_len, chunk_content,
};
pub use ollama::{EmbeddingResult, OllamaClient};
