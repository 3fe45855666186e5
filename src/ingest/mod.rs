// Ingestion module
// Turns the FAQ PDF into a fresh vector index: extract, clean, chunk, embed, store

pub mod pdf;
pub mod text;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::embeddings::chunking::into_content_chunks;
use crate::embeddings::{
    ChunkStrategy, ContentChunk, EmbeddingResult, OllamaClient, chunk_content,
};
use crate::{FaqError, Result};

pub use pdf::{extract_text_from_bytes, extract_text_from_pdf};
pub use text::{QaPair, clean_text, extract_qa_pairs};

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    pub characters_extracted: usize,
    pub chunks_created: usize,
    pub embeddings_stored: usize,
    pub vector_dimension: usize,
    pub duration: Duration,
}

/// Offline pipeline that rebuilds the similarity index from a document
pub struct Ingestor {
    config: Config,
    ollama_client: OllamaClient,
    show_progress: bool,
}

impl Ingestor {
    #[inline]
    pub fn new(config: Config) -> Result<Self> {
        let ollama_client =
            OllamaClient::new(&config).context("Failed to initialize Ollama client")?;

        Ok(Self {
            config,
            ollama_client,
            show_progress: console::user_attended_stderr(),
        })
    }

    /// Replace the embedding client, e.g. to tune timeouts or retries
    #[inline]
    #[must_use]
    pub fn with_ollama_client(mut self, ollama_client: OllamaClient) -> Self {
        self.ollama_client = ollama_client;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Rebuild the index from a PDF file
    #[inline]
    pub async fn ingest_pdf(&self, path: &Path) -> Result<IngestionStats> {
        let pdf_path = path.to_path_buf();
        let raw_text = tokio::task::spawn_blocking(move || extract_text_from_pdf(&pdf_path))
            .await
            .context("PDF extraction task failed")??;

        let source = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

        self.ingest_text(&raw_text, &source).await
    }

    /// Rebuild the index from already extracted text
    ///
    /// The previous index is only replaced once every chunk has been embedded,
    /// so a failed run leaves it untouched.
    #[inline]
    pub async fn ingest_text(&self, raw_text: &str, source: &str) -> Result<IngestionStats> {
        let started = Instant::now();
        let characters_extracted = raw_text.chars().count();

        let chunks = self.build_chunks(raw_text);
        if chunks.is_empty() {
            return Err(FaqError::Ingestion(format!(
                "No indexable text found in {}",
                source
            )));
        }
        info!("Split text into {} chunks", chunks.len());

        let embeddings = self.embed_chunks(&chunks).await?;
        let vector_dimension = embeddings.first().map_or(0, |e| e.embedding.len());

        let created_at = Utc::now().to_rfc3339();
        let records = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| -> Result<EmbeddingRecord> {
                Ok(EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector: embedding.embedding,
                    metadata: ChunkMetadata {
                        chunk_index: u32::try_from(chunk.chunk_index).map_err(|_| {
                            FaqError::Ingestion("Too many chunks to index".to_string())
                        })?,
                        content: chunk.content.clone(),
                        char_count: u32::try_from(chunk.char_count).map_err(|_| {
                            FaqError::Ingestion("Chunk too large to index".to_string())
                        })?,
                        source: source.to_string(),
                        created_at: created_at.clone(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let embeddings_stored = records.len();

        let db_path = self.config.vector_database_path();
        let mut store = VectorStore::create(&db_path, self.config.retrieval.distance).await?;
        store.store_embeddings_batch(records).await?;

        let stats = IngestionStats {
            characters_extracted,
            chunks_created: chunks.len(),
            embeddings_stored,
            vector_dimension,
            duration: started.elapsed(),
        };

        info!(
            "Vector database saved to {} ({} chunks, {} dimensions, {:.1}s)",
            db_path.display(),
            stats.chunks_created,
            stats.vector_dimension,
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }

    /// Clean and split raw document text according to the chunking strategy
    ///
    /// Question/answer extraction runs on the raw text, because cleaning drops
    /// the `:` the markers rely on. If no pair is found the plain strategy is used.
    #[inline]
    pub fn build_chunks(&self, raw_text: &str) -> Vec<ContentChunk> {
        if self.config.chunking.strategy == ChunkStrategy::QaPairs {
            let pairs = extract_qa_pairs(raw_text);
            if !pairs.is_empty() {
                let texts = pairs.iter().map(QaPair::to_chunk).collect();
                return into_content_chunks(texts);
            }
            warn!("No question/answer pairs found, falling back to plain chunking");
        }

        let cleaned = clean_text(raw_text);
        debug!(
            "Cleaned text from {} to {} characters",
            raw_text.chars().count(),
            cleaned.chars().count()
        );
        chunk_content(&cleaned, &self.config.chunking)
    }

    async fn embed_chunks(&self, chunks: &[ContentChunk]) -> Result<Vec<EmbeddingResult>> {
        let batch_size = usize::try_from(self.config.ollama.batch_size)
            .unwrap_or(1)
            .max(1);

        let bar = if self.show_progress {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding chunks {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let client = self.ollama_client.clone();
            let batch = batch.to_vec();
            let batch_len = batch.len();

            let results =
                tokio::task::spawn_blocking(move || client.generate_chunk_embeddings(&batch))
                    .await
                    .context("Embedding task failed")?
                    .map_err(|e| FaqError::Embedding(format!("{:#}", e)))?;

            embeddings.extend(results);
            bar.inc(batch_len as u64);
        }
        bar.finish_and_clear();

        Ok(embeddings)
    }
}
