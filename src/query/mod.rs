// Query module
// Retrieval, keyword gate, prompt assembly and answer fallbacks


use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{Config, RetrievalConfig};
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::{FaqError, Result};

/// Source of context passages for a question
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Return the text of the `top_k` passages most similar to `query`, best first
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>>;
}

/// Language model that continues a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Retriever backed by the Ollama embedding model and the LanceDB index
pub struct VectorRetriever {
    client: OllamaClient,
    store: VectorStore,
}

impl VectorRetriever {
    #[inline]
    pub fn new(client: OllamaClient, store: VectorStore) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl ContextRetriever for VectorRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let client = self.client.clone();
        let text = query.to_string();
        let embedding = tokio::task::spawn_blocking(move || client.generate_embedding(&text))
            .await
            .context("Embedding task failed")?
            .map_err(|e| FaqError::Embedding(format!("{:#}", e)))?;

        let results = self
            .store
            .search_similar(&embedding.embedding, top_k)
            .await?;
        debug!("Retrieved {} passages", results.len());

        Ok(results
            .into_iter()
            .map(|result| result.chunk_metadata.content)
            .collect())
    }
}

/// Generator backed by the Ollama generation model
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = self.client.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || client.generate(&prompt))
            .await
            .context("Generation task failed")?
            .map_err(|e| FaqError::Generation(format!("{:#}", e)))
    }
}

/// Answers questions from the indexed FAQ
pub struct QueryEngine {
    retriever: Arc<dyn ContextRetriever>,
    generator: Arc<dyn TextGenerator>,
    retrieval: RetrievalConfig,
}

impl QueryEngine {
    #[inline]
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn TextGenerator>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            retrieval,
        }
    }

    /// Open the vector index and connect both models as configured
    ///
    /// Fails if no index has been built yet.
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store =
            VectorStore::open(&config.vector_database_path(), config.retrieval.distance).await?;
        let client = OllamaClient::new(config).context("Failed to initialize Ollama client")?;

        info!(
            "Query engine ready (embedding model {}, generation model {})",
            client.embedding_model(),
            client.generation_model()
        );

        Ok(Self::new(
            Arc::new(VectorRetriever::new(client.clone(), store)),
            Arc::new(OllamaGenerator::new(client)),
            config.retrieval.clone(),
        ))
    }

    #[inline]
    pub fn no_answer_message(&self) -> &str {
        &self.retrieval.no_answer_message
    }

    /// Answer a question, or return the no-answer message when the index has
    /// nothing relevant.
    ///
    /// Generation failures never surface as errors: the best matching context
    /// sentence is returned instead. Retrieval failures are returned to the caller.
    #[inline]
    pub async fn answer_question(&self, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Ok(self.retrieval.no_answer_message.clone());
        }

        let passages = self
            .retriever
            .retrieve(query, self.retrieval.top_k)
            .await?;
        let context = passages.join("\n\n");
        if context.trim().is_empty() {
            debug!("No context retrieved");
            return Ok(self.retrieval.no_answer_message.clone());
        }

        let keywords = extract_keywords(query, self.retrieval.keyword_min_chars);
        let lower_context = context.to_lowercase();
        if !keywords.iter().any(|kw| lower_context.contains(kw.as_str())) {
            debug!("No query keyword found in retrieved context");
            return Ok(self.retrieval.no_answer_message.clone());
        }

        let prompt = format_prompt(&context, query);
        match self.generator.generate(&prompt).await {
            Ok(generated) => {
                let answer = extract_continuation(&generated, &prompt);
                if answer.chars().count() < self.retrieval.min_answer_chars {
                    debug!("Generated answer too short, answering from context");
                    return Ok(most_relevant_segment(&context, '\n', &keywords).to_string());
                }
                Ok(answer.to_string())
            }
            Err(e) => {
                warn!("Error generating answer: {}", e);
                Ok(format!(
                    "{}.",
                    most_relevant_segment(&context, '.', &keywords)
                ))
            }
        }
    }
}

/// Lowercased whitespace tokens longer than `min_chars` characters
#[inline]
pub fn extract_keywords(query: &str, min_chars: usize) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

/// Number of keywords occurring in the lowercased segment
#[inline]
pub fn keyword_overlap(segment: &str, keywords: &[String]) -> usize {
    let lower = segment.to_lowercase();
    keywords
        .iter()
        .filter(|kw| lower.contains(kw.as_str()))
        .count()
}

/// The piece of `context` between `delimiter`s that shares the most keywords.
/// Ties go to the earliest piece.
#[inline]
pub fn most_relevant_segment<'a>(context: &'a str, delimiter: char, keywords: &[String]) -> &'a str {
    let mut best = "";
    let mut best_overlap = None;

    for segment in context.split(delimiter) {
        let overlap = keyword_overlap(segment, keywords);
        if best_overlap.is_none_or(|current| overlap > current) {
            best = segment;
            best_overlap = Some(overlap);
        }
    }

    best
}

/// Build the Arabic instruction prompt around the retrieved context
#[inline]
pub fn format_prompt(context: &str, query: &str) -> String {
    format!(
        "\n        استنادًا إلى المعلومات التالية:\n        \n        {context}\n        \n        أجب على السؤال التالي باللغة العربية:\n        {query}\n        \n        إذا كانت المعلومات المقدمة لا تحتوي على إجابة للسؤال، فقل: \"عذرًا، لا أملك معلومات كافية للإجابة على هذا السؤال.\"\n        \n        الإجابة:\n        "
    )
}

/// Generated text with any echoed prompt removed, trimmed
#[inline]
pub fn extract_continuation<'a>(generated: &'a str, prompt: &str) -> &'a str {
    generated.strip_prefix(prompt).unwrap_or(generated).trim()
}
