use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::{Config, get_config_dir};
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::ingest::Ingestor;
use crate::query::QueryEngine;

/// Resolve the configuration directory from the CLI flag or the default location
#[inline]
pub fn resolve_config_dir(config_dir: Option<PathBuf>) -> Result<PathBuf> {
    match config_dir {
        Some(dir) => Ok(dir),
        None => get_config_dir().context("Failed to determine configuration directory"),
    }
}

/// Load and validate the configuration stored in `config_dir`
#[inline]
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let config = Config::load(config_dir)?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Build the vector index from the FAQ PDF
#[inline]
pub async fn ingest(config: Config, pdf: Option<PathBuf>) -> Result<()> {
    let pdf_path = pdf.unwrap_or_else(|| config.pdf_path());
    let db_path = config.vector_database_path();
    info!("Ingesting {} into {}", pdf_path.display(), db_path.display());

    let ingestor = Ingestor::new(config)?;
    let stats = ingestor.ingest_pdf(&pdf_path).await?;

    println!("Ingestion completed successfully!");
    println!("  Characters extracted: {}", stats.characters_extracted);
    println!("  Chunks created: {}", stats.chunks_created);
    println!("  Embeddings stored: {}", stats.embeddings_stored);
    println!("  Vector dimension: {}", stats.vector_dimension);
    println!("  Duration: {:?}", stats.duration);
    println!("  Vector database: {}", db_path.display());

    Ok(())
}

/// Start the HTTP chat server
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    println!(
        "Starting FAQ chatbot on http://{}/",
        config.server.bind_address()
    );
    crate::server::serve(&config).await?;
    Ok(())
}

/// Answer a single question on stdout
#[inline]
pub async fn ask(config: Config, question: &str) -> Result<()> {
    let engine = QueryEngine::from_config(&config).await?;

    let answer = match engine.answer_question(question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Error processing question: {}", e);
            engine.no_answer_message().to_string()
        }
    };

    println!("{}", answer);
    Ok(())
}

/// Show configuration, model health and index status
#[inline]
pub async fn show_status(config: Config) -> Result<()> {
    println!("📊 FAQ-RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   📁 Directory: {}", config.get_base_dir().display());
    println!("   📄 PDF: {}", config.pdf_path().display());
    println!(
        "   ✂️  Chunking: {} chars, {} overlap ({:?})",
        config.chunking.chunk_size, config.chunking.chunk_overlap, config.chunking.strategy
    );
    println!(
        "   🔎 Retrieval: top {} by {:?} distance",
        config.retrieval.top_k, config.retrieval.distance
    );
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding model: {}", client.embedding_model());
                println!("   📋 Generation model: {}", client.generation_model());
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unhealthy - {:#}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {:#}", e);
        }
    }
    println!();

    println!("🔍 Vector Database Status:");
    let db_path = config.vector_database_path();
    match VectorStore::open(&db_path, config.retrieval.distance).await {
        Ok(store) => {
            println!("   ✅ LanceDB: {}", db_path.display());
            match store.count_embeddings().await {
                Ok(count) => println!("   📦 Chunks indexed: {}", count),
                Err(e) => println!("   ⚠️  Could not count chunks - {}", e),
            }
            if let Some(dimension) = store.vector_dimension() {
                println!("   🔢 Vector dimension: {}", dimension);
            }
            match store.validate_integrity().await {
                Ok(true) => println!("   ✅ Integrity check passed"),
                Ok(false) => println!("   ❌ Integrity check failed"),
                Err(e) => println!("   ⚠️  Integrity check error - {}", e),
            }
        }
        Err(e) => {
            println!("   ❌ LanceDB: {}", e);
        }
    }

    Ok(())
}
