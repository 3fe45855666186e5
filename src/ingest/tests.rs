use super::*;
use crate::config::OllamaConfig;
use crate::embeddings::ChunkingConfig;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAQ_TEXT: &str = "س1: ما هي ساعات العمل؟\nجواب: ساعات العمل من 9 إلى 5.\nس2: أين تقع المكتبة؟\nجواب: في وسط المدينة.";

fn test_config(temp_dir: &TempDir, server: Option<&MockServer>) -> Config {
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ollama: OllamaConfig {
            batch_size: 1,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    if let Some(server) = server {
        config.ollama.host = server.address().ip().to_string();
        config.ollama.port = server.address().port();
    }
    config
}

fn test_ingestor(config: Config) -> Ingestor {
    let client = OllamaClient::new(&config)
        .expect("should create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(1)
        .with_backoff_base(Duration::from_millis(1));

    Ingestor::new(config)
        .expect("should create ingestor")
        .with_ollama_client(client)
        .with_progress(false)
}

async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.5, 0.25, 0.125]] })),
        )
        .mount(server)
        .await;
}

#[test]
fn plain_strategy_cleans_then_splits() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ingestor = test_ingestor(test_config(&temp_dir, None));

    let chunks = ingestor.build_chunks("Page 1\nساعات العمل:  من 9 إلى 5\n");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "1 ساعات العمل من 9 إلى 5");
    assert_eq!(chunks[0].chunk_index, 0);
}

#[test]
fn plain_strategy_respects_chunk_size() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&temp_dir, None);
    config.chunking = ChunkingConfig {
        chunk_size: 40,
        chunk_overlap: 10,
        ..ChunkingConfig::default()
    };
    let ingestor = test_ingestor(config);

    let chunks = ingestor.build_chunks(&"سؤال وجواب عن المكتبة ".repeat(20));

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.char_count <= 40));
}

#[test]
fn qa_strategy_builds_one_chunk_per_pair() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&temp_dir, None);
    config.chunking.strategy = ChunkStrategy::QaPairs;
    let ingestor = test_ingestor(config);

    let chunks = ingestor.build_chunks(FAQ_TEXT);

    assert_eq!(chunks.len(), 2);
    assert_eq!(
        chunks[0].content,
        "سؤال: ما هي ساعات العمل؟\nجواب: ساعات العمل من 9 إلى 5."
    );
    assert_eq!(chunks[1].chunk_index, 1);
}

#[test]
fn qa_strategy_falls_back_to_plain() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&temp_dir, None);
    config.chunking.strategy = ChunkStrategy::QaPairs;
    let ingestor = test_ingestor(config);

    let chunks = ingestor.build_chunks("ساعات العمل من 9 إلى 5");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "ساعات العمل من 9 إلى 5");
}

#[tokio::test]
async fn empty_text_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ingestor = test_ingestor(test_config(&temp_dir, None));

    let result = ingestor.ingest_text("Only latin text", "faq.pdf").await;
    assert!(matches!(result, Err(FaqError::Ingestion(_))));
}

#[tokio::test]
async fn missing_pdf_fails_before_indexing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir, None);
    let db_path = config.vector_database_path();
    let ingestor = test_ingestor(config);

    let result = ingestor
        .ingest_pdf(&temp_dir.path().join("missing.pdf"))
        .await;

    assert!(matches!(result, Err(FaqError::Ingestion(_))));
    assert!(!db_path.exists());
}

#[tokio::test]
async fn ingest_text_writes_index() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&temp_dir, Some(&server));
    config.chunking.strategy = ChunkStrategy::QaPairs;
    let db_path = config.vector_database_path();
    let ingestor = test_ingestor(config);

    let stats = ingestor
        .ingest_text(FAQ_TEXT, "FAQ-Arabic.pdf")
        .await
        .expect("ingestion should succeed");

    assert_eq!(stats.chunks_created, 2);
    assert_eq!(stats.embeddings_stored, 2);
    assert_eq!(stats.vector_dimension, 3);
    assert_eq!(stats.characters_extracted, FAQ_TEXT.chars().count());

    let store = VectorStore::open(&db_path, Default::default())
        .await
        .expect("index should exist");
    assert_eq!(store.count_embeddings().await.expect("should count"), 2);

    let results = store
        .search_similar(&[0.5, 0.25, 0.125], 5)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.chunk_metadata.source == "FAQ-Arabic.pdf"));
}

#[tokio::test]
async fn failed_embedding_keeps_previous_index() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir, Some(&server));
    let db_path = config.vector_database_path();
    test_ingestor(config)
        .ingest_text("ساعات العمل من 9 إلى 5", "faq.pdf")
        .await
        .expect("first ingestion should succeed");

    let failing = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&failing)
        .await;

    let result = test_ingestor(test_config(&temp_dir, Some(&failing)))
        .ingest_text("نص جديد تماما للفهرسة", "faq.pdf")
        .await;
    assert!(matches!(result, Err(FaqError::Embedding(_))));

    let store = VectorStore::open(&db_path, Default::default())
        .await
        .expect("previous index should survive");
    assert_eq!(store.count_embeddings().await.expect("should count"), 1);
}
