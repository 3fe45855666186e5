use super::*;
use tempfile::TempDir;

fn create_test_dir() -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vector_db");
    (db_path, temp_dir)
}

fn create_test_embedding_record(index: u32, vector: Vec<f32>) -> EmbeddingRecord {
    let content = format!("محتوى المقطع رقم {}", index);
    EmbeddingRecord {
        id: format!("record_{}", index),
        vector,
        metadata: ChunkMetadata {
            chunk_index: index,
            char_count: u32::try_from(content.chars().count()).expect("fits in u32"),
            content,
            source: "FAQ-Arabic.pdf".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        },
    }
}

fn axis_records() -> Vec<EmbeddingRecord> {
    vec![
        create_test_embedding_record(0, vec![1.0, 0.0, 0.0]),
        create_test_embedding_record(1, vec![0.0, 1.0, 0.0]),
        create_test_embedding_record(2, vec![0.0, 0.0, 1.0]),
    ]
}

#[tokio::test]
async fn create_starts_empty() {
    let (db_path, _temp_dir) = create_test_dir();

    let store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should create vector store");

    assert_eq!(store.table_name, "chunks");
    assert_eq!(store.vector_dimension(), None);
    assert_eq!(store.path(), db_path.as_path());
    assert_eq!(
        store
            .count_embeddings()
            .await
            .expect("should count embeddings"),
        0
    );
    assert!(
        !store
            .validate_integrity()
            .await
            .expect("integrity check should run")
    );
}

#[tokio::test]
async fn store_and_count_embeddings() {
    let (db_path, _temp_dir) = create_test_dir();
    let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should create vector store");

    let result = store.store_embeddings_batch(axis_records()).await;
    assert!(
        result.is_ok(),
        "Failed to store embeddings: {:?}",
        result.err()
    );

    assert_eq!(store.vector_dimension(), Some(3));
    assert_eq!(
        store
            .count_embeddings()
            .await
            .expect("should count embeddings"),
        3
    );
    assert!(
        store
            .validate_integrity()
            .await
            .expect("integrity check should run")
    );
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let (db_path, _temp_dir) = create_test_dir();
    let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should create vector store");

    store
        .store_embeddings_batch(Vec::new())
        .await
        .expect("empty batch should succeed");

    assert_eq!(store.vector_dimension(), None);
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let (db_path, _temp_dir) = create_test_dir();
    let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should create vector store");

    store
        .store_embeddings_batch(axis_records())
        .await
        .expect("should store embeddings");

    let result = store
        .store_embeddings_batch(vec![create_test_embedding_record(3, vec![1.0, 0.0])])
        .await;
    assert!(result.is_err());

    let mixed = vec![
        create_test_embedding_record(4, vec![1.0, 0.0, 0.0]),
        create_test_embedding_record(5, vec![1.0, 0.0]),
    ];
    assert!(store.store_embeddings_batch(mixed).await.is_err());
}

#[tokio::test]
async fn search_returns_nearest_first() {
    let (db_path, _temp_dir) = create_test_dir();
    let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should create vector store");
    store
        .store_embeddings_batch(axis_records())
        .await
        .expect("should store embeddings");

    let results = store
        .search_similar(&[0.1, 0.9, 0.0], 2)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk_metadata.chunk_index, 1);
    assert_eq!(results[0].chunk_metadata.source, "FAQ-Arabic.pdf");
    assert!(results[0].distance <= results[1].distance);
    assert!(results[0].chunk_metadata.content.contains("رقم 1"));
}

#[tokio::test]
async fn search_limit_larger_than_index() {
    let (db_path, _temp_dir) = create_test_dir();
    let mut store = VectorStore::create(&db_path, DistanceMetric::Cosine)
        .await
        .expect("should create vector store");
    store
        .store_embeddings_batch(axis_records())
        .await
        .expect("should store embeddings");

    let results = store
        .search_similar(&[0.0, 0.0, 2.0], 10)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk_metadata.chunk_index, 2);
}

#[tokio::test]
async fn search_with_wrong_dimension_fails() {
    let (db_path, _temp_dir) = create_test_dir();
    let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should create vector store");
    store
        .store_embeddings_batch(axis_records())
        .await
        .expect("should store embeddings");

    assert!(store.search_similar(&[1.0, 0.0], 3).await.is_err());
}

#[tokio::test]
async fn open_reads_back_persisted_index() {
    let (db_path, _temp_dir) = create_test_dir();
    {
        let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
            .await
            .expect("should create vector store");
        store
            .store_embeddings_batch(axis_records())
            .await
            .expect("should store embeddings");
    }

    let store = VectorStore::open(&db_path, DistanceMetric::L2)
        .await
        .expect("should open existing index");

    assert_eq!(store.vector_dimension(), Some(3));
    assert_eq!(
        store
            .count_embeddings()
            .await
            .expect("should count embeddings"),
        3
    );

    let results = store
        .search_similar(&[1.0, 0.0, 0.0], 1)
        .await
        .expect("search should succeed");
    assert_eq!(results[0].chunk_metadata.chunk_index, 0);
}

#[tokio::test]
async fn open_missing_index_fails() {
    let (db_path, _temp_dir) = create_test_dir();

    let result = VectorStore::open(&db_path, DistanceMetric::L2).await;
    let err = result.err().expect("opening a missing index should fail");
    assert!(err.to_string().contains("faq-rag ingest"));
}

#[tokio::test]
async fn create_replaces_existing_index() {
    let (db_path, _temp_dir) = create_test_dir();
    {
        let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
            .await
            .expect("should create vector store");
        store
            .store_embeddings_batch(axis_records())
            .await
            .expect("should store embeddings");
    }

    let mut store = VectorStore::create(&db_path, DistanceMetric::L2)
        .await
        .expect("should recreate vector store");
    assert_eq!(
        store
            .count_embeddings()
            .await
            .expect("should count embeddings"),
        0
    );

    store
        .store_embeddings_batch(vec![create_test_embedding_record(7, vec![0.5, 0.5])])
        .await
        .expect("new index may use a different dimension");
    assert_eq!(store.vector_dimension(), Some(2));
}
