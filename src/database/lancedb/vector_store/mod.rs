#[cfg(test)]
mod tests;

use super::{ChunkMetadata, EmbeddingRecord};
use crate::FaqError;
use crate::config::DistanceMetric;
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TABLE_NAME: &str = "chunks";

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    db_path: PathBuf,
    table_name: String,
    vector_dimension: Option<usize>,
    distance: DistanceMetric,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk_metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Create an empty index at `db_path`, replacing any previous one
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the LanceDB dataset
    /// * `distance` - Metric used by later searches
    ///
    /// # Returns
    /// * `Result<Self, FaqError>` - New VectorStore instance or error
    #[inline]
    pub async fn create(db_path: &Path, distance: DistanceMetric) -> Result<Self, FaqError> {
        debug!("Creating LanceDB index at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            FaqError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let store = Self {
            connection: Self::connect(db_path).await?,
            db_path: db_path.to_path_buf(),
            table_name: TABLE_NAME.to_string(),
            vector_dimension: None,
            distance,
        };

        store.drop_table_if_exists().await?;

        info!("Vector store created at {}", db_path.display());
        Ok(store)
    }

    /// Open an index previously written by ingestion
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the LanceDB dataset
    /// * `distance` - Metric used by searches
    ///
    /// # Returns
    /// * `Result<Self, FaqError>` - Opened store, or an error if no index exists
    #[inline]
    pub async fn open(db_path: &Path, distance: DistanceMetric) -> Result<Self, FaqError> {
        if !db_path.exists() {
            return Err(Self::missing_index_error(db_path));
        }

        let mut store = Self {
            connection: Self::connect(db_path).await?,
            db_path: db_path.to_path_buf(),
            table_name: TABLE_NAME.to_string(),
            vector_dimension: None,
            distance,
        };

        if !store.table_exists().await? {
            return Err(Self::missing_index_error(db_path));
        }

        let dim = store.detect_existing_vector_dimension().await?;
        store.vector_dimension = Some(dim);

        info!(
            "Loaded vector database from {} ({} dimensions)",
            db_path.display(),
            dim
        );
        Ok(store)
    }

    async fn connect(db_path: &Path) -> Result<Connection, FaqError> {
        let uri = db_path.to_string_lossy();
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to connect to LanceDB: {}", e)))
    }

    fn missing_index_error(db_path: &Path) -> FaqError {
        FaqError::Database(format!(
            "Vector database not found at {}. Run `faq-rag ingest` first.",
            db_path.display()
        ))
    }

    /// Path of the underlying dataset directory
    #[inline]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Dimension of the stored vectors, once known
    #[inline]
    pub fn vector_dimension(&self) -> Option<usize> {
        self.vector_dimension
    }

    async fn table_exists(&self) -> Result<bool, FaqError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Table, FaqError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to open table: {}", e)))
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, FaqError> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size).map_err(|_| {
                        FaqError::Database(format!("Invalid vector dimension: {}", size))
                    });
                }
            }
        }

        Err(FaqError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: i32) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim,
                ),
                false,
            ),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("char_count", DataType::UInt32, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Store multiple embeddings in a batch
    ///
    /// The first batch fixes the vector dimension of the index; later records
    /// must match it.
    ///
    /// # Arguments
    /// * `records` - Vector of embedding records to store
    ///
    /// # Returns
    /// * `Result<(), FaqError>` - Success or error
    #[inline]
    pub async fn store_embeddings_batch(
        &mut self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), FaqError> {
        let Some(first) = records.first() else {
            debug!("No embeddings to store");
            return Ok(());
        };

        debug!("Storing batch of {} embeddings", records.len());

        let vector_dim = first.vector.len();
        if vector_dim == 0 {
            return Err(FaqError::Database("Cannot store empty vectors".to_string()));
        }

        match self.vector_dimension {
            Some(existing) if existing != vector_dim => {
                return Err(FaqError::Database(format!(
                    "Vector dimension mismatch: index has {}, got {}",
                    existing, vector_dim
                )));
            }
            Some(_) => {}
            None => {
                self.create_table(vector_dim).await?;
                self.vector_dimension = Some(vector_dim);
            }
        }

        let record_batch = self.create_record_batch(&records)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Stored {} embeddings", records.len());
        Ok(())
    }

    async fn create_table(&self, vector_dim: usize) -> Result<(), FaqError> {
        info!("Creating chunks table with vector dimension: {}", vector_dim);

        let dim = i32::try_from(vector_dim)
            .map_err(|_| FaqError::Database(format!("Vector dimension too large: {}", vector_dim)))?;

        self.drop_table_if_exists().await?;
        self.connection
            .create_empty_table(&self.table_name, Self::create_schema(dim))
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, FaqError> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| FaqError::Database("Vector dimension not set".to_string()))?;
        let dim = i32::try_from(vector_dim)
            .map_err(|_| FaqError::Database(format!("Vector dimension too large: {}", vector_dim)))?;

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut char_counts = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(FaqError::Database(format!(
                    "Record {} has {} dimensions, expected {}",
                    record.id,
                    record.vector.len(),
                    vector_dim
                )));
            }
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            chunk_indices.push(record.metadata.chunk_index);
            contents.push(record.metadata.content.as_str());
            char_counts.push(record.metadata.char_count);
            sources.push(record.metadata.source.as_str());
            created_ats.push(record.metadata.created_at.as_str());
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(field, dim, Arc::new(values_array), None)
            .map_err(|e| FaqError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(contents)),
            Arc::new(UInt32Array::from(char_counts)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(Self::create_schema(dim), arrays)
            .map_err(|e| FaqError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Find the chunks nearest to a query vector, closest first
    ///
    /// # Arguments
    /// * `query_vector` - The query vector to search for
    /// * `limit` - Maximum number of results to return
    ///
    /// # Returns
    /// * `Result<Vec<SearchResult>, FaqError>` - Search results or error
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, FaqError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if let Some(dim) = self.vector_dimension {
            if dim != query_vector.len() {
                return Err(FaqError::Database(format!(
                    "Query has {} dimensions, index has {}",
                    query_vector.len(),
                    dim
                )));
            }
        }

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| FaqError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(self.distance_type())
            .limit(limit)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Self::parse_search_results_stream(results).await?;
        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(search_results)
    }

    fn distance_type(&self) -> DistanceType {
        match self.distance {
            DistanceMetric::L2 => DistanceType::L2,
            DistanceMetric::Cosine => DistanceType::Cosine,
        }
    }

    /// Parse search results from LanceDB stream into SearchResult structs
    async fn parse_search_results_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, FaqError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(Self::parse_search_batch(&batch_result)?);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, FaqError> {
        batch
            .column_by_name(name)
            .ok_or_else(|| FaqError::Database(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| FaqError::Database(format!("Invalid {} column type", name)))
    }

    fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, FaqError> {
        batch
            .column_by_name(name)
            .ok_or_else(|| FaqError::Database(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| FaqError::Database(format!("Invalid {} column type", name)))
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, FaqError> {
        let chunk_indices = Self::u32_column(batch, "chunk_index")?;
        let contents = Self::string_column(batch, "content")?;
        let char_counts = Self::u32_column(batch, "char_count")?;
        let sources = Self::string_column(batch, "source")?;
        let created_ats = Self::string_column(batch, "created_at")?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let search_results = (0..batch.num_rows())
            .map(|row| {
                let distance =
                    distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                SearchResult {
                    chunk_metadata: ChunkMetadata {
                        chunk_index: chunk_indices.value(row),
                        content: contents.value(row).to_string(),
                        char_count: char_counts.value(row),
                        source: sources.value(row).to_string(),
                        created_at: created_ats.value(row).to_string(),
                    },
                    // Convert distance to similarity score (higher is better)
                    similarity_score: 1.0 - distance,
                    distance,
                }
            })
            .collect();

        Ok(search_results)
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, FaqError> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        let count = self
            .open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| FaqError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Drop the chunks table if it exists
    async fn drop_table_if_exists(&self) -> Result<(), FaqError> {
        if self.table_exists().await? {
            info!("Dropping existing chunks table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| FaqError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    /// Validate database integrity
    ///
    /// # Returns
    /// * `Result<bool, FaqError>` - True if the table opens and can be counted
    #[inline]
    pub async fn validate_integrity(&self) -> Result<bool, FaqError> {
        debug!("Validating database integrity");

        match self.table_exists().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Chunks table missing during integrity check");
                return Ok(false);
            }
            Err(e) => {
                warn!("Failed to list tables during integrity check: {}", e);
                return Ok(false);
            }
        }

        match self.open_table().await {
            Ok(table) => match table.count_rows(None).await {
                Ok(count) => {
                    debug!("Database integrity check passed, {} rows found", count);
                    Ok(true)
                }
                Err(e) => {
                    warn!("Failed to count rows during integrity check: {}", e);
                    Ok(false)
                }
            },
            Err(e) => {
                warn!("Failed to open table during integrity check: {}", e);
                Ok(false)
            }
        }
    }
}
