use std::collections::{HashMap, HashSet};

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    SparseIndices, UpsertPointsBuilder, VectorParamsBuilder,
};

use super::SPARSE_VECTOR_NAME;
use super::error::VectorStoreError;
use super::model::{CacheHit, CachePoint, ChunkHit, SparseVector};

#[derive(Clone)]
/// Direct Qdrant client wrapper.
pub struct QdrantVectorStore {
    client: Qdrant,
    url: String,
}

impl QdrantVectorStore {
    /// Creates a client for `url`.
    pub async fn new(url: &str) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Returns the underlying Qdrant client.
    pub fn client(&self) -> &Qdrant {
        &self.client
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorStoreError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Creates a collection with cosine distance.
    pub async fn create_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        let vectors_config = VectorParamsBuilder::new(vector_size, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await
            .map_err(|e| VectorStoreError::CreateCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Ensures a collection exists (creates it if missing).
    pub async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        let exists = self.client.collection_exists(name).await.map_err(|e| {
            VectorStoreError::CreateCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            }
        })?;

        if !exists {
            self.create_collection(name, vector_size).await?;
        }

        Ok(())
    }

    fn doc_filter(doc_filter: Option<&HashSet<String>>) -> Option<Filter> {
        doc_filter.map(|ids| {
            let ids: Vec<String> = ids.iter().cloned().collect();
            Filter::must([Condition::matches("document_id", ids)])
        })
    }

    /// Dense similarity search over the chunk collection.
    pub async fn dense_search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> Result<Vec<ChunkHit>, VectorStoreError> {
        let mut search_builder =
            SearchPointsBuilder::new(collection, vector, limit).with_payload(true);

        if let Some(filter) = Self::doc_filter(doc_filter) {
            search_builder = search_builder.filter(filter);
        }

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(search_result
            .result
            .into_iter()
            .filter_map(ChunkHit::from_scored_point)
            .collect())
    }

    /// Sparse (BM25-like) search over the chunk collection's named sparse vector.
    pub async fn sparse_search(
        &self,
        collection: &str,
        query: SparseVector,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> Result<Vec<ChunkHit>, VectorStoreError> {
        let mut search_builder = SearchPointsBuilder::new(collection, query.values, limit)
            .vector_name(SPARSE_VECTOR_NAME)
            .sparse_indices(SparseIndices {
                data: query.indices,
            })
            .with_payload(true);

        if let Some(filter) = Self::doc_filter(doc_filter) {
            search_builder = search_builder.filter(filter);
        }

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(search_result
            .result
            .into_iter()
            .filter_map(ChunkHit::from_scored_point)
            .collect())
    }

    /// Nearest-neighbor lookup in the cache collection.
    pub async fn search_cache(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<CacheHit>, VectorStoreError> {
        let search_builder =
            SearchPointsBuilder::new(collection, vector, limit).with_payload(true);

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(search_result
            .result
            .into_iter()
            .filter_map(CacheHit::from_scored_point)
            .collect())
    }

    /// Upserts one cache entry, overwriting any point with the same id.
    pub async fn upsert_cache_entry(
        &self,
        collection: &str,
        point: CachePoint,
    ) -> Result<(), VectorStoreError> {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("query_text".to_string(), point.payload.query_text.into());
        payload.insert(
            "contexts_json".to_string(),
            point.payload.contexts_json.into(),
        );
        payload.insert(
            "created_at_ms".to_string(),
            point.payload.created_at_ms.into(),
        );
        payload.insert(
            "expires_at_ms".to_string(),
            point.payload.expires_at_ms.into(),
        );

        let qdrant_point = PointStruct::new(point.id, point.vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![qdrant_point]).wait(false))
            .await
            .map_err(|e| VectorStoreError::UpsertFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

/// Minimal async interface used by the retrieval and cache subsystems.
pub trait VectorStore: Send + Sync {
    /// Ensures a collection exists.
    fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> impl std::future::Future<Output = Result<(), VectorStoreError>> + Send;

    /// Dense similarity search, optionally restricted to a document whitelist.
    fn dense_search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<ChunkHit>, VectorStoreError>> + Send;

    /// Sparse search, optionally restricted to a document whitelist.
    fn sparse_search(
        &self,
        collection: &str,
        query: SparseVector,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<ChunkHit>, VectorStoreError>> + Send;

    /// Nearest-neighbor lookup in the cache collection.
    fn search_cache(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<CacheHit>, VectorStoreError>> + Send;

    /// Upserts one cache entry.
    fn upsert_cache_entry(
        &self,
        collection: &str,
        point: CachePoint,
    ) -> impl std::future::Future<Output = Result<(), VectorStoreError>> + Send;
}

impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorStoreError> {
        self.ensure_collection(name, vector_size).await
    }

    async fn dense_search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> Result<Vec<ChunkHit>, VectorStoreError> {
        self.dense_search(collection, vector, doc_filter, limit)
            .await
    }

    async fn sparse_search(
        &self,
        collection: &str,
        query: SparseVector,
        doc_filter: Option<&HashSet<String>>,
        limit: u64,
    ) -> Result<Vec<ChunkHit>, VectorStoreError> {
        self.sparse_search(collection, query, doc_filter, limit)
            .await
    }

    async fn search_cache(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<CacheHit>, VectorStoreError> {
        self.search_cache(collection, vector, limit).await
    }

    async fn upsert_cache_entry(
        &self,
        collection: &str,
        point: CachePoint,
    ) -> Result<(), VectorStoreError> {
        self.upsert_cache_entry(collection, point).await
    }
}
