//! # VectorStore
//!
//! Document ingestion and retrieval over a hosted Pinecone index.
//!
//! This module wraps Pinecone's REST API with a small client plus two
//! domain-level handles:
//!
//! - [`PineconeClient`]: index provisioning (`ensure_index`), batch upsert,
//!   and similarity queries against the index's data plane.
//! - [`DocumentStore`]: the ingestion pipeline — validate, split, embed,
//!   upsert — and the accessor that hands out a read-only [`Retriever`].
//!
//! ## Responsibilities
//! - **Provisioning**: create-if-absent with dimension 384, cosine metric,
//!   serverless `aws`/`us-east-1`. Idempotent; the resolved index host is
//!   cached so repeated calls hit the control plane at most once per client.
//! - **Ingestion**: fixed-window splitting (1000/200), one embedding per
//!   chunk, a single batch upsert. Fresh UUIDs per ingest, so re-ingesting
//!   identical text creates duplicate entries (no dedup, no versioning).
//! - **Retrieval**: top-k cosine similarity through the remote service's
//!   native query endpoint; no local caching or re-ranking.
//!
//! There is no transactional boundary across provision → split → embed →
//! upsert: a failure mid-sequence leaves whatever the remote service already
//! recorded. Errors propagate to the caller, who owns any retry.
//!
//! ## Quick Example
//! ```no_run
//! use agentbot::config::load_config;
//! use agentbot::embeddings::SentenceEmbedder;
//! use agentbot::vector_store::{DocumentStore, PineconeClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("config.yaml")?;
//! let client = PineconeClient::new(&config)?;
//! let store = DocumentStore::new(client, Box::new(SentenceEmbedder::load()?));
//! let chunk_count = store.add_document("Rust is great!").await?;
//! println!("ingested {chunk_count} chunks");
//! # Ok(()) }
//! ```

use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::error::Error;
use uuid::Uuid;

use crate::config::AgentBotConfig;
use crate::embeddings::{EMBEDDING_DIMENSION, TextEmbedder};
use crate::splitter::TextSplitter;

use tracing::{debug, info};

/// Distance metric the index is created with.
const INDEX_METRIC: &str = "cosine";

/// Serverless deployment target for create-index requests.
const SERVERLESS_CLOUD: &str = "aws";
const SERVERLESS_REGION: &str = "us-east-1";

/// Pinecone REST API version header value.
const API_VERSION: &str = "2025-01";

/// Default number of chunks a retriever returns per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Metadata stored alongside each vector in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// The chunk's raw text.
    pub text: String,
    /// Character offset of the chunk in its source document.
    #[serde(deserialize_with = "usize_from_number")]
    pub start_index: usize,
}

// Pinecone stores metadata numbers as floats; accept both shapes.
fn usize_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let n = f64::deserialize(deserializer)?;
    Ok(n as usize)
}

/// One `(id, values, metadata)` tuple bound for the index.
#[derive(Debug, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A similarity-search hit mapped back into document terms.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Vector id assigned at ingest time.
    pub id: String,
    /// Chunk text recovered from the vector's metadata.
    pub text: String,
    /// Character offset of the chunk in its source document.
    pub start_index: usize,
    /// Cosine similarity score reported by the remote service.
    pub score: f32,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    host: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<ChunkMetadata>,
}

/// Client for Pinecone's control and data planes.
///
/// Holds the configured index name and, once [`ensure_index`](Self::ensure_index)
/// has run, the resolved data-plane host. The host cache is what makes
/// repeated `ensure_index` calls cost at most one control-plane round trip
/// per client lifetime.
pub struct PineconeClient {
    http: reqwest::Client,
    api_base: String,
    index_name: String,
    index_host: OnceCell<String>,
}

impl PineconeClient {
    /// Build a client from the application configuration.
    ///
    /// The API key goes into default headers so every control- and
    /// data-plane request carries it.
    ///
    /// # Errors
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &AgentBotConfig) -> Result<Self, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(&config.pinecone_api_key)?;
        api_key.set_sensitive(true);
        headers.insert("Api-Key", api_key);
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            api_base: config.pinecone_api_base.trim_end_matches('/').to_string(),
            index_name: config.pinecone_index.clone(),
            index_host: OnceCell::new(),
        })
    }

    /// Name of the index this client is bound to.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Ensure the configured index exists, creating it if absent.
    ///
    /// Lists the remote index names; if the configured name is missing,
    /// issues a create request with dimension [`EMBEDDING_DIMENSION`],
    /// cosine metric, and the fixed serverless spec. Safe to call before
    /// every ingestion or retrieval operation; after the first success the
    /// call is a no-op for this client.
    ///
    /// # Errors
    /// Propagates any control-plane failure. On error the index must not be
    /// used; retrying is the caller's responsibility.
    pub async fn ensure_index(&self) -> Result<(), Box<dyn Error>> {
        if self.index_host.get().is_some() {
            return Ok(());
        }

        let url = format!("{}/indexes", self.api_base);
        let list: IndexList = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(existing) = list.indexes.into_iter().find(|i| i.name == self.index_name) {
            debug!("Index {} already exists", self.index_name);
            let _ = self.index_host.set(existing.host);
            return Ok(());
        }

        info!("Creating Pinecone index {} ...", self.index_name);
        let body = json!({
            "name": self.index_name,
            "dimension": EMBEDDING_DIMENSION,
            "metric": INDEX_METRIC,
            "spec": {
                "serverless": {
                    "cloud": SERVERLESS_CLOUD,
                    "region": SERVERLESS_REGION,
                }
            }
        });
        let created: IndexDescription = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!("Index created.");

        let _ = self.index_host.set(created.host);
        Ok(())
    }

    /// Upsert a batch of vectors into the index in a single call.
    ///
    /// # Errors
    /// Fails if `ensure_index` has not resolved a host yet, or on any
    /// data-plane error. No partial-success reporting: a mid-batch failure
    /// leaves whatever the remote service recorded.
    pub async fn upsert(&self, vectors: &[VectorRecord]) -> Result<(), Box<dyn Error>> {
        let url = format!("{}/vectors/upsert", self.data_url()?);
        self.http
            .post(&url)
            .json(&json!({ "vectors": vectors }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Query the index for the `top_k` nearest vectors to `vector`.
    ///
    /// Metadata is requested so hits can be mapped back to chunk text.
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, Box<dyn Error>> {
        let url = format!("{}/query", self.data_url()?);
        let response: QueryResponse = self
            .http
            .post(&url)
            .json(&json!({
                "vector": vector,
                "topK": top_k,
                "includeMetadata": true,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| {
                let (text, start_index) = match m.metadata {
                    Some(md) => (md.text, md.start_index),
                    None => (String::new(), 0),
                };
                RetrievedChunk {
                    id: m.id,
                    text,
                    start_index,
                    score: m.score,
                }
            })
            .collect())
    }

    /// Data-plane base URL for the resolved index host.
    ///
    /// Pinecone reports hosts without a scheme; test servers hand back full
    /// URLs. Both are accepted.
    fn data_url(&self) -> Result<String, Box<dyn Error>> {
        let host = self
            .index_host
            .get()
            .ok_or("index host unknown; call ensure_index first")?;
        if host.starts_with("http://") || host.starts_with("https://") {
            Ok(host.trim_end_matches('/').to_string())
        } else {
            Ok(format!("https://{host}"))
        }
    }
}

/// Ingestion pipeline and retriever accessor over one Pinecone index.
///
/// Owns the [`PineconeClient`], the embedding model (behind the
/// [`TextEmbedder`] seam), and the fixed-window splitter. Constructed once
/// at startup and held for the process lifetime.
pub struct DocumentStore {
    client: PineconeClient,
    embedder: Box<dyn TextEmbedder>,
    splitter: TextSplitter,
    top_k: usize,
}

impl DocumentStore {
    /// Create a store with the default splitter (1000/200) and default
    /// retrieval `top_k`.
    pub fn new(client: PineconeClient, embedder: Box<dyn TextEmbedder>) -> Self {
        Self {
            client,
            embedder,
            splitter: TextSplitter::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override the default number of chunks the retriever returns.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Ingest one document: validate, ensure the index, split, embed, and
    /// upsert all chunks in a single batch.
    ///
    /// # Parameters
    /// - `text`: The raw document text. Must be non-empty.
    ///
    /// # Returns
    /// The number of chunks produced.
    ///
    /// # Errors
    /// - Empty `text` is rejected immediately; no remote call is made.
    /// - A `"dimension mismatch"` error if the embedder ever returns a
    ///   vector that is not [`EMBEDDING_DIMENSION`] wide.
    /// - Embedding-service or index-service errors propagate uncaught.
    pub async fn add_document(&self, text: &str) -> Result<usize, Box<dyn Error>> {
        if text.is_empty() {
            return Err("Document content cannot be empty.".into());
        }

        self.client.ensure_index().await?;

        let chunks = self.splitter.split(text);
        debug!("Split into {} chunks", chunks.len());

        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let values = self.embedder.embed(&chunk.text)?;
            if values.len() != EMBEDDING_DIMENSION {
                return Err("dimension mismatch".into());
            }
            vectors.push(VectorRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: ChunkMetadata {
                    text: chunk.text.clone(),
                    start_index: chunk.start_index,
                },
            });
        }

        self.client.upsert(&vectors).await?;
        info!(
            "Successfully added {} chunks to {}",
            chunks.len(),
            self.client.index_name()
        );

        Ok(chunks.len())
    }

    /// Ensure the index exists and return a read-only retrieval handle.
    pub async fn retriever(&self) -> Result<Retriever<'_>, Box<dyn Error>> {
        self.client.ensure_index().await?;
        Ok(Retriever {
            client: &self.client,
            embedder: self.embedder.as_ref(),
            top_k: self.top_k,
        })
    }
}

/// Read handle over the index, bound to the store's embedding model.
///
/// Exposes a single capability: top-k cosine similarity search for a query
/// string.
pub struct Retriever<'a> {
    client: &'a PineconeClient,
    embedder: &'a dyn TextEmbedder,
    top_k: usize,
}

impl Retriever<'_> {
    /// Change the number of chunks returned per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Embed `query` and return the most similar stored chunks, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, Box<dyn Error>> {
        let vector = self.embedder.embed(query)?;
        self.client.query(&vector, self.top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    struct StubEmbedder;

    impl TextEmbedder for StubEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
            Ok(vec![0.1; EMBEDDING_DIMENSION])
        }
    }

    fn test_config(api_base: String) -> AgentBotConfig {
        AgentBotConfig {
            pinecone_api_key: "test-key".to_string(),
            pinecone_index: "agentbot-index".to_string(),
            pinecone_api_base: api_base,
            backend_base_url: "http://localhost:8000".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            top_k: 4,
            web_search_enabled: false,
        }
    }

    #[tokio::test]
    async fn test_ensure_index_reuses_existing_index() {
        let server = MockServer::start_async().await;

        let list_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200).json_body(serde_json::json!({
                    "indexes": [{"name": "agentbot-index", "host": server.base_url()}]
                }));
            })
            .await;
        let create_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes");
                then.status(201).json_body(serde_json::json!({
                    "name": "agentbot-index", "host": server.base_url()
                }));
            })
            .await;

        let client = PineconeClient::new(&test_config(server.base_url())).unwrap();
        client.ensure_index().await.unwrap();
        client.ensure_index().await.unwrap();

        // One list call, host cached afterwards, never a create request.
        assert_eq!(list_mock.hits_async().await, 1);
        assert_eq!(create_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_ensure_index_creates_missing_index_once() {
        let server = MockServer::start_async().await;

        let list_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200).json_body(serde_json::json!({ "indexes": [] }));
            })
            .await;
        let create_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes").json_body_partial(
                    r#"{"name": "agentbot-index", "dimension": 384, "metric": "cosine"}"#,
                );
                then.status(201).json_body(serde_json::json!({
                    "name": "agentbot-index", "host": server.base_url()
                }));
            })
            .await;

        let client = PineconeClient::new(&test_config(server.base_url())).unwrap();
        client.ensure_index().await.unwrap();
        client.ensure_index().await.unwrap();

        assert_eq!(list_mock.hits_async().await, 1);
        assert_eq!(create_mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_add_document_rejects_empty_text() {
        let server = MockServer::start_async().await;

        let list_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200).json_body(serde_json::json!({ "indexes": [] }));
            })
            .await;

        let client = PineconeClient::new(&test_config(server.base_url())).unwrap();
        let store = DocumentStore::new(client, Box::new(StubEmbedder));

        let result = store.add_document("").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Document content cannot be empty."
        );

        // Validation happens before any remote traffic.
        assert_eq!(list_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_add_document_upserts_all_chunks_in_one_batch() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200).json_body(serde_json::json!({
                    "indexes": [{"name": "agentbot-index", "host": server.base_url()}]
                }));
            })
            .await;
        let upsert_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/vectors/upsert");
                then.status(200)
                    .json_body(serde_json::json!({ "upsertedCount": 3 }));
            })
            .await;

        let client = PineconeClient::new(&test_config(server.base_url())).unwrap();
        let store = DocumentStore::new(client, Box::new(StubEmbedder));

        // 2000 chars -> ceil((2000 - 200) / 800) = 3 chunks.
        let text = "y".repeat(2000);
        let chunk_count = store.add_document(&text).await.unwrap();

        assert_eq!(chunk_count, 3);
        assert_eq!(upsert_mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_retriever_maps_matches_to_chunks() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200).json_body(serde_json::json!({
                    "indexes": [{"name": "agentbot-index", "host": server.base_url()}]
                }));
            })
            .await;
        let query_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query")
                    .json_body_partial(r#"{"topK": 4, "includeMetadata": true}"#);
                then.status(200).json_body(serde_json::json!({
                    "matches": [
                        {"id": "a", "score": 0.93,
                         "metadata": {"text": "chunk one", "start_index": 0}},
                        {"id": "b", "score": 0.51,
                         "metadata": {"text": "chunk two", "start_index": 800.0}}
                    ]
                }));
            })
            .await;

        let client = PineconeClient::new(&test_config(server.base_url())).unwrap();
        let store = DocumentStore::new(client, Box::new(StubEmbedder));

        let retriever = store.retriever().await.unwrap();
        let chunks = retriever.retrieve("what is chunk one?").await.unwrap();

        query_mock.assert_async().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "chunk one");
        assert_eq!(chunks[0].start_index, 0);
        assert!(chunks[0].score > chunks[1].score);
        assert_eq!(chunks[1].start_index, 800);
    }
}
