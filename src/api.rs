use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Embedding width the search service indexes.
pub const EMBEDDING_DIM: usize = 1024;

/// A JSON object returned verbatim by the service.
pub type JsonObject = serde_json::Map<String, Value>;

/// Caller-supplied filter mapping, passed through to the service unvalidated.
pub type MetadataFilters = serde_json::Map<String, Value>;

/// Metadata describing a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryMetadata {
    pub name: String,
    /// ISO-8601 timestamp
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A top-level collection of documents in the remote vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Assigned by the server; absent until created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub metadata: LibraryMetadata,
}

/// Metadata describing a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// A container of chunks belonging to exactly one library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub metadata: DocumentMetadata,
}

/// Metadata describing a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// The smallest retrievable unit of text, belonging to exactly one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Never sent in requests; the service does not yet accept client-side
    /// embeddings on chunk uploads.
    #[serde(skip_serializing, default)]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Attaches an embedding, enforcing the service's fixed width.
    pub fn set_embedding(&mut self, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != EMBEDDING_DIM {
            return Err(Error::InvalidEmbedding(embedding.len()));
        }
        self.embedding = Some(embedding);
        Ok(())
    }
}

/// The raw result list returned by a search, unmodified.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResults(pub Vec<Value>);

impl std::fmt::Display for SearchResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&serde_json::to_string_pretty(&self.0).unwrap())
    }
}

/// The full operation surface of the remote vector database.
///
/// Responses are returned verbatim as JSON mappings; the server is
/// authoritative for ids and referential integrity.
#[async_trait]
pub trait VectorDbApi: Send + Sync {
    /// Creates a library and returns the server's response, including the
    /// assigned id.
    async fn create_library(&self, library: &Library) -> Result<JsonObject>;

    /// Fetches a library by id.
    async fn get_library(&self, library_id: &str) -> Result<JsonObject>;

    /// Replaces a library's name and metadata.
    async fn update_library(&self, library_id: &str, library: &Library) -> Result<JsonObject>;

    /// Deletes a library.
    async fn delete_library(&self, library_id: &str) -> Result<JsonObject>;

    /// Adds a document to a library and returns the server's response,
    /// including the assigned id.
    async fn add_document(&self, library_id: &str, document: &Document) -> Result<JsonObject>;

    /// Fetches a document by id within a library.
    async fn get_document(&self, library_id: &str, document_id: &str) -> Result<JsonObject>;

    /// Replaces a document's metadata.
    async fn update_document(
        &self,
        library_id: &str,
        document_id: &str,
        document: &Document,
    ) -> Result<JsonObject>;

    /// Deletes a document from a library.
    async fn delete_document(&self, library_id: &str, document_id: &str) -> Result<JsonObject>;

    /// Adds a chunk to a document and returns the server's response.
    async fn add_chunk(
        &self,
        library_id: &str,
        document_id: &str,
        chunk: &Chunk,
    ) -> Result<JsonObject>;

    /// Fetches a chunk by id.
    async fn get_chunk(&self, chunk_id: &str) -> Result<JsonObject>;

    /// Replaces a chunk's text and metadata.
    async fn update_chunk(&self, chunk_id: &str, chunk: &Chunk) -> Result<JsonObject>;

    /// Deletes a chunk.
    async fn delete_chunk(&self, chunk_id: &str) -> Result<JsonObject>;

    /// Searches every library with the given query text and filter mapping.
    async fn search_all_libraries(
        &self,
        query_text: &str,
        metadata_filters: MetadataFilters,
    ) -> Result<SearchResults>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library(id: Option<&str>) -> Library {
        Library {
            id: id.map(str::to_string),
            name: "My Library".to_string(),
            metadata: LibraryMetadata {
                name: "My Library".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
                description: None,
            },
        }
    }

    #[test]
    fn unset_id_is_omitted_not_null() {
        let value = serde_json::to_value(library(None)).unwrap();

        let object = value.as_object().unwrap();
        assert!(!object.contains_key("id"));
        assert!(!object["metadata"].as_object().unwrap().contains_key("description"));
    }

    #[test]
    fn server_assigned_id_round_trips() {
        let value = serde_json::to_value(library(Some("lib-1"))).unwrap();
        assert_eq!(value["id"], "lib-1");

        let parsed: Library = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("lib-1"));
    }

    #[test]
    fn metadata_uses_camel_case_timestamp_key() {
        let metadata = DocumentMetadata {
            name: "Sample Document".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let value = serde_json::to_value(metadata).unwrap();
        assert_eq!(
            value,
            json!({"name": "Sample Document", "createdAt": "2024-01-01T00:00:00Z"})
        );
    }

    fn chunk() -> Chunk {
        Chunk {
            id: None,
            text: "Hello world".to_string(),
            metadata: ChunkMetadata {
                name: "Kevin".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
            },
            embedding: None,
        }
    }

    #[test]
    fn embedding_never_reaches_the_wire() {
        let mut chunk = chunk();
        chunk.set_embedding(vec![0.0; EMBEDDING_DIM]).unwrap();

        let value = serde_json::to_value(chunk).unwrap();
        assert!(!value.as_object().unwrap().contains_key("embedding"));
    }

    #[test]
    fn embedding_width_is_enforced() {
        let mut chunk = chunk();

        let err = chunk.set_embedding(vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, crate::error::Error::InvalidEmbedding(3)));
        assert!(chunk.embedding.is_none());
    }
}
