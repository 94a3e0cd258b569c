use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Method,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::{
    api::{Chunk, Document, JsonObject, Library, MetadataFilters, SearchResults, VectorDbApi},
    error::{ApiError, Error, Result},
};

/// Default template for chunk collections nested under a document.
pub const DEFAULT_CHUNK_ENDPOINT: &str = "/documents/{document_id}/chunks";

/// Marker for operations that send no request body.
const NO_BODY: Option<&Value> = None;

/// Client for a remote vector database speaking the libraries, documents, and
/// chunks HTTP surface.
///
/// The client is stateless across calls: it holds the base URL, the path
/// template below, and a shared `reqwest::Client`. Clones are cheap and safe
/// to use from multiple tasks.
#[derive(Debug, Clone)]
pub struct VectorDbClient {
    http: reqwest::Client,
    base_url: String,
    /// Where a service nests chunk collections. The current service routes
    /// every chunk operation through the flat `/chunks/` collection, so this
    /// template is carried as configuration but not applied to requests.
    pub chunk_endpoint: String,
}

impl VectorDbClient {
    /// Creates a client for the service at `base_url`. A trailing slash is
    /// stripped so operation paths can be appended verbatim.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_endpoint: DEFAULT_CHUNK_ENDPOINT.to_string(),
        }
    }

    /// Creates a client from the `VECTOR_DB_URL` environment variable.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("VECTOR_DB_URL")
            .map_err(|_| Error::NotConfigured("VECTOR_DB_URL env variable not set".to_string()))?;
        Ok(Self::new(url))
    }

    /// Overrides the chunk collection template, e.g. `"/chunks"`.
    pub fn with_chunk_endpoint(mut self, template: impl Into<String>) -> Self {
        self.chunk_endpoint = template.into();
        self
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Performs one request and decodes the outcome. Every operation funnels
    /// through here; a single attempt, no retries.
    #[instrument(skip_all)]
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{method} {url}");

        let mut req = self
            .http
            .request(method, &url)
            .headers(headers.unwrap_or_else(Self::default_headers));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_body(status, &text);
            error!("request to {url} failed: {err}");
            return Err(err.into());
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query_text: &'a str,
    metadata_filters: &'a MetadataFilters,
}

/// Shapes a success payload into the response mapping. An empty body counts
/// as an empty mapping.
fn object_body(value: Value) -> Result<JsonObject> {
    match value {
        Value::Null => Ok(JsonObject::new()),
        Value::Object(object) => Ok(object),
        other => Err(Error::InvalidResponse(format!(
            "expected a JSON object, got: {other}"
        ))),
    }
}

fn list_body(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        other => Err(Error::InvalidResponse(format!(
            "expected a JSON array, got: {other}"
        ))),
    }
}

#[async_trait]
impl VectorDbApi for VectorDbClient {
    async fn create_library(&self, library: &Library) -> Result<JsonObject> {
        object_body(
            self.request(Method::POST, "/libraries", &[], Some(library), None)
                .await?,
        )
    }

    async fn get_library(&self, library_id: &str) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::GET,
                &format!("/libraries/{library_id}"),
                &[],
                NO_BODY,
                None,
            )
            .await?,
        )
    }

    async fn update_library(&self, library_id: &str, library: &Library) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::PATCH,
                &format!("/libraries/{library_id}"),
                &[],
                Some(library),
                None,
            )
            .await?,
        )
    }

    async fn delete_library(&self, library_id: &str) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::DELETE,
                &format!("/libraries/{library_id}"),
                &[],
                NO_BODY,
                None,
            )
            .await?,
        )
    }

    async fn add_document(&self, library_id: &str, document: &Document) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::POST,
                "/documents",
                &[("library_id", library_id)],
                Some(document),
                None,
            )
            .await?,
        )
    }

    async fn get_document(&self, library_id: &str, document_id: &str) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::GET,
                &format!("/documents/{document_id}"),
                &[("library_id", library_id)],
                NO_BODY,
                None,
            )
            .await?,
        )
    }

    async fn update_document(
        &self,
        library_id: &str,
        document_id: &str,
        document: &Document,
    ) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::PATCH,
                &format!("/documents/{document_id}"),
                &[("library_id", library_id)],
                Some(document),
                None,
            )
            .await?,
        )
    }

    async fn delete_document(&self, library_id: &str, document_id: &str) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::DELETE,
                &format!("/documents/{document_id}"),
                &[("library_id", library_id)],
                NO_BODY,
                None,
            )
            .await?,
        )
    }

    async fn add_chunk(
        &self,
        library_id: &str,
        document_id: &str,
        chunk: &Chunk,
    ) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::POST,
                "/chunks/",
                &[("library_id", library_id), ("document_id", document_id)],
                Some(chunk),
                None,
            )
            .await?,
        )
    }

    async fn get_chunk(&self, chunk_id: &str) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::GET,
                &format!("/chunks/{chunk_id}"),
                &[],
                NO_BODY,
                None,
            )
            .await?,
        )
    }

    async fn update_chunk(&self, chunk_id: &str, chunk: &Chunk) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::PATCH,
                &format!("/chunks/{chunk_id}"),
                &[],
                Some(chunk),
                None,
            )
            .await?,
        )
    }

    async fn delete_chunk(&self, chunk_id: &str) -> Result<JsonObject> {
        object_body(
            self.request(
                Method::DELETE,
                &format!("/chunks/{chunk_id}"),
                &[],
                NO_BODY,
                None,
            )
            .await?,
        )
    }

    async fn search_all_libraries(
        &self,
        query_text: &str,
        metadata_filters: MetadataFilters,
    ) -> Result<SearchResults> {
        let request = SearchRequest {
            query_text,
            metadata_filters: &metadata_filters,
        };
        let value = self
            .request(Method::POST, "/search", &[], Some(&request), None)
            .await?;
        Ok(SearchResults(list_body(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client = VectorDbClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn chunk_endpoint_defaults_to_the_nested_template() {
        let client = VectorDbClient::new("http://localhost:8000");
        assert_eq!(client.chunk_endpoint, DEFAULT_CHUNK_ENDPOINT);

        let client = client.with_chunk_endpoint("/chunks");
        assert_eq!(client.chunk_endpoint, "/chunks");
    }

    #[test]
    fn search_request_matches_the_wire_shape() {
        let mut filters = MetadataFilters::new();
        filters.insert("name".to_string(), json!("Kevin"));

        let request = SearchRequest {
            query_text: "hello",
            metadata_filters: &filters,
        };

        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"query_text": "hello", "metadata_filters": {"name": "Kevin"}})
        );
    }

    #[test]
    fn empty_success_body_is_an_empty_mapping() {
        assert_eq!(object_body(Value::Null).unwrap(), JsonObject::new());
    }

    #[test]
    fn object_success_body_is_returned_verbatim() {
        let object = object_body(json!({"id": "lib-1", "name": "My Library"})).unwrap();
        assert_eq!(object["id"], "lib-1");
    }

    #[test]
    fn non_object_success_body_is_rejected() {
        let err = object_body(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn search_body_must_be_a_list() {
        assert_eq!(list_body(Value::Null).unwrap(), Vec::<Value>::new());
        assert_eq!(
            list_body(json!([{"score": 0.5}])).unwrap(),
            vec![json!({"score": 0.5})]
        );
        assert!(matches!(
            list_body(json!({"results": []})),
            Err(Error::InvalidResponse(_))
        ));
    }
}
