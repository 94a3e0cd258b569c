pub mod api;
pub mod client;
pub mod error;

pub use api::{
    Chunk, ChunkMetadata, Document, DocumentMetadata, JsonObject, Library, LibraryMetadata,
    MetadataFilters, SearchResults, VectorDbApi, EMBEDDING_DIM,
};
pub use client::{VectorDbClient, DEFAULT_CHUNK_ENDPOINT};
pub use error::{ApiError, Error, ErrorDetail, FieldError, Result};
