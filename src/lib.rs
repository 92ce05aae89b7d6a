//! Detantic is a typed, validation-aware client for Deta Base and Deta Drive.
//!
//! Records are plain serde types that declare a validation [`Schema`]; every
//! write or query is checked client-side before any request leaves the
//! process. Files are uploaded directly or through the chunked upload
//! protocol, depending on their size.
//!
//! ## Core Components
//! - [`model`]: The record handle ([`Model`]) and its validation rules.
//! - [`storage`]: The file handle ([`Storage`]).
//! - [`http`]: Request translation for the Base and Drive REST APIs.
//! - [`client`]: The [`Detantic`] entry point that hands out models and storages.

pub mod client;
pub mod config;
pub mod http;
pub mod keys;
pub mod model;
pub mod storage;

pub use client::{new, Detantic};
pub use config::Config;
pub use http::types::{
    DeleteFilesResponse, ListFilesRequest, ListFilesResponse, Paging, PutResponse, QueryRequest,
    QueryResponse, UpdateRequest, UpdateResponse,
};
pub use http::{BaseHttp, DriveHttp, RequestSender};
pub use model::validate::{Constraint, FieldError, ItemErrors, ValidationErrors};
pub use model::{Model, Record, Schema};
pub use storage::{Storage, UploadFile};

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// A record as a JSON object, in its client-facing shape (identifier under `id`).
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Errors returned by Detantic.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more fields failed client-side validation. No request was sent.
    #[error("invalid query: {0}")]
    Validation(ValidationErrors),
    /// An item with the same key already exists in the base.
    #[error("a key already exists: {0}")]
    DuplicateKey(String),
    /// Some calls of a batch operation failed. Calls that succeeded are not rolled back.
    #[error("{0}")]
    Batch(BatchError),
    /// No API key was given and `DETA_PROJECT_KEY` is not set.
    #[error("key not defined")]
    MissingApiKey,
    /// The client only runs server side.
    #[error("cannot run on browser")]
    UnsupportedEnvironment,
    /// The configuration could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A file name contained a path separator or was otherwise unusable.
    #[error("invalid file name {0:?}: file names must not contain slashes")]
    InvalidFileName(String),
    /// A directory climbed above the drive root with `..`.
    #[error("invalid directory {0:?}: it leaves the drive root")]
    InvalidDirectory(String),
    /// A file was too large for the direct upload endpoint.
    #[error("a file must not be larger than {max} bytes (got {size})")]
    FileTooLarge { size: usize, max: usize },
    /// The service answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    /// The HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A URL could not be built from the configured template.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for Detantic operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a batch operation in which at least one call failed.
#[derive(Debug)]
pub struct BatchError {
    /// Keys whose calls took effect.
    pub succeeded: Vec<String>,
    /// Keys whose calls failed, with the error each one produced.
    pub failed: Vec<(String, Error)>,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.succeeded.len() + self.failed.len();
        write!(f, "{} of {} batch operations failed", self.failed.len(), total)?;
        if let Some((key, err)) = self.failed.first() {
            write!(f, " (first: {}: {})", key, err)?;
        }
        Ok(())
    }
}

/// Read operations against a base.
#[async_trait]
pub trait ItemReader: Send + Sync {
    /// Runs a query. Items come back with their identifier under `id`.
    async fn query_items(&self, req: &QueryRequest) -> Result<QueryResponse>;
    /// Fetches a single item, or `None` if the key does not exist.
    async fn get_item(&self, key: &str) -> Result<Option<Item>>;
}

/// Write operations against a base.
#[async_trait]
pub trait ItemWriter: Send + Sync {
    /// Creates an item, failing with [`Error::DuplicateKey`] if its key is taken.
    async fn insert_item(&self, item: &Item) -> Result<Item>;
    /// Stores several items at once, overwriting existing keys.
    async fn put_items(&self, items: &[Item]) -> Result<PutResponse>;
    /// Applies an update to an item, or returns `None` if the key does not exist.
    async fn update_item(&self, key: &str, update: &UpdateRequest) -> Result<Option<UpdateResponse>>;
    /// Deletes an item. Deleting a missing key is not an error.
    async fn delete_item(&self, key: &str) -> Result<()>;
}

/// The full set of base operations a [`Model`] needs.
pub trait ItemApi: ItemReader + ItemWriter {}

impl<T: ItemReader + ItemWriter> ItemApi for T {}

/// Operations against a drive.
#[async_trait]
pub trait FileApi: Send + Sync {
    /// Uploads a whole file in one request.
    async fn put_file(&self, name: &str, data: Vec<u8>) -> Result<()>;
    /// Opens a chunked upload and returns its upload id.
    async fn initialize_chunked_upload(&self, name: &str) -> Result<String>;
    /// Uploads one part of a chunked upload. Parts are numbered from 1.
    async fn upload_chunked_part(&self, upload_id: &str, name: &str, data: Vec<u8>, part: usize) -> Result<()>;
    /// Finishes a chunked upload.
    async fn complete_chunked_upload(&self, upload_id: &str, name: &str) -> Result<()>;
    /// Abandons a chunked upload.
    async fn abort_chunked_upload(&self, upload_id: &str, name: &str) -> Result<()>;
    /// Downloads a file, or returns `None` if it does not exist.
    async fn download_file(&self, name: &str) -> Result<Option<Bytes>>;
    /// Lists one page of file names.
    async fn list_files(&self, req: &ListFilesRequest) -> Result<ListFilesResponse>;
    /// Deletes files by name.
    async fn delete_files(&self, names: &[String]) -> Result<DeleteFilesResponse>;
}
