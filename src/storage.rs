use std::sync::Arc;
use bytes::Bytes;
use log::{debug, warn};
use crate::http::types::{DeleteFilesResponse, ListFilesRequest, ListFilesResponse};
use crate::{Error, FileApi, Result};

/// Largest file accepted by [`Storage::upload_small_file`] (decimal megabytes).
pub const MAX_SMALL_FILE_SIZE: usize = 10_000_000;
/// Size of each part sent by [`Storage::upload_file`].
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;
/// Largest number of names the service deletes in one request.
pub const MAX_DELETE_NAMES: usize = 1000;

/// A file to upload: its name, an optional directory and its contents.
#[derive(Debug, Clone, Default)]
pub struct UploadFile {
    pub name: String,
    pub directory: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), directory: String::new(), data }
    }

    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }
}

/// File operations on one drive.
#[derive(Clone)]
pub struct Storage {
    api: Arc<dyn FileApi>,
}

impl Storage {
    pub fn new(api: Arc<dyn FileApi>) -> Self {
        Self { api }
    }

    /// Uploads a file of at most 10,000,000 bytes in a single request and
    /// returns its full name.
    pub async fn upload_small_file(&self, file: UploadFile) -> Result<String> {
        let full = full_name(&file.name, &file.directory)?;
        if file.data.len() > MAX_SMALL_FILE_SIZE {
            return Err(Error::FileTooLarge { size: file.data.len(), max: MAX_SMALL_FILE_SIZE });
        }
        self.api.put_file(&full, file.data).await?;
        Ok(full)
    }

    /// Uploads a file of any size through the chunked upload protocol and
    /// returns its full name.
    ///
    /// The data is sent in 5 MiB parts numbered from 1. If a part or the
    /// completion fails, the upload is aborted and the original error returned.
    pub async fn upload_file(&self, file: UploadFile) -> Result<String> {
        let full = full_name(&file.name, &file.directory)?;
        let upload_id = self.api.initialize_chunked_upload(&full).await?;

        match self.upload_parts(&upload_id, &full, &file.data).await {
            Ok(()) => Ok(full),
            Err(e) => {
                warn!("Chunked upload {} of {} failed, aborting: {}", upload_id, full, e);
                if let Err(abort_err) = self.api.abort_chunked_upload(&upload_id, &full).await {
                    warn!("Failed to abort upload {}: {}", upload_id, abort_err);
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(&self, upload_id: &str, name: &str, data: &[u8]) -> Result<()> {
        for (index, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            debug!("Uploading part {} of {} ({} bytes)", index + 1, name, chunk.len());
            self.api.upload_chunked_part(upload_id, name, chunk.to_vec(), index + 1).await?;
        }
        self.api.complete_chunked_upload(upload_id, name).await
    }

    /// Downloads a file, or returns `None` if it does not exist.
    pub async fn get_file(&self, name: &str) -> Result<Option<Bytes>> {
        self.api.download_file(name).await
    }

    /// Lists one page of file names.
    pub async fn list_files(&self, req: &ListFilesRequest) -> Result<Vec<String>> {
        Ok(self.api.list_files(req).await?.names)
    }

    /// Lists one page of file names together with the paging information.
    pub async fn list_files_with_paging(&self, req: &ListFilesRequest) -> Result<ListFilesResponse> {
        self.api.list_files(req).await
    }

    /// Lists every file name under `prefix`, following all pages.
    pub async fn list_all_files(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut req = ListFilesRequest { prefix: prefix.map(str::to_string), ..Default::default() };
        let mut names = Vec::new();
        loop {
            let resp = self.api.list_files(&req).await?;
            names.extend(resp.names);
            match resp.paging.last {
                Some(last) => req.last = Some(last),
                None => return Ok(names),
            }
        }
    }

    /// Deletes files and returns the names that were deleted.
    pub async fn delete_files<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        Ok(self.delete_files_detailed(names).await?.deleted)
    }

    /// Deletes files and returns both the deleted names and the failures.
    pub async fn delete_files_detailed<S: AsRef<str>>(&self, names: &[S]) -> Result<DeleteFilesResponse> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let mut out = DeleteFilesResponse::default();
        for chunk in names.chunks(MAX_DELETE_NAMES) {
            let resp = self.api.delete_files(chunk).await?;
            out.deleted.extend(resp.deleted);
            out.failed.extend(resp.failed);
        }
        if !out.failed.is_empty() {
            warn!("{} files could not be deleted", out.failed.len());
        }
        Ok(out)
    }
}

/// Joins `directory` and `name` into the name stored in the drive.
///
/// `name` may not contain `/` or `\`. A leading `/` on the directory is
/// dropped and the directory is normalized (`.` removed, `..` resolved). A
/// directory whose `..` segments climb above the drive root is rejected.
pub fn full_name(name: &str, directory: &str) -> Result<String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
        return Err(Error::InvalidFileName(name.to_string()));
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in directory.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::InvalidDirectory(directory.to_string()));
                }
            }
            s => parts.push(s),
        }
    }
    parts.push(name);
    Ok(parts.join("/"))
}
