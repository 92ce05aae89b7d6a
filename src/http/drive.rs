use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde_json::json;
use crate::config::Config;
use crate::http::sender::{ensure_success, read_json, RequestOptions, RequestSender};
use crate::http::types::{DeleteFilesResponse, ListFilesRequest, ListFilesResponse, UploadSession};
use crate::{FileApi, Result};

/// Request translation for one Deta Drive.
#[derive(Debug, Clone)]
pub struct DriveHttp {
    sender: RequestSender,
}

impl DriveHttp {
    pub fn new(http: Client, config: &Config, drive: &str) -> Result<Self> {
        Ok(Self {
            sender: RequestSender::new(http, config, config.drive_url(), drive)?,
        })
    }

    pub fn sender(&self) -> &RequestSender {
        &self.sender
    }
}

#[async_trait]
impl FileApi for DriveHttp {
    async fn put_file(&self, name: &str, data: Vec<u8>) -> Result<()> {
        let resp = self
            .sender
            .post(&["files"], RequestOptions::new().query("name", name).bytes(data))
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn initialize_chunked_upload(&self, name: &str) -> Result<String> {
        let resp = self
            .sender
            .post(&["uploads"], RequestOptions::new().query("name", name))
            .await?;
        let session: UploadSession = read_json(resp).await?;
        Ok(session.upload_id)
    }

    async fn upload_chunked_part(&self, upload_id: &str, name: &str, data: Vec<u8>, part: usize) -> Result<()> {
        let resp = self
            .sender
            .post(
                &["uploads", upload_id, "parts"],
                RequestOptions::new().query("name", name).query("part", part).bytes(data),
            )
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn complete_chunked_upload(&self, upload_id: &str, name: &str) -> Result<()> {
        let resp = self
            .sender
            .patch(&["uploads", upload_id], RequestOptions::new().query("name", name))
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn abort_chunked_upload(&self, upload_id: &str, name: &str) -> Result<()> {
        let resp = self
            .sender
            .delete(&["uploads", upload_id], RequestOptions::new().query("name", name))
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn download_file(&self, name: &str) -> Result<Option<Bytes>> {
        let resp = self
            .sender
            .get(&["files", "download"], RequestOptions::new().query("name", name))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        Ok(Some(resp.bytes().await?))
    }

    async fn list_files(&self, req: &ListFilesRequest) -> Result<ListFilesResponse> {
        let resp = self.sender.get(&["files"], RequestOptions::new().params(req)?).await?;
        read_json(resp).await
    }

    async fn delete_files(&self, names: &[String]) -> Result<DeleteFilesResponse> {
        let resp = self
            .sender
            .delete(&["files"], RequestOptions::new().json(json!({ "names": names })))
            .await?;
        read_json(resp).await
    }
}
