use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use crate::config::Config;
use crate::http::sender::{ensure_success, read_json, RequestOptions, RequestSender};
use crate::http::types::{PutResponse, QueryRequest, QueryResponse, UpdateRequest, UpdateResponse};
use crate::keys::{id_to_key, key_to_id};
use crate::{Error, Item, ItemReader, ItemWriter, Result};

/// Maximum number of items the service accepts in one `PUT /items`.
pub const MAX_PUT_ITEMS: usize = 25;

/// Request translation for one Deta Base.
///
/// Items are renamed `id` -> `key` on the way out and `key` -> `id` on the way
/// back, so callers only ever see the client-facing shape.
#[derive(Debug, Clone)]
pub struct BaseHttp {
    sender: RequestSender,
}

impl BaseHttp {
    pub fn new(http: Client, config: &Config, base: &str) -> Result<Self> {
        Ok(Self {
            sender: RequestSender::new(http, config, config.database_url(), base)?,
        })
    }

    pub fn sender(&self) -> &RequestSender {
        &self.sender
    }
}

#[async_trait]
impl ItemReader for BaseHttp {
    async fn query_items(&self, req: &QueryRequest) -> Result<QueryResponse> {
        let wire = QueryRequest {
            query: req.query.iter().map(id_to_key).collect(),
            limit: req.limit,
            last: req.last.clone(),
        };
        let resp = self
            .sender
            .post(&["query"], RequestOptions::new().json(serde_json::to_value(&wire)?))
            .await?;
        let mut out: QueryResponse = read_json(resp).await?;
        out.items = out.items.iter().map(key_to_id).collect();
        Ok(out)
    }

    async fn get_item(&self, key: &str) -> Result<Option<Item>> {
        let resp = self.sender.get(&["items", key], RequestOptions::new()).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let item: Item = read_json(resp).await?;
        Ok(Some(key_to_id(&item)))
    }
}

#[async_trait]
impl ItemWriter for BaseHttp {
    async fn insert_item(&self, item: &Item) -> Result<Item> {
        let wire = id_to_key(item);
        let resp = self
            .sender
            .post(&["items"], RequestOptions::new().json(json!({ "item": wire })))
            .await?;
        if resp.status() == StatusCode::CONFLICT {
            let key = item.get("id").and_then(|v| v.as_str()).unwrap_or_default();
            return Err(Error::DuplicateKey(key.to_string()));
        }
        let created: Item = read_json(resp).await?;
        Ok(key_to_id(&created))
    }

    async fn put_items(&self, items: &[Item]) -> Result<PutResponse> {
        if items.len() > MAX_PUT_ITEMS {
            return Err(Error::Internal(format!(
                "cannot put {} items in one request (max {})",
                items.len(),
                MAX_PUT_ITEMS
            )));
        }
        let wire: Vec<Item> = items.iter().map(id_to_key).collect();
        let resp = self
            .sender
            .put(&["items"], RequestOptions::new().json(json!({ "items": wire })))
            .await?;
        let mut out: PutResponse = read_json(resp).await?;
        out.processed.items = out.processed.items.iter().map(key_to_id).collect();
        out.failed.items = out.failed.items.iter().map(key_to_id).collect();
        Ok(out)
    }

    async fn update_item(&self, key: &str, update: &UpdateRequest) -> Result<Option<UpdateResponse>> {
        let resp = self
            .sender
            .patch(&["items", key], RequestOptions::new().json(serde_json::to_value(update)?))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(read_json(resp).await?))
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        let resp = self.sender.delete(&["items", key], RequestOptions::new()).await?;
        ensure_success(resp).await?;
        Ok(())
    }
}
