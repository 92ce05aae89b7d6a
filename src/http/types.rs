//! Request and response bodies of the Base and Drive REST APIs.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::Item;

/// Paging information returned with queries and file listings.
///
/// `last` is present only when more results are available.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Paging {
    #[serde(default)]
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

/// Body of `POST /query`. Each object in `query` is an AND of conditions;
/// the objects themselves are OR'd together by the service.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    #[serde(default)]
    pub paging: Paging,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ItemList {
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Body of a `PUT /items` response.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PutResponse {
    #[serde(default)]
    pub processed: ItemList,
    #[serde(default)]
    pub failed: ItemList,
}

/// Body of `PATCH /items/{key}`.
///
/// Empty sections are left out of the request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "Item::is_empty")]
    pub set: Item,
    #[serde(default, skip_serializing_if = "Item::is_empty")]
    pub increment: Item,
    #[serde(default, skip_serializing_if = "Item::is_empty")]
    pub append: Item,
    #[serde(default, skip_serializing_if = "Item::is_empty")]
    pub prepend: Item,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
}

impl UpdateRequest {
    pub fn set(set: Item) -> Self {
        Self { set, ..Default::default() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateResponse {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Item>,
    #[serde(default)]
    pub delete: Vec<String>,
}

/// Query string of `GET /files`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ListFilesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ListFilesResponse {
    #[serde(default)]
    pub paging: Paging,
    #[serde(default)]
    pub names: Vec<String>,
}

/// Body of a `DELETE /files` response. `failed` maps file names to the reason.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DeleteFilesResponse {
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub failed: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct UploadSession {
    pub upload_id: String,
}
