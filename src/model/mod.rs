/// Validation rule registry for record types.
pub mod schema;
/// Generic validator and validation error types.
pub mod validate;

pub use schema::{Check, FieldRules, Rule, Schema};

use std::marker::PhantomData;
use std::sync::Arc;
use futures::future::join_all;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use crate::http::base::MAX_PUT_ITEMS;
use crate::http::types::{QueryRequest, UpdateRequest};
use crate::keys::{merge, ID_FIELD};
use crate::{BatchError, Error, Item, ItemApi, Result};
use self::validate::{validate, Constraint, FieldError, ItemErrors, ValidationErrors};

/// A record type stored in a base.
///
/// Records serialize to JSON objects carrying a string `id`. The default schema
/// only checks that `id` is a non-empty string; override [`Record::schema`] to
/// add per-field rules.
///
/// ```
/// use detantic::{Record, Schema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     #[serde(default)]
///     id: String,
///     name: String,
///     age: u32,
/// }
///
/// impl Record for User {
///     fn schema() -> Schema {
///         Schema::new()
///             .field("name", |f| f.is_string().is_not_empty())
///             .field("age", |f| f.is_int().max(150.0))
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn schema() -> Schema {
        Schema::new()
    }
}

/// Typed, validating access to the records of one base.
///
/// Queries and updates accept anything that serializes to a JSON object, such
/// as a `serde_json::json!` literal or a struct of optional fields. Top-level
/// `null` fields are left out of queries and updates.
pub struct Model<T> {
    api: Arc<dyn ItemApi>,
    schema: Schema,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Model<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            schema: self.schema.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Model<T> {
    pub fn new(api: Arc<dyn ItemApi>) -> Self {
        Self {
            api,
            schema: T::schema(),
            _record: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Inserts one record under `id`, or under a fresh UUID when `id` is `None`.
    ///
    /// The record's own `id` field is always replaced. Fails with
    /// [`Error::DuplicateKey`] if the id is already taken.
    pub async fn insert(&self, record: &T, id: Option<&str>) -> Result<T> {
        let mut item = to_item(record)?;
        item.insert(ID_FIELD.to_string(), Value::String(new_id(id)));
        self.check(&item, false)?;

        let created = self.api.insert_item(&item).await?;
        from_item(created)
    }

    /// Inserts several records, each under a fresh UUID.
    ///
    /// Every record is validated before anything is sent. Records are then
    /// written in groups of up to 25, concurrently.
    pub async fn insert_many(&self, records: &[T]) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(records.len());
        let mut invalid = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let mut item = to_item(record)?;
            item.insert(ID_FIELD.to_string(), Value::String(new_id(None)));
            let errors = validate(&self.schema, &item, false);
            if !errors.is_empty() {
                invalid.push(ItemErrors { index: Some(index), errors });
            }
            items.push(item);
        }
        if !invalid.is_empty() {
            return Err(Error::Validation(ValidationErrors { items: invalid }));
        }

        let chunks: Vec<&[Item]> = items.chunks(MAX_PUT_ITEMS).collect();
        let results = join_all(chunks.iter().map(|chunk| self.api.put_items(chunk))).await;

        let mut outcomes = Vec::new();
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(resp) => {
                    for item in resp.processed.items {
                        outcomes.push((item_id(&item), Ok(item)));
                    }
                    for item in resp.failed.items {
                        let key = item_id(&item);
                        let err = Error::Internal(format!("item {} was not processed", key));
                        outcomes.push((key, Err(err)));
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    for item in chunk.iter() {
                        let err = Error::Internal(format!("put request failed: {}", reason));
                        outcomes.push((item_id(item), Err(err)));
                    }
                }
            }
        }

        settle(outcomes)?.into_iter().map(from_item).collect()
    }

    /// Finds the first record matching `query`.
    ///
    /// An empty query returns `None` without contacting the service, as does a
    /// query that matches nothing.
    pub async fn find_one<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<Option<T>> {
        let filter = to_partial(query)?;
        if filter.is_empty() {
            return Ok(None);
        }
        self.check(&filter, true)?;

        let req = QueryRequest { query: vec![filter], limit: Some(1), last: None };
        let resp = self.api.query_items(&req).await?;
        resp.items.into_iter().next().map(from_item).transpose()
    }

    /// Finds every record matching `query`, up to `limit` records when given.
    ///
    /// Result pages are followed until the service reports no more or the
    /// limit is reached. An empty query matches every record.
    pub async fn find_many<Q: Serialize + ?Sized>(&self, query: &Q, limit: Option<usize>) -> Result<Vec<T>> {
        let filter = to_partial(query)?;
        self.check(&filter, true)?;

        let items = self.query_all(filter, limit).await?;
        items.into_iter().map(from_item).collect()
    }

    /// Looks up a record by id.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        match self.api.get_item(id).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Counts the records matching `query`.
    pub async fn count<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<usize> {
        let filter = to_partial(query)?;
        self.check(&filter, true)?;
        Ok(self.query_all(filter, None).await?.len())
    }

    /// Deletes a record by id and returns it, or `None` if it did not exist.
    pub async fn delete_by_id(&self, id: &str) -> Result<Option<T>> {
        let Some(item) = self.api.get_item(id).await? else {
            return Ok(None);
        };
        self.api.delete_item(id).await?;
        Ok(Some(from_item(item)?))
    }

    /// Deletes every record matching `query` and returns the deleted records.
    pub async fn delete_many<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<Vec<T>> {
        let filter = to_partial(query)?;
        self.check(&filter, true)?;

        let items = self.query_all(filter, None).await?;
        let calls = items.into_iter().map(|item| async move {
            let key = item_id(&item);
            let res = self.api.delete_item(&key).await.map(|_| item);
            (key, res)
        });
        let outcomes = join_all(calls).await;

        settle(outcomes)?.into_iter().map(from_item).collect()
    }

    /// Sets the fields of `update` on the record `id` and returns the updated
    /// record, or `None` if it did not exist.
    pub async fn update_by_id<U: Serialize + ?Sized>(&self, update: &U, id: &str) -> Result<Option<T>> {
        let set = to_partial(update)?;
        self.check_update(&set)?;

        let Some(current) = self.api.get_item(id).await? else {
            return Ok(None);
        };
        if self.api.update_item(id, &UpdateRequest::set(set.clone())).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(from_item(merged(current, &set))?))
    }

    /// Sets the fields of `update` on every record matching `query` and returns
    /// the updated records.
    pub async fn update_many<Q, U>(&self, query: &Q, update: &U) -> Result<Vec<T>>
    where
        Q: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        let filter = to_partial(query)?;
        self.check(&filter, true)?;
        let set = to_partial(update)?;
        self.check_update(&set)?;

        let items = self.query_all(filter, None).await?;
        let req = UpdateRequest::set(set.clone());
        let calls = items.into_iter().map(|item| {
            let req = &req;
            let set = &set;
            async move {
                let key = item_id(&item);
                let res = match self.api.update_item(&key, req).await {
                    Ok(Some(_)) => Ok(merged(item, set)),
                    Ok(None) => Err(Error::Internal(format!("item {} no longer exists", key))),
                    Err(e) => Err(e),
                };
                (key, res)
            }
        });
        let outcomes = join_all(calls).await;

        settle(outcomes)?.into_iter().map(from_item).collect()
    }

    async fn query_all(&self, filter: Item, limit: Option<usize>) -> Result<Vec<Item>> {
        let limit = limit.filter(|l| *l > 0);
        let query = if filter.is_empty() { Vec::new() } else { vec![filter] };
        let mut items = Vec::new();
        let mut last = None;

        loop {
            let req = QueryRequest {
                query: query.clone(),
                limit: limit.map(|l| l - items.len()),
                last,
            };
            let resp = self.api.query_items(&req).await?;
            items.extend(resp.items);

            if let Some(l) = limit {
                if items.len() >= l {
                    items.truncate(l);
                    break;
                }
            }
            match resp.paging.last {
                Some(next) => {
                    debug!("following query page after {}", next);
                    last = Some(next);
                }
                None => break,
            }
        }
        Ok(items)
    }

    fn check(&self, item: &Item, partial: bool) -> Result<()> {
        let errors = validate(&self.schema, item, partial);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(ValidationErrors::single(errors)))
        }
    }

    fn check_update(&self, set: &Item) -> Result<()> {
        if set.contains_key(ID_FIELD) {
            return Err(Error::Validation(ValidationErrors::single(vec![FieldError {
                property: ID_FIELD.to_string(),
                constraints: vec![Constraint {
                    name: "isImmutable".to_string(),
                    message: "id cannot be updated".to_string(),
                }],
            }])));
        }
        self.check(set, true)
    }
}

fn new_id(id: Option<&str>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    }
}

fn item_id(item: &Item) -> String {
    item.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn merged(item: Item, set: &Item) -> Item {
    let mut value = Value::Object(item);
    merge(&mut value, &Value::Object(set.clone()));
    match value {
        Value::Object(item) => item,
        _ => Item::new(),
    }
}

/// Serializes a record, query or update into a JSON object. `()` and `None`
/// become an empty object.
fn to_item<S: Serialize + ?Sized>(value: &S) -> Result<Item> {
    match serde_json::to_value(value)? {
        Value::Object(item) => Ok(item),
        Value::Null => Ok(Item::new()),
        other => Err(Error::Internal(format!("expected a JSON object, got {}", other))),
    }
}

/// Like [`to_item`], but drops top-level `null` fields so that unset
/// `Option` fields of a query or update struct are left out.
fn to_partial<S: Serialize + ?Sized>(value: &S) -> Result<Item> {
    let mut item = to_item(value)?;
    item.retain(|_, v| !v.is_null());
    Ok(item)
}

fn from_item<T: DeserializeOwned>(item: Item) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}

/// Collects per-key outcomes of a batch. Succeeds only if every call did.
fn settle<R>(outcomes: Vec<(String, Result<R>)>) -> Result<Vec<R>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for (key, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                succeeded.push(key);
                values.push(value);
            }
            Err(e) => failed.push((key, e)),
        }
    }

    if failed.is_empty() {
        return Ok(values);
    }
    warn!("{} of {} batch operations failed", failed.len(), succeeded.len() + failed.len());
    Err(Error::Batch(BatchError { succeeded, failed }))
}
