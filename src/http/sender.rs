use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use crate::config::Config;
use crate::{Error, Result};

/// Header carrying the project key on every request.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Request body variants understood by [`RequestSender`].
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// Query string and body of a single request.
///
/// `params` is a serialized struct whose fields become query pairs, so unset
/// options skipped by serde never reach the URL.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(&'static str, String)>,
    pub params: Option<serde_json::Value>,
    pub body: Body,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    pub fn params<S: Serialize + ?Sized>(mut self, params: &S) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn bytes(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Bytes(body);
        self
    }
}

/// Sends authenticated requests below one service URL.
///
/// Every verb helper funnels into the same request path. There is no retry,
/// backoff or timeout beyond what the underlying [`Client`] does by default.
#[derive(Debug, Clone)]
pub struct RequestSender {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl RequestSender {
    /// Builds a sender for the base or drive `name`, expanding `template`
    /// with the project id from `config`.
    pub fn new(http: Client, config: &Config, template: &str, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::InvalidConfig(format!("invalid base or drive name {:?}", name)));
        }
        let base_url = Url::parse(&config.render(template, name))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!("{} cannot be used as a base URL", base_url)));
        }
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key().to_string(),
        })
    }

    /// The service URL all request paths are relative to.
    pub fn url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get(&self, path: &[&str], options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, path, options).await
    }

    pub async fn put(&self, path: &[&str], options: RequestOptions) -> Result<Response> {
        self.request(Method::PUT, path, options).await
    }

    pub async fn post(&self, path: &[&str], options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, path, options).await
    }

    pub async fn patch(&self, path: &[&str], options: RequestOptions) -> Result<Response> {
        self.request(Method::PATCH, path, options).await
    }

    pub async fn delete(&self, path: &[&str], options: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, path, options).await
    }

    fn endpoint(&self, path: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    async fn request(&self, method: Method, path: &[&str], options: RequestOptions) -> Result<Response> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url);

        let mut req = self.http.request(method, url).header(API_KEY_HEADER, &self.api_key);
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        if let Some(params) = &options.params {
            req = req.query(params);
        }
        req = match options.body {
            Body::Empty => req,
            Body::Json(value) => req.json(&value),
            Body::Bytes(data) => req.header(CONTENT_TYPE, "application/octet-stream").body(data),
        };

        Ok(req.send().await?)
    }
}

/// Turns a non-success response into [`Error::Status`].
pub(crate) async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status { status, body })
}

/// Checks the status and decodes a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let resp = ensure_success(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
