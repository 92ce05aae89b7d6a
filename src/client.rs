use std::sync::Arc;
use crate::config::Config;
use crate::http::{BaseHttp, DriveHttp};
use crate::model::{Model, Record};
use crate::storage::Storage;
use crate::{Error, Result};

/// Entry point that hands out [`Model`]s and [`Storage`]s for one project.
///
/// All handles created from the same `Detantic` share one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct Detantic {
    config: Config,
    http: reqwest::Client,
}

impl Detantic {
    pub fn new(config: Config) -> Result<Self> {
        if cfg!(target_arch = "wasm32") {
            return Err(Error::UnsupportedEnvironment);
        }
        Ok(Self {
            config,
            http: reqwest::Client::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a record handle for the base `base`.
    pub fn model<T: Record>(&self, base: &str) -> Result<Model<T>> {
        Ok(Model::new(Arc::new(self.base(base)?)))
    }

    /// Creates a file handle for the drive `drive`.
    pub fn storage(&self, drive: &str) -> Result<Storage> {
        Ok(Storage::new(Arc::new(self.drive(drive)?)))
    }

    /// Untyped, unvalidated access to the base `base`.
    pub fn base(&self, base: &str) -> Result<BaseHttp> {
        BaseHttp::new(self.http.clone(), &self.config, base)
    }

    /// Raw access to the drive `drive`.
    pub fn drive(&self, drive: &str) -> Result<DriveHttp> {
        DriveHttp::new(self.http.clone(), &self.config, drive)
    }
}

/// Initializes a [`Detantic`] instance.
///
/// The project key is taken from `project_key` if given, otherwise from the
/// `DETA_PROJECT_KEY` environment variable. URL templates can be overridden
/// through `DETANTIC_DATABASE_URL` and `DETANTIC_DRIVE_URL`.
///
/// # Examples
///
/// ```no_run
/// use detantic::{Record, UploadFile};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     #[serde(default)]
///     id: String,
///     text: String,
/// }
///
/// impl Record for Note {}
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let deta = detantic::new(None)?;
///     let notes = deta.model::<Note>("notes")?;
///     let note = notes.insert(&Note { id: String::new(), text: "hi".into() }, None).await?;
///     let same = notes.find_one(&json!({ "text": "hi" })).await?;
///
///     let files = deta.storage("attachments")?;
///     files.upload_file(UploadFile::new("hello.txt", b"hello".to_vec())).await?;
///     Ok(())
/// }
/// ```
pub fn new(project_key: Option<&str>) -> Result<Detantic> {
    Detantic::new(Config::load(project_key)?)
}
