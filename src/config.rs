use std::env;
use crate::{Error, Result};

/// Environment variable holding the project key.
pub const PROJECT_KEY_ENV: &str = "DETA_PROJECT_KEY";
/// Environment variable overriding the Base URL template.
pub const DATABASE_URL_ENV: &str = "DETANTIC_DATABASE_URL";
/// Environment variable overriding the Drive URL template.
pub const DRIVE_URL_ENV: &str = "DETANTIC_DRIVE_URL";

pub const DEFAULT_DATABASE_URL: &str = "https://database.deta.sh/v1/{project}/{name}";
pub const DEFAULT_DRIVE_URL: &str = "https://drive.deta.sh/v1/{project}/{name}";

/// Connection settings shared by every model and storage.
///
/// URL templates contain a `{project}` placeholder, replaced by the project id,
/// and a `{name}` placeholder, replaced by the base or drive name.
#[derive(Debug, Clone)]
pub struct Config {
    api_key: String,
    project_id: String,
    database_url: String,
    drive_url: String,
}

impl Config {
    /// Creates a configuration from a project key.
    ///
    /// The project id is the part of the key before its first underscore.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        let project_id = api_key.split('_').next().unwrap_or_default().to_string();
        if project_id.is_empty() {
            return Err(Error::InvalidConfig("project key has an empty project id".to_string()));
        }

        Ok(Self {
            api_key,
            project_id,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            drive_url: DEFAULT_DRIVE_URL.to_string(),
        })
    }

    /// Loads the configuration from the environment.
    ///
    /// `DETA_PROJECT_KEY` is required. `DETANTIC_DATABASE_URL` and
    /// `DETANTIC_DRIVE_URL` optionally replace the URL templates.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Like [`Config::from_env`], but an explicit, non-blank `project_key`
    /// takes precedence over `DETA_PROJECT_KEY`.
    pub fn load(project_key: Option<&str>) -> Result<Self> {
        let key = match project_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => key.to_string(),
            None => env::var(PROJECT_KEY_ENV).unwrap_or_default(),
        };
        let mut config = Self::new(key)?;

        if let Ok(url) = env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                log::info!("Using Base URL template {}", url);
                config = config.with_database_url(url)?;
            }
        }
        if let Ok(url) = env::var(DRIVE_URL_ENV) {
            if !url.is_empty() {
                log::info!("Using Drive URL template {}", url);
                config = config.with_drive_url(url)?;
            }
        }
        Ok(config)
    }

    /// Replaces the Base URL template.
    pub fn with_database_url(mut self, template: impl Into<String>) -> Result<Self> {
        self.database_url = check_template(template.into())?;
        Ok(self)
    }

    /// Replaces the Drive URL template.
    pub fn with_drive_url(mut self, template: impl Into<String>) -> Result<Self> {
        self.drive_url = check_template(template.into())?;
        Ok(self)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn drive_url(&self) -> &str {
        &self.drive_url
    }

    /// Expands a URL template for the given base or drive name.
    pub fn render(&self, template: &str, name: &str) -> String {
        template
            .replace("{project}", &self.project_id)
            .replace("{name}", name)
            .trim_end_matches('/')
            .to_string()
    }
}

fn check_template(template: String) -> Result<String> {
    if !template.contains("{name}") {
        return Err(Error::InvalidConfig(format!(
            "URL template {:?} is missing the {{name}} placeholder",
            template
        )));
    }
    Ok(template)
}
