//! Configuration file handling for TracPro.
//!
//! The configuration file is stored at `$TRACPRO_HOME/config.json`. Next to it live the Google
//! OAuth client credentials (`.secrets/client_secret.json`) and the local cache (`cache.json`).

use crate::api::SecretFile;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{cache, utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "tracpro";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const CONFIG_JSON: &str = "config.json";

/// The title given to spreadsheets created by TracPro unless another is requested.
pub const DEFAULT_SHEET_TITLE: &str = "TracPro_Expenses";

/// How many expenses "recent expenses" shows unless another limit is requested.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Overrides the client id found in `client_secret.json`.
pub const CLIENT_ID_ENV: &str = "TRACPRO_GOOGLE_CLIENT_ID";

/// Client ids that were copied from a template and never filled in.
const PLACEHOLDER_CLIENT_IDS: &[&str] = &["your_google_client_id", "your_client_id"];

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$TRACPRO_HOME` and from there it loads `$TRACPRO_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
///
/// Loading never fails because of a bad client id. Instead the problem is recorded in
/// `startup_error` so that everything that does not need Google sign-in keeps working.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_file: ConfigFile,
    secret: Option<SecretFile>,
    client_id: Option<String>,
    startup_error: Option<String>,
}

impl Config {
    /// Creates the home directory, its subdirectories and:
    /// - Creates an initial `config.json` file with default settings
    /// - Copies `secret_file` into its default location in the home directory.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g. `$HOME/tracpro`
    /// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
    ///   OAuth workflow.
    pub async fn create(dir: impl Into<PathBuf>, secret_file: &Path) -> Result<Self> {
        Self::create_inner(dir.into(), secret_file)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf, secret_file: &Path) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the tracpro home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        // Validate before copying so that a bad file is not left behind.
        let _ = SecretFile::load(secret_file).await?;
        let secret_destination = secrets_dir.join(CLIENT_SECRET_JSON);
        utils::copy(secret_file, &secret_destination).await?;
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&secret_destination, Permissions::from_mode(0o600))
                .await
                .context("Failed to set permissions on the client secret file")?;
        }

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        Self::load_inner(root).await
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load the config file
    /// - load the client credentials, recording rather than failing on a missing client id
    pub async fn load(tracpro_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(tracpro_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("TracPro home is missing, run 'tracpro init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let mut config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_file,
            secret: None,
            client_id: None,
            startup_error: None,
        };

        let secret_path = config.client_secret_path();
        config.secret = match SecretFile::load(&secret_path).await {
            Ok(secret) => Some(secret),
            Err(e) => {
                debug!("No usable client secret at {}: {e:#}", secret_path.display());
                None
            }
        };
        let env_client_id = std::env::var(CLIENT_ID_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty());
        config.client_id =
            env_client_id.or_else(|| config.secret.as_ref().map(|s| s.client_id().to_string()));
        config.startup_error = check_client_id(config.client_id.as_deref());
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn default_sheet_title(&self) -> &str {
        &self.config_file.default_sheet_title
    }

    pub fn recent_limit(&self) -> usize {
        self.config_file.recent_limit
    }

    /// The Google OAuth client id, from `TRACPRO_GOOGLE_CLIENT_ID` or the client secret file.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// A problem with the client configuration that will prevent sign-in.
    pub fn startup_error(&self) -> Option<&str> {
        self.startup_error.as_deref()
    }

    pub(crate) fn secret(&self) -> Option<&SecretFile> {
        self.secret.as_ref()
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve_path(self.config_file.client_secret_path())
    }

    /// Returns the stored `cache_path` if it is absolute, otherwise resolves the relative path.
    pub fn cache_path(&self) -> PathBuf {
        self.resolve_path(self.config_file.cache_path())
    }

    fn resolve_path(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Returns a message if `client_id` is missing or is a template placeholder.
fn check_client_id(client_id: Option<&str>) -> Option<String> {
    let id = client_id.map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return Some(format!(
            "No Google client id is configured. Put your OAuth client credentials in \
            $TRACPRO_HOME/{SECRETS}/{CLIENT_SECRET_JSON} or set {CLIENT_ID_ENV}"
        ));
    }
    let lower = id.to_lowercase();
    if PLACEHOLDER_CLIENT_IDS.iter().any(|p| lower.contains(p)) {
        return Some(format!(
            "The Google client id '{id}' is a placeholder. Replace it with your OAuth client id"
        ));
    }
    None
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "tracpro",
///   "config_version": 1,
///   "default_sheet_title": "TracPro_Expenses",
///   "recent_limit": 10,
///   "client_secret_path": ".secrets/client_secret.json",
///   "cache_path": "cache.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "tracpro"
    app_name: String,

    config_version: u8,

    /// Title of spreadsheets created by `create-sheet` and `connect`
    #[serde(default = "default_sheet_title")]
    default_sheet_title: String,

    /// Number of expenses shown by `recent`
    #[serde(default = "default_recent_limit")]
    recent_limit: usize,

    /// Path to the OAuth 2.0 client credentials file (optional, relative to config.json or absolute)
    /// Defaults to $TRACPRO_HOME/.secrets/client_secret.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Path to the local cache (optional, relative to config.json or absolute)
    /// Defaults to $TRACPRO_HOME/cache.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_path: Option<PathBuf>,
}

fn default_sheet_title() -> String {
    DEFAULT_SHEET_TITLE.to_string()
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            default_sheet_title: default_sheet_title(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            client_secret_path: None,
            cache_path: None,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| cache::default_path(Path::new("")))
    }
}

/// Extracts a spreadsheet id from either a raw id or a Google Sheets URL, e.g.
/// `https://docs.google.com/spreadsheets/d/ABC123/edit#gid=0` yields `ABC123`.
pub fn extract_spreadsheet_id(input: &str) -> Res<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("A spreadsheet id or URL is required");
    }

    match url::Url::parse(input) {
        Ok(url) => {
            // Matches both `/spreadsheets/d/<id>` and `/spreadsheets/u/0/d/<id>`.
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.collect())
                .unwrap_or_default();
            segments
                .iter()
                .position(|s| *s == "spreadsheets")
                .and_then(|start| {
                    let rest = &segments[start + 1..];
                    let d = rest.iter().position(|s| *s == "d")?;
                    rest.get(d + 1).filter(|id| !id.is_empty())
                })
                .map(|id| id.to_string())
                .with_context(|| {
                    format!(
                        "Invalid Google Sheets URL '{input}'. Expected: \
                        https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
                    )
                })
        }
        Err(_) => {
            if input
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                Ok(input.to_string())
            } else {
                bail!("'{input}' is neither a spreadsheet id nor a Google Sheets URL")
            }
        }
    }
}
