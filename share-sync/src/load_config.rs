/// `load_config` module: reads the settings file and maps it into [`Settings`].
///
/// Two on-disk formats are accepted, selected by file extension:
/// - `.json`, `.yaml`, `.yml`: a structured document (see [`StructuredConfigSource`]),
///   compatible with the `appsettings.json` layout (`NextCloud`, `Database`, `Logging`).
/// - anything else: the legacy line format, one `key: value` per line in a fixed
///   order (see [`LineConfigSource`]).
///
/// A missing file is not an error: a placeholder is written and
/// [`ConfigLoad::Bootstrapped`] is returned so the caller can stop without
/// touching any files.
///
/// # Errors
/// Everything wrong with an existing file is a [`ConfigError`]; the CLI wraps it
/// with `anyhow` context.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use share_sync_core::config::ServerSettings;
use thiserror::Error;
use tracing::{error, info};

use crate::client::SharePayload;
use crate::logging::LoggingConfig;
use crate::recorder::DatabaseConfig;

/// Environment variable that overrides the configured password.
pub const PASSWORD_ENV: &str = "SHARE_SYNC_PASSWORD";

/// Key order of the line format.
pub const LINE_KEYS: [&str; 7] = [
    "hostname",
    "port",
    "username",
    "password",
    "rootPath",
    "uploadFolder",
    "OCSEndPoint",
];

const YAML_PLACEHOLDER: &str = "\
# share-sync settings. Fill in every NextCloud key and run again.
# NextCloud:
#   Hostname: cloud.example.com
#   Port: 443
#   Username: alice
#   Password: secret
#   RootPath: /remote.php/dav/files/alice/
#   UploadFolder: Uploads
#   OCSEndPoint: /ocs/v2.php/apps/files_sharing/api/v1/
# Database:
#   Url: sqlite://links.db
#   Table: JOB_BUNDLES
#   LinkColumn: DOWNLOAD_LINK
#   FileNameColumn: FILENAME
# Logging:
#   Level: info
#   File: logs/share-sync.log
# SharePayload: json
";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create placeholder config file {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("line {line}: expected `key: value`")]
    MalformedLine { line: usize },

    #[error("line {line}: expected key `{expected}`, found `{found}`")]
    UnexpectedKey {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("line {line}: unexpected trailing content after the last key")]
    TrailingContent { line: usize },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Everything the CLI needs for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "NextCloud")]
    pub server: ServerSettings,
    #[serde(rename = "Database", default)]
    pub database: Option<DatabaseConfig>,
    #[serde(rename = "Logging", default)]
    pub logging: LoggingConfig,
    #[serde(rename = "SharePayload", default)]
    pub share_payload: SharePayload,
}

impl Settings {
    fn from_server(server: ServerSettings) -> Self {
        Settings {
            server,
            database: None,
            logging: LoggingConfig::default(),
            share_payload: SharePayload::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.hostname.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "hostname",
                reason: "must not be empty".to_string(),
            });
        }
        if self.server.upload_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "uploadFolder",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(database) = &self.database {
            database
                .validate()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: "Database",
                    reason,
                })?;
        }
        Ok(())
    }
}

/// Result of asking a source for settings.
#[derive(Debug)]
pub enum ConfigLoad {
    Loaded(Settings),
    /// No settings existed; a placeholder was written at this path.
    Bootstrapped(PathBuf),
}

/// A place settings come from.
pub trait ConfigSource {
    fn path(&self) -> &Path;

    fn load(&self) -> Result<ConfigLoad, ConfigError>;
}

/// Picks the source matching the file extension.
pub fn config_source_for(path: &Path) -> Box<dyn ConfigSource> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") | Some("yaml") | Some("yml") => {
            Box::new(StructuredConfigSource::new(path.to_path_buf()))
        }
        _ => Box::new(LineConfigSource::new(path.to_path_buf())),
    }
}

/// Loads settings from `path`, bootstrapping a placeholder when it is missing,
/// and applies the password override from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConfigLoad, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let source = config_source_for(path_ref);
    match source.load()? {
        ConfigLoad::Loaded(mut settings) => {
            if let Ok(password) = env::var(PASSWORD_ENV) {
                info!(var = PASSWORD_ENV, "Password taken from environment");
                settings.server.password = password;
            }
            info!(
                hostname = %settings.server.hostname,
                port = settings.server.port,
                upload_dir = %settings.server.upload_dir,
                database = settings.database.is_some(),
                "Config loaded successfully"
            );
            Ok(ConfigLoad::Loaded(settings))
        }
        bootstrapped => Ok(bootstrapped),
    }
}

/// JSON or YAML document with `NextCloud`, `Database`, `Logging` sections.
pub struct StructuredConfigSource {
    path: PathBuf,
}

impl StructuredConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn placeholder(&self) -> &'static str {
        // JSON has no comments, so a JSON placeholder stays empty.
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => "",
            _ => YAML_PLACEHOLDER,
        }
    }
}

impl ConfigSource for StructuredConfigSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ConfigLoad, ConfigError> {
        let Some(content) = read_or_bootstrap(&self.path, self.placeholder())? else {
            return Ok(ConfigLoad::Bootstrapped(self.path.clone()));
        };

        let settings: Settings = match serde_yaml::from_str(&content) {
            Ok(settings) => {
                info!(config_path = ?self.path, "Parsed structured config successfully");
                settings
            }
            Err(e) => {
                error!(error = ?e, config_path = ?self.path, "Failed to parse structured config");
                return Err(ConfigError::Parse {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        settings.validate()?;
        Ok(ConfigLoad::Loaded(settings))
    }
}

/// Legacy text format: `key: value` lines in the order of [`LINE_KEYS`].
pub struct LineConfigSource {
    path: PathBuf,
}

impl LineConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn placeholder() -> String {
        LINE_KEYS.iter().map(|key| format!("# {key}: \n")).collect()
    }

    /// Parses the line format. Blank lines and `#` comments are ignored.
    pub fn parse(content: &str) -> Result<ServerSettings, ConfigError> {
        let mut values: Vec<String> = Vec::with_capacity(LINE_KEYS.len());

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(&expected) = LINE_KEYS.get(values.len()) else {
                return Err(ConfigError::TrailingContent { line: line_no });
            };
            let (key, value) = line
                .split_once(':')
                .ok_or(ConfigError::MalformedLine { line: line_no })?;
            let key = key.trim();
            if key != expected {
                return Err(ConfigError::UnexpectedKey {
                    line: line_no,
                    expected,
                    found: key.to_string(),
                });
            }
            values.push(value.trim().to_string());
        }

        if let Some(&missing) = LINE_KEYS.get(values.len()) {
            return Err(ConfigError::MissingKey(missing));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        let hostname = next();
        let port_raw = next();
        let port = port_raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
            key: "port",
            reason: format!("`{port_raw}`: {e}"),
        })?;

        Ok(ServerSettings {
            hostname,
            port,
            username: next(),
            password: next(),
            root_path: next(),
            upload_dir: next(),
            ocs_endpoint: next(),
        })
    }
}

impl ConfigSource for LineConfigSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ConfigLoad, ConfigError> {
        let Some(content) = read_or_bootstrap(&self.path, &Self::placeholder())? else {
            return Ok(ConfigLoad::Bootstrapped(self.path.clone()));
        };

        let settings = Settings::from_server(Self::parse(&content).map_err(|e| {
            error!(error = %e, config_path = ?self.path, "Failed to parse line config");
            e
        })?);
        settings.validate()?;
        Ok(ConfigLoad::Loaded(settings))
    }
}

// Returns the file content, or writes `placeholder` and returns None when the
// file does not exist yet.
fn read_or_bootstrap(path: &Path, placeholder: &str) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Bootstrap {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, placeholder).map_err(|e| ConfigError::Bootstrap {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(config_path = ?path, "Config file missing, placeholder created");
        return Ok(None);
    }

    match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            Ok(Some(content))
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}
