//! Validated connection parameters and their configuration sources.
//!
//! # Responsibility
//! - Hold raw settings as read from JSON files or the environment.
//! - Validate settings once, at construction, and render the connection URI.
//!
//! # Invariants
//! - `sqlite`: only the `.db` suffix of a present database name is checked.
//! - Other engines: driver, host, port, username, password and name are all
//!   required; every missing one is reported in that fixed order.
//! - Extra params render in insertion order.

use super::SQLITE_ENGINE;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const SQLITE_FILE_SUFFIX: &str = ".db";

/// Unvalidated connection settings.
///
/// Feed into [`ConnectionParams::new`] to obtain a usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub engine: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    /// Accepts a number or a numeric string; an empty string counts as unset.
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database name, or the file path for `sqlite`.
    #[serde(default)]
    pub name: Option<String>,
    /// Driver query parameters appended as `?k=v&...`.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ConnectionSettings {
    /// Settings for an engine with every optional field unset.
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            ..Self::default()
        }
    }

    /// Parses settings from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Json)
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Reads `<PREFIX>_ENGINE`, `_DRIVER`, `_HOST`, `_PORT`, `_USERNAME`,
    /// `_PASSWORD` and `_NAME` from the process environment.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], with a caller-supplied variable source.
    pub fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}"));

        let engine_key = format!("{prefix}_ENGINE");
        let engine = lookup(&engine_key).ok_or(ConfigError::MissingVar(engine_key))?;

        let port = match var("PORT") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                var: format!("{prefix}_PORT"),
                value: raw.clone(),
            })?),
            None => None,
        };

        Ok(Self {
            engine,
            driver: var("DRIVER"),
            host: var("HOST"),
            port,
            username: var("USERNAME"),
            password: var("PASSWORD"),
            name: var("NAME"),
            params: Map::new(),
        })
    }
}

/// Validated, immutable description of how to reach a database.
///
/// `Display` renders the connection URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConnectionSettings", into = "ConnectionSettings")]
pub struct ConnectionParams {
    settings: ConnectionSettings,
}

impl ConnectionParams {
    pub fn new(settings: ConnectionSettings) -> Result<Self, ConnectionParamsError> {
        validate(&settings)?;
        Ok(Self { settings })
    }

    /// Shorthand for a `sqlite` file (or in-memory when `name` is `None`).
    pub fn sqlite(name: Option<&str>) -> Result<Self, ConnectionParamsError> {
        let mut settings = ConnectionSettings::new(SQLITE_ENGINE);
        settings.name = name.map(str::to_string);
        Self::new(settings)
    }

    /// Parses and validates a JSON settings document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let settings = ConnectionSettings::from_json_str(raw)?;
        Self::new(settings).map_err(ConfigError::Invalid)
    }

    pub fn engine(&self) -> &str {
        &self.settings.engine
    }

    pub fn driver(&self) -> Option<&str> {
        self.settings.driver.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.settings.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.settings.port
    }

    pub fn username(&self) -> Option<&str> {
        self.settings.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.settings.password.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.settings.name)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.settings.params
    }

    pub fn is_sqlite(&self) -> bool {
        self.settings.engine == SQLITE_ENGINE
    }
}

impl TryFrom<ConnectionSettings> for ConnectionParams {
    type Error = ConnectionParamsError;

    fn try_from(value: ConnectionSettings) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConnectionParams> for ConnectionSettings {
    fn from(value: ConnectionParams) -> Self {
        value.settings
    }
}

impl Display for ConnectionParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = &self.settings;
        if self.is_sqlite() {
            write!(f, "{}://", s.engine)?;
            if let Some(name) = self.name() {
                write!(f, "/{name}")?;
            }
        } else {
            write!(
                f,
                "{}+{}://{}:{}@{}:{}/{}",
                s.engine,
                s.driver.as_deref().unwrap_or_default(),
                s.username.as_deref().unwrap_or_default(),
                s.password.as_deref().unwrap_or_default(),
                s.host.as_deref().unwrap_or_default(),
                s.port.unwrap_or_default(),
                s.name.as_deref().unwrap_or_default(),
            )?;
        }

        if !s.params.is_empty() {
            let pairs = s
                .params
                .iter()
                .map(|(key, value)| format!("{key}={}", render_param(value)))
                .collect::<Vec<_>>();
            write!(f, "?{}", pairs.join("&"))?;
        }

        Ok(())
    }
}

fn validate(settings: &ConnectionSettings) -> Result<(), ConnectionParamsError> {
    if settings.engine == SQLITE_ENGINE {
        return match non_empty(&settings.name) {
            Some(name) if !name.ends_with(SQLITE_FILE_SUFFIX) => {
                Err(ConnectionParamsError::SqliteFileExtension)
            }
            _ => Ok(()),
        };
    }

    let checks: [(&'static str, bool); 6] = [
        ("driver", non_empty(&settings.driver).is_some()),
        ("host", non_empty(&settings.host).is_some()),
        ("port", settings.port.is_some_and(|port| port != 0)),
        ("username", non_empty(&settings.username).is_some()),
        ("password", non_empty(&settings.password).is_some()),
        ("name", non_empty(&settings.name).is_some()),
    ];
    let missing = checks
        .iter()
        .filter(|(_, present)| !present)
        .map(|(field, _)| *field)
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConnectionParamsError::MissingFields(missing))
    }
}

fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(i64),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(port)) => u16::try_from(port)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port {port} is outside 0..=65535"))),
        Some(RawPort::Text(raw)) if raw.trim().is_empty() => Ok(None),
        Some(RawPort::Text(raw)) => raw
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port `{raw}` is not a number in 0..=65535"))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|raw| !raw.is_empty())
}

fn render_param(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Validation failure raised while constructing [`ConnectionParams`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionParamsError {
    /// Required fields for a networked engine, in check order.
    MissingFields(Vec<&'static str>),
    SqliteFileExtension,
}

impl Display for ConnectionParamsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => {
                write!(f, "Required Fields Missing: {}", fields.join(", "))
            }
            Self::SqliteFileExtension => write!(f, "Sqlite DB files should end with .db"),
        }
    }
}

impl Error for ConnectionParamsError {}

/// Failure while loading connection settings from a configuration source.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    MissingVar(String),
    InvalidPort {
        var: String,
        value: String,
    },
    Invalid(ConnectionParamsError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid settings document: {err}"),
            Self::MissingVar(var) => write!(f, "environment variable `{var}` is not set"),
            Self::InvalidPort { var, value } => {
                write!(f, "`{var}` must be a port number, got `{value}`")
            }
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::MissingVar(_) | Self::InvalidPort { .. } => None,
        }
    }
}

impl From<ConnectionParamsError> for ConfigError {
    fn from(value: ConnectionParamsError) -> Self {
        Self::Invalid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{render_param, ConnectionSettings};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn render_param_strips_quotes_from_strings_only() {
        assert_eq!(render_param(&json!("utf8")), "utf8");
        assert_eq!(render_param(&json!(30)), "30");
        assert_eq!(render_param(&json!(true)), "true");
    }

    #[test]
    fn lookup_reads_prefixed_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("APP_DB_ENGINE", "postgresql"),
            ("APP_DB_DRIVER", "psycopg2"),
            ("APP_DB_PORT", "5432"),
        ]);
        let settings =
            ConnectionSettings::from_lookup("APP_DB", |key| vars.get(key).map(|v| v.to_string()))
                .unwrap();

        assert_eq!(settings.engine, "postgresql");
        assert_eq!(settings.driver.as_deref(), Some("psycopg2"));
        assert_eq!(settings.port, Some(5432));
        assert_eq!(settings.host, None);
    }

    #[test]
    fn lookup_rejects_non_numeric_port() {
        let err = ConnectionSettings::from_lookup("DB", |key| match key {
            "DB_ENGINE" => Some("mysql".to_string()),
            "DB_PORT" => Some("http".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "`DB_PORT` must be a port number, got `http`");
    }
}
