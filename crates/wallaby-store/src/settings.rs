//! Environment-driven connection settings
//!
//! Two aliases share one set of connection parameters and differ only in the
//! schema search path:
//!
//! | alias     | search path        |
//! |-----------|--------------------|
//! | `default` | `public, wallaby`  |
//! | `wallaby` | `wallaby`          |
//!
//! Host, port and engine fall back to defaults; name, user and password must
//! be present.

use crate::errors::Result;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use wallaby_core::errors::ModelError;
use wallaby_core::logging_facility::Profile;
use wallaby_core::schema::{render_search_path, Schema};
use wallaby_core_types::Sensitive;

pub const ENV_ENGINE: &str = "WALLABY_DATABASE_ENGINE";
pub const ENV_HOST: &str = "WALLABY_DATABASE_HOST";
pub const ENV_PORT: &str = "WALLABY_DATABASE_PORT";
pub const ENV_NAME: &str = "WALLABY_DATABASE_NAME";
pub const ENV_USER: &str = "WALLABY_DATABASE_USER";
pub const ENV_PASSWORD: &str = "WALLABY_DATABASE_PASSWORD";
pub const ENV_DEBUG: &str = "WALLABY_DEBUG";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5432;

/// Storage engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    #[default]
    Postgresql,
    Sqlite,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Postgresql => "postgresql",
            Engine::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Dotted backend paths from older deployments are accepted as-is
        let short = s.trim().rsplit('.').next().unwrap_or_default();
        match short.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "postgresql_psycopg2" => Ok(Engine::Postgresql),
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            _ => Err(ModelError::InvalidSetting {
                key: ENV_ENGINE.to_string(),
                reason: format!("unknown engine '{}'", s),
            }),
        }
    }
}

/// Named connection configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseAlias {
    Default,
    Wallaby,
}

impl DatabaseAlias {
    pub const ALL: [DatabaseAlias; 2] = [DatabaseAlias::Default, DatabaseAlias::Wallaby];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseAlias::Default => "default",
            DatabaseAlias::Wallaby => "wallaby",
        }
    }

    /// Schemas visible through this alias, in lookup order
    pub fn search_path(&self) -> Vec<Schema> {
        match self {
            DatabaseAlias::Default => vec![Schema::Public, Schema::Wallaby],
            DatabaseAlias::Wallaby => vec![Schema::Wallaby],
        }
    }
}

impl fmt::Display for DatabaseAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseAlias {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(DatabaseAlias::Default),
            "wallaby" => Ok(DatabaseAlias::Wallaby),
            other => Err(ModelError::InvalidSetting {
                key: "alias".to_string(),
                reason: format!("unknown database alias '{}'", other),
            }),
        }
    }
}

/// Connection parameters for one alias
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub alias: DatabaseAlias,
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    /// Database name; for SQLite, the path of the `public` database file
    pub name: String,
    pub user: String,
    pub password: Sensitive<String>,
    pub search_path: Vec<Schema>,
}

impl DatabaseSettings {
    /// Server-side options string (`-c search_path=...`)
    pub fn options(&self) -> String {
        format!("-c search_path={}", render_search_path(&self.search_path))
    }

    /// libpq keyword/value connection string with the password redacted
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={} options='{}'",
            self.host,
            self.port,
            self.name,
            self.user,
            self.password,
            self.options()
        )
    }

    /// Where a schema's data lives for the SQLite engine
    ///
    /// `public` is the configured file itself; any other schema is a sibling
    /// file named `<stem>_<schema>.<ext>`. In-memory databases stay in memory.
    pub fn schema_location(&self, schema: Schema) -> String {
        if schema == Schema::Public || self.name == ":memory:" {
            return self.name.clone();
        }
        let path = Path::new(&self.name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());
        let file_name = match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, schema, ext.to_string_lossy()),
            None => format!("{}_{}", stem, schema),
        };
        path.with_file_name(file_name).to_string_lossy().into_owned()
    }
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub debug: bool,
    pub default: DatabaseSettings,
    pub wallaby: DatabaseSettings,
}

impl Settings {
    /// Load settings from the process environment, honouring a `.env` file
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` when a required variable is absent and
    /// `InvalidSetting` when a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Same as [`Settings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = match lookup(ENV_ENGINE) {
            Some(value) => value.parse::<Engine>()?,
            None => Engine::default(),
        };
        let host = lookup(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(ENV_PORT) {
            Some(value) => parse_port(&value)?,
            None => DEFAULT_PORT,
        };
        let name = required(&lookup, ENV_NAME)?;
        let user = required(&lookup, ENV_USER)?;
        let password = Sensitive::new(required(&lookup, ENV_PASSWORD)?);
        let debug = match lookup(ENV_DEBUG) {
            Some(value) => parse_bool(ENV_DEBUG, &value)?,
            None => false,
        };

        let for_alias = |alias: DatabaseAlias| DatabaseSettings {
            alias,
            engine,
            host: host.clone(),
            port,
            name: name.clone(),
            user: user.clone(),
            password: password.clone(),
            search_path: alias.search_path(),
        };

        Ok(Self {
            debug,
            default: for_alias(DatabaseAlias::Default),
            wallaby: for_alias(DatabaseAlias::Wallaby),
        })
    }

    pub fn database(&self, alias: DatabaseAlias) -> &DatabaseSettings {
        match alias {
            DatabaseAlias::Default => &self.default,
            DatabaseAlias::Wallaby => &self.wallaby,
        }
    }

    pub fn log_profile(&self) -> Profile {
        Profile::from_debug(self.debug)
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| {
        ModelError::MissingSetting {
            key: key.to_string(),
        }
        .into()
    })
}

fn parse_port(value: &str) -> Result<u16> {
    value.trim().parse::<u16>().map_err(|e| {
        ModelError::InvalidSetting {
            key: ENV_PORT.to_string(),
            reason: format!("'{}' is not a port number: {}", value, e),
        }
        .into()
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ModelError::InvalidSetting {
            key: key.to_string(),
            reason: format!("'{}' is not a boolean", other),
        }
        .into()),
    }
}
