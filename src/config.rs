use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;

use crate::error::{Error, Result};

pub const DATABASE_URL_ENV: &str = "TASKTIME_DATABASE_URL";

/// Where the database lives. Plain paths are opened as given, never parsed
/// as URLs, so `%` and `?` in file names survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Url(String),
    File(PathBuf),
}

impl DatabaseLocation {
    fn parse(location: &str) -> Self {
        if location.starts_with("sqlite:") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    pub fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = match self {
            Self::Url(url) => SqliteConnectOptions::from_str(url)?,
            Self::File(path) => SqliteConnectOptions::new().filename(path),
        };
        Ok(options)
    }
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseLocation,
}

impl Config {
    /// Resolves the database location: explicit override, then
    /// `TASKTIME_DATABASE_URL`, then the per-user state directory.
    pub fn load(database: Option<&str>) -> Result<Self> {
        let from_env = std::env::var(DATABASE_URL_ENV).ok();
        Self::resolve(database, from_env.as_deref())
    }

    fn resolve(database: Option<&str>, from_env: Option<&str>) -> Result<Self> {
        let database = match database.or(from_env).filter(|s| !s.trim().is_empty()) {
            Some(location) => DatabaseLocation::parse(location),
            None => DatabaseLocation::File(default_database_path()?),
        };

        Ok(Self { database })
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            database: DatabaseLocation::File(path.as_ref().to_path_buf()),
        }
    }

    /// Filesystem path of the database, if it is a file.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database {
            DatabaseLocation::File(path) => Some(path.clone()),
            DatabaseLocation::Url(url) => {
                let rest = url.strip_prefix("sqlite:")?;
                let rest = rest.strip_prefix("//").unwrap_or(rest);
                let path = rest.split('?').next().unwrap_or(rest);
                if path.is_empty() || path == ":memory:" {
                    None
                } else {
                    Some(PathBuf::from(path))
                }
            }
        }
    }
}

fn default_database_path() -> Result<PathBuf> {
    let state_dir = dirs::state_dir()
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .ok_or_else(|| Error::Config("could not find a state directory".to_string()))?;

    Ok(state_dir.join("tasktime").join("data").join("tasktime.db"))
}
