use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::schema::DEFAULT_TABLE;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RidedbConfig {
    pub database: Option<String>,
    pub table: Option<String>,
}

impl RidedbConfig {
    /// Database path: explicit flag, then config, then `ridedb.db`
    pub fn resolve_database(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_database_path)
    }

    /// Trip table name: explicit flag, then config, then `ride_data`
    pub fn resolve_table(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.table.clone())
            .unwrap_or_else(|| DEFAULT_TABLE.to_string())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("ridedb.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("ridedb.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RidedbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RidedbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RidedbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
