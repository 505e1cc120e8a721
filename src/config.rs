use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::cache::Propagation;
use crate::domain::Layout;
use crate::error::ArchiveError;

pub const DEFAULT_CONFIG_FILE: &str = "archive-ledger.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub state_dir: Option<String>,
    #[serde(default)]
    pub record_ids: Option<bool>,
    #[serde(default)]
    pub propagate_mark: Option<bool>,
    #[serde(default)]
    pub propagate_name: Option<bool>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub root: Option<Utf8PathBuf>,
    pub state_dir: Option<Utf8PathBuf>,
    pub record_ids: bool,
    pub propagation: Propagation,
    pub layout: Layout,
    pub prefix: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, ArchiveError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ArchiveError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ArchiveError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> Settings {
        Settings {
            root: config.root.map(Utf8PathBuf::from),
            state_dir: config.state_dir.map(Utf8PathBuf::from),
            record_ids: config.record_ids.unwrap_or(true),
            propagation: Propagation {
                mark: config.propagate_mark.unwrap_or(false),
                name: config.propagate_name.unwrap_or(false),
            },
            layout: config.layout.unwrap_or_default(),
            prefix: config.prefix.unwrap_or_default(),
        }
    }
}
