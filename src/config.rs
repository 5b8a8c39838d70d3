use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{CanvasId, Instance};
use crate::error::CanvasError;

pub const DEFAULT_STORAGE_INCREMENT_MB: u64 = 1000;
pub const DEFAULT_STORAGE_THRESHOLD: f64 = 0.79;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub instances: HashMap<Instance, InstanceEntry>,
    #[serde(default)]
    pub shopping: Option<ShoppingSection>,
    #[serde(default)]
    pub storage: Option<StorageSection>,
    #[serde(default)]
    pub orientation: Option<OrientationSection>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InstanceEntry {
    Shorthand(String),
    Detailed(InstanceEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InstanceEntryObject {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ShoppingSection {
    #[serde(default)]
    pub ignored_accounts: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StorageSection {
    #[serde(default)]
    pub increment_mb: Option<u64>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OrientationSection {
    pub course_id: CanvasId,
    pub group_category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub instance: Instance,
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub increment_mb: u64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientationSettings {
    pub course_id: CanvasId,
    pub group_category: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub data_dir: Option<Utf8PathBuf>,
    pub credentials: Credentials,
    pub ignored_accounts: Vec<String>,
    pub storage: StorageSettings,
    pub orientation: Option<OrientationSettings>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_path() -> Result<PathBuf, CanvasError> {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("penn-canvas").join("config.json"))
            .ok_or_else(|| {
                CanvasError::Filesystem("unable to resolve config directory".to_string())
            })
    }

    pub fn resolve(path: Option<&Path>, instance: Instance) -> Result<ResolvedConfig, CanvasError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if path.is_none() && !config_path.exists() {
            return Err(CanvasError::MissingConfig(config_path));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CanvasError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CanvasError::ConfigParse(err.to_string()))?;

        let env_token = std::env::var(instance.token_env_var()).ok();
        Self::resolve_config(config, instance, env_token)
    }

    pub fn resolve_config(
        config: Config,
        instance: Instance,
        env_token: Option<String>,
    ) -> Result<ResolvedConfig, CanvasError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let Config {
            data_dir,
            mut instances,
            shopping,
            storage,
            orientation,
            ..
        } = config;

        let (url, file_token) = match instances.remove(&instance) {
            Some(InstanceEntry::Shorthand(url)) => (url, None),
            Some(InstanceEntry::Detailed(obj)) => (obj.url, obj.token),
            None => return Err(CanvasError::MissingCredentials(instance.to_string())),
        };
        let url = url.trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(CanvasError::MissingCredentials(instance.to_string()));
        }
        let token = env_token
            .filter(|value| !value.trim().is_empty())
            .or(file_token.filter(|value| !value.trim().is_empty()))
            .map(|value| value.trim().to_string())
            .ok_or_else(|| CanvasError::MissingCredentials(instance.to_string()))?;

        let storage = storage.unwrap_or_default();
        let threshold = storage.threshold.unwrap_or(DEFAULT_STORAGE_THRESHOLD);
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(CanvasError::InvalidConfig(format!(
                "storage.threshold must be in (0, 1], got {threshold}"
            )));
        }

        Ok(ResolvedConfig {
            schema_version,
            data_dir: data_dir.map(Utf8PathBuf::from),
            credentials: Credentials {
                instance,
                url,
                token,
            },
            ignored_accounts: shopping.unwrap_or_default().ignored_accounts,
            storage: StorageSettings {
                increment_mb: storage.increment_mb.unwrap_or(DEFAULT_STORAGE_INCREMENT_MB),
                threshold,
            },
            orientation: orientation.map(|section| OrientationSettings {
                course_id: section.course_id,
                group_category: section.group_category,
            }),
        })
    }
}
