#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::youtube::DEFAULT_API_BASE;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_CHANNELS_FILE: &str = "channels.toml";
pub const DEFAULT_WAREHOUSE_URL: &str = "warehouse.db";
pub const DEFAULT_DATASET: &str = "youtube";

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub api_key: String,
    pub api_base: String,
    pub warehouse_url: String,
    pub warehouse_auth_token: Option<String>,
    pub dataset: String,
    pub channels_file: PathBuf,
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub channels_file: Option<PathBuf>,
    pub warehouse_url: Option<String>,
    pub dataset: Option<String>,
    pub max_pages: Option<usize>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_config(overrides: ConfigOverrides) -> Result<LoaderConfig> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_config_with_overrides(&file_vars, env_var_string, overrides)
}

#[cfg(test)]
fn build_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<LoaderConfig> {
    build_config_with_overrides(file_vars, env_lookup, ConfigOverrides::default())
}

fn build_config_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: ConfigOverrides,
) -> Result<LoaderConfig> {
    let api_key = lookup_value("YOUTUBE_API_KEY", file_vars, &env_lookup)
        .ok_or_else(|| anyhow!("YOUTUBE_API_KEY not set"))?;
    let api_base = lookup_value("YOUTUBE_API_BASE", file_vars, &env_lookup)
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let warehouse_url = non_blank(overrides.warehouse_url)
        .or_else(|| lookup_value("WAREHOUSE_URL", file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_WAREHOUSE_URL.to_string());
    let warehouse_auth_token = lookup_value("WAREHOUSE_AUTH_TOKEN", file_vars, &env_lookup);
    let dataset = non_blank(overrides.dataset)
        .or_else(|| lookup_value("WAREHOUSE_DATASET", file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_DATASET.to_string());
    if dataset.contains('.') {
        bail!("dataset name must not contain '.': {dataset}");
    }
    let channels_file = overrides
        .channels_file
        .or_else(|| lookup_value("CHANNELS_FILE", file_vars, &env_lookup).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANNELS_FILE));
    let max_pages = match overrides.max_pages {
        Some(limit) => Some(limit),
        None => lookup_value("MAX_PAGES", file_vars, &env_lookup)
            .map(|value| {
                value
                    .parse::<usize>()
                    .with_context(|| format!("MAX_PAGES must be a positive integer, got {value}"))
            })
            .transpose()?,
    };
    if max_pages == Some(0) {
        bail!("MAX_PAGES must be at least 1");
    }

    Ok(LoaderConfig {
        api_key,
        api_base,
        warehouse_url,
        warehouse_auth_token,
        dataset,
        channels_file,
        max_pages,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| non_blank(file_vars.get(key).cloned()))
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

/// A named channel from the channels file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub name: String,
    pub id: String,
}

#[derive(Deserialize)]
struct ChannelsFile {
    #[serde(default)]
    channels: toml::Table,
}

/// Reads the `[channels]` table (display name = channel id), in file order.
pub fn load_channels(path: &Path) -> Result<Vec<ChannelEntry>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    parse_channels(&content).with_context(|| format!("Parsing {}", path.display()))
}

pub fn parse_channels(content: &str) -> Result<Vec<ChannelEntry>> {
    let file: ChannelsFile = toml::from_str(content)?;
    let mut entries = Vec::with_capacity(file.channels.len());
    for (name, value) in file.channels {
        let id = value
            .as_str()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("channel '{name}' must map to a non-empty id string"))?;
        entries.push(ChannelEntry {
            id: id.to_string(),
            name,
        });
    }
    Ok(entries)
}
