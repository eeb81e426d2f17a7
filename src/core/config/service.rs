use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::RagConfig;
use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ConfigError;

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
}

/// Environment variables layered over the YAML document: (variable, key path, kind).
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 13] = [
    ("RAG_EMBED_URL", &["embedding", "url"], EnvKind::Text),
    ("RAG_EMBED_MODEL", &["embedding", "model"], EnvKind::Text),
    ("RAG_EMBED_MAX_RETRIES", &["embedding", "max_retries"], EnvKind::Integer),
    ("RAG_GENERATE_URL", &["generation", "url"], EnvKind::Text),
    ("RAG_GEN_MODEL", &["generation", "model"], EnvKind::Text),
    ("RAG_REQUEST_TIMEOUT_SECS", &["request_timeout_secs"], EnvKind::Integer),
    ("RAG_TOP_K", &["retrieval", "top_k"], EnvKind::Integer),
    ("RAG_CHUNK_SIZE", &["chunking", "chunk_size"], EnvKind::Integer),
    ("RAG_CHUNK_OVERLAP", &["chunking", "chunk_overlap"], EnvKind::Integer),
    ("RAG_TOKENIZER_PATH", &["chunking", "tokenizer_path"], EnvKind::Text),
    ("RAG_INDEX_DIR", &["index", "dir"], EnvKind::Text),
    ("RAG_INDEX_CONCURRENCY", &["indexing", "concurrency"], EnvKind::Integer),
    ("PORT", &["server", "port"], EnvKind::Integer),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        self.paths.project_root.join("config.yml")
    }

    /// Defaults, then the YAML file, then the process environment.
    pub fn load(&self) -> Result<RagConfig, ConfigError> {
        self.load_with(&self.config_path(), |key| env::var(key).ok())
    }

    pub fn load_with<F>(&self, config_path: &Path, lookup: F) -> Result<RagConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut document = load_yaml_file(config_path)?;
        apply_env_overrides(&mut document, lookup)?;
        validate_config(&document)?;

        let mut config: RagConfig =
            serde_json::from_value(strip_nulls(document)).map_err(|e| ConfigError::Parse {
                path: config_path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.resolve_relative_paths(&mut config);

        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(config)
    }

    fn resolve_relative_paths(&self, config: &mut RagConfig) {
        let root = &self.paths.project_root;
        if let Some(dir) = config.index.dir.as_mut().filter(|d| d.is_relative()) {
            *dir = root.join(&*dir);
        }
        if let Some(path) = config
            .chunking
            .tokenizer_path
            .as_mut()
            .filter(|p| p.is_relative())
        {
            *path = root.join(&*path);
        }
    }
}

/// A missing file is an empty document; an unreadable or malformed one is an error.
fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file; using defaults");
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Parse {
            path: path.display().to_string(),
            reason: "top level must be a mapping".to_string(),
        }),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (name, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = match kind {
            EnvKind::Text => Value::String(raw.to_string()),
            EnvKind::Integer => {
                let number: u64 = raw.parse().map_err(|_| {
                    ConfigError::invalid(name, format!("expected a non-negative integer, got '{}'", raw))
                })?;
                Value::from(number)
            }
        };
        ensure_object_path(config, path, value);
    }
    Ok(())
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

/// Drops `null` entries so the typed defaults fill them in.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}
