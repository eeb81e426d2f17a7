use serde_json::{Map, Value};

use crate::core::errors::ConfigError;

/// Checks the merged config document before it is deserialized, so errors
/// carry the dotted path of the offending key.
pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    validate_u64_field(root, "request_timeout_secs", "request_timeout_secs", 1, 86_400)?;

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.url", "url")?;
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.max_retries", "max_retries", 0, 20)?;
        validate_u64_field(
            embedding,
            "embedding.retry_backoff_ms",
            "retry_backoff_ms",
            1,
            600_000,
        )?;
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_optional_string_field(generation, "generation.url", "url")?;
        validate_non_empty_string_field(generation, "generation.model", "model")?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.max_context_chars",
            "max_context_chars",
            1,
            10_000_000,
        )?;
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            chunking,
            "chunking.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        validate_optional_string_field(chunking, "chunking.tokenizer_path", "tokenizer_path")?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_optional_string_field(index, "index.dir", "dir")?;
        validate_non_empty_string_field(index, "index.collection", "collection")?;
        validate_enum_field(index, "index.metric", "metric", &["cosine", "l2", "ip"])?;
        validate_bool_field(index, "index.in_memory", "in_memory")?;
    }

    if let Some(indexing) = expect_optional_object(root, "indexing")? {
        validate_u64_field(indexing, "indexing.concurrency", "concurrency", 1, 64)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_non_empty_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_u64_field(
            server,
            "server.query_timeout_secs",
            "query_timeout_secs",
            1,
            86_400,
        )?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

/// Absent and `null` are accepted; the typed default applies.
fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key).filter(|v| !v.is_null()) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "non-negative integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ConfigError::invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key).filter(|v| !v.is_null()) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ConfigError::invalid(
            path,
            format!("expected one of {}", allowed.join(", ")),
        ));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{}[{}]", path, index),
                "value cannot be empty",
            ));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(config: Value) -> String {
        validate_config(&config).unwrap_err().to_string()
    }

    #[test]
    fn accepts_empty_and_full_documents() {
        validate_config(&json!({})).unwrap();
        validate_config(&json!({
            "request_timeout_secs": 60,
            "embedding": { "model": "nomic-embed-text", "max_retries": 2 },
            "retrieval": { "top_k": 5, "max_context_chars": null },
            "chunking": { "chunk_size": 256, "chunk_overlap": 32 },
            "index": { "metric": "l2", "in_memory": true },
            "indexing": { "concurrency": 8 },
            "server": { "port": 9000, "cors_allowed_origins": ["http://localhost:1234"] }
        }))
        .unwrap();
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert_eq!(
            message(json!({ "chunking": { "chunk_size": 0 } })),
            "Invalid config at 'chunking.chunk_size': must be between 1 and 1000000"
        );
    }

    #[test]
    fn rejects_zero_top_k() {
        assert!(message(json!({ "retrieval": { "top_k": 0 } })).contains("'retrieval.top_k'"));
    }

    #[test]
    fn rejects_unknown_metric() {
        assert_eq!(
            message(json!({ "index": { "metric": "hamming" } })),
            "Invalid config at 'index.metric': expected one of cosine, l2, ip"
        );
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(message(json!({ "server": "localhost" })).contains("'server': expected object"));
        assert!(message(json!({ "index": { "in_memory": "yes" } })).contains("expected boolean"));
        assert!(message(json!({ "indexing": { "concurrency": -1 } }))
            .contains("expected non-negative integer"));
        assert!(message(json!({ "server": { "cors_allowed_origins": ["ok", ""] } }))
            .contains("server.cors_allowed_origins[1]"));
    }
}
