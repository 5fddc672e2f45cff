use serde_json::{Map, Value};

use crate::core::errors::ApiError;
use crate::i18n::UiLanguage;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_u64_field(
            server,
            "server.max_upload_bytes",
            "max_upload_bytes",
            1024,
            2_000_000_000,
        )?;
    }

    if let Some(ollama) = expect_optional_object(root, "ollama")? {
        validate_required_string_field(ollama, "ollama.base_url", "base_url")?;
        validate_u64_field(ollama, "ollama.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_optional_string_field(rag, "rag.separator", "separator")?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            rag,
            "rag.embed_batch_size",
            "embed_batch_size",
            1,
            1024,
        )?;

        let size = rag.get("chunk_size").and_then(Value::as_u64);
        let overlap = rag.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap > size {
                return Err(ApiError::BadRequest(format!(
                    "Invalid config at 'rag.chunk_overlap': {} is larger than chunk_size {}",
                    overlap, size
                )));
            }
        }
    }

    if let Some(ui) = expect_optional_object(root, "ui")? {
        validate_optional_string_field(ui, "ui.default_language", "default_language")?;
        if let Some(language) = ui.get("default_language").and_then(Value::as_str) {
            if UiLanguage::parse(language).is_none() {
                return Err(ApiError::BadRequest(format!(
                    "Invalid config at 'ui.default_language': unsupported language '{}'",
                    language
                )));
            }
        }
    }

    if let Some(models) = root.get("models") {
        let entries = models
            .as_array()
            .ok_or_else(|| config_type_error("models", "array"))?;
        for (index, value) in entries.iter().enumerate() {
            let path_prefix = format!("models[{}]", index);
            let entry = value
                .as_object()
                .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
            validate_required_string_field(entry, &format!("{}.name", path_prefix), "name")?;
            validate_u64_field(
                entry,
                &format!("{}.dimension", path_prefix),
                "dimension",
                1,
                1_000_000,
            )?;
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
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
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
