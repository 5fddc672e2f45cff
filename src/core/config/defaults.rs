use serde_json::{json, Value};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_PORT: u64 = 8501;

/// Models offered in the selector out of the box, with their embedding sizes.
pub const DEFAULT_MODELS: [(&str, u64); 4] = [
    ("llama2:latest", 4096),
    ("nomic-embed-text:latest", 768),
    ("qwen2.5-coder:latest", 5120),
    ("glm4:latest", 5120),
];

pub fn default_config() -> Value {
    let models: Vec<Value> = DEFAULT_MODELS
        .iter()
        .map(|(name, dimension)| json!({ "name": name, "dimension": dimension }))
        .collect();

    json!({
        "server": {
            "host": "127.0.0.1",
            "port": DEFAULT_PORT,
            "cors_allowed_origins": [],
            "max_upload_bytes": 50 * 1024 * 1024
        },
        "ollama": {
            "base_url": DEFAULT_OLLAMA_URL,
            "timeout_secs": 300
        },
        "rag": {
            "chunk_size": 500,
            "chunk_overlap": 50,
            "separator": "\n\n",
            "top_k": 1,
            "embed_batch_size": 16
        },
        "ui": {
            "default_language": "français"
        },
        "models": models
    })
}
