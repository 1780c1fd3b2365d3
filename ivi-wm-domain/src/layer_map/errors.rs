use thiserror::Error;

use ivi_wm_core::CoreError;

#[derive(Debug, Error)]
pub enum LayerMapError {
    #[error("Failed to parse layout document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read layout document: {0}")]
    Source(#[from] CoreError),

    #[error("Found mapping w/o name (role pattern '{role}')")]
    MissingName { role: String },

    #[error("Found invalid/unset layer id {layer_id} in mapping '{name}'")]
    InvalidLayerId { name: String, layer_id: i64 },

    #[error("Layer id {0} is mapped more than once")]
    DuplicateLayerId(u32),

    #[error("Invalid pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Layer mapping document contains no layers")]
    NoLayers,

    #[error("Area '{0}' is defined more than once")]
    DuplicateArea(String),
}
