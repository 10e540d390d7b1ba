//! Error types used by the crate.

use mapconf_types::error::ConfigError;
use thiserror::Error;

use crate::engine::EngineError;

/// Mapconf error type.
#[derive(Debug, Error)]
pub enum MapConfError {
    /// Configuration document or descriptor is invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// The map engine rejected an operation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    /// I/O error (network or file).
    #[error("failed to load data")]
    IO,
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// Error decoding loaded data.
    #[error("failed to decode data: {0}")]
    Decoding(String),
    /// Error interacting with WASM runtime.
    #[error("wasm error: {0:?}")]
    Wasm(Option<String>),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for MapConfError {
    fn from(value: reqwest::Error) -> Self {
        log::debug!("Request failed: {value}");
        Self::IO
    }
}

impl From<std::io::Error> for MapConfError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::IO,
        }
    }
}

impl From<csv::Error> for MapConfError {
    fn from(value: csv::Error) -> Self {
        Self::Decoding(value.to_string())
    }
}

impl From<serde_json::Error> for MapConfError {
    fn from(value: serde_json::Error) -> Self {
        Self::Configuration(ConfigError::Json(value))
    }
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for MapConfError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        MapConfError::Wasm(Some(format!("{value:?}")))
    }
}
