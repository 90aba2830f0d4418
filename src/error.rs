//! Asset Errors
//!
//! Widgets log these and carry on; nothing here reaches the user.

use wasm_bindgen::JsValue;

pub type AssetResult<T> = Result<T, AssetError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// fetch() rejected (offline, CORS, aborted)
    Network(String),
    /// Response arrived but was not OK
    Status(u16),
    Decode(String),
    MissingElement(String),
    Js(String),
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetError::Network(msg) => write!(f, "Network error: {}", msg),
            AssetError::Status(code) => write!(f, "HTTP status {}", code),
            AssetError::Decode(msg) => write!(f, "Decode error: {}", msg),
            AssetError::MissingElement(what) => write!(f, "Missing element: {}", what),
            AssetError::Js(msg) => write!(f, "JS error: {}", msg),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<JsValue> for AssetError {
    fn from(value: JsValue) -> Self {
        AssetError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(e: serde_json::Error) -> Self {
        AssetError::Decode(e.to_string())
    }
}
