use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("malformed definition file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid color {0:?}, expected rrggbb")]
    InvalidColor(String),
}
