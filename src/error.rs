use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("initial_render must be called before update")]
    SurfaceNotInitialized,
    #[error("invalid surface size {width}x{height}")]
    InvalidSurface { width: f32, height: f32 },
    #[error("document input must be a JSON array")]
    NotAnArray,
    #[error("document {index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("document {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("document {index} has no `tokens` list")]
    MissingTokens { index: usize },
    #[error("document {index}: token entry {entry} is malformed")]
    MalformedToken { index: usize, entry: usize },
    #[error("document {index}: score for token `{token}` is not a finite number")]
    InvalidScore { index: usize, token: String },
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
