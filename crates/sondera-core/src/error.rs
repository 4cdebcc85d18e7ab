use thiserror::Error;

#[derive(Debug, Error)]
pub enum SonderaError {
    // Backend errors
    #[error("Structured output violated the requested schema: {0}")]
    SchemaViolation(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    // Input errors
    #[error("Required input missing: {0}")]
    EmptyInput(String),

    // Citation errors
    #[error("Grounding metadata could not be resolved: {0}")]
    GroundingResolution(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Policy errors
    #[error("Policy preamble error: {0}")]
    Policy(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SonderaError>;
