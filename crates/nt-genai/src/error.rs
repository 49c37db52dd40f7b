use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("no API key configured for the generative service")]
    MissingApiKey,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidOutput(String),

    #[error("{0}")]
    InvalidInput(String),
}
