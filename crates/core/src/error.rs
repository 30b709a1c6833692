use thiserror::Error;

/// Failures of the LLM backend. Any of these aborts the whole extraction.
#[derive(Error, Debug)]
pub enum ExtractionBackendError {
    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid API response: {reason}")]
    InvalidResponse { reason: String },

    #[error("LLM call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid video URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported video source: {url}")]
    Unsupported { url: String },

    #[error("No transcript available for {url}")]
    NoTranscript { url: String },

    #[error("{program} failed for {url}: {reason}")]
    Command {
        program: &'static str,
        url: String,
        reason: String,
    },

    #[error("Caption download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed video info: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// True when the caller sent something we cannot work with, as opposed to
    /// an upstream outage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RetrievalError::InvalidUrl { .. }
                | RetrievalError::Unsupported { .. }
                | RetrievalError::NoTranscript { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum DynamoError {
    #[error("Group size {group_size} is larger than the number of chunks ({chunks})")]
    InvalidGroupSize { group_size: usize, chunks: usize },

    #[error(
        "Each group would hold {docs_per_group} chunks (group size {group_size}), more than 10 degrades output quality too far. Increase the group size to reduce chunks per group."
    )]
    GroupTooLarge {
        docs_per_group: usize,
        group_size: usize,
    },

    #[error("Extraction backend failed on group {group}: {source}")]
    Backend {
        group: usize,
        #[source]
        source: ExtractionBackendError,
    },

    #[error("Transcript retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DynamoError {
    /// Input validation errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        match self {
            DynamoError::InvalidGroupSize { .. } | DynamoError::GroupTooLarge { .. } => true,
            DynamoError::Retrieval(e) => e.is_client_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DynamoError>;
