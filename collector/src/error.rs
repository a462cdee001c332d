use chrono::{DateTime, Utc};
use database::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    /// The caller decides whether to wait for `reset_at`; nothing here retries.
    #[error("GitHub API rate limit exceeded, resets at {reset_at}")]
    RateLimitExceeded { reset_at: DateTime<Utc> },

    #[error("GitHub API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("GraphQL response carried neither data nor errors")]
    EmptyResponse,

    #[error("request to GitHub failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not decode the GraphQL response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
