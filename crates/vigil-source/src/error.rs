/// Errors from fetching metrics.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP request failed or the response body could not be decoded.
    #[error("Source: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("Source: unexpected status {status} from {url}")]
    BadStatus { status: u16, url: String },

    /// The endpoint answered 200 but flagged an application-level error.
    #[error("Source: endpoint reported an error: {0}")]
    ErrorStatus(String),
}
