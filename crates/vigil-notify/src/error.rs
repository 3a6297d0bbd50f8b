/// Errors from publishing alerts and heartbeats.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The HTTP request to the sink endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sink endpoint returned a non-success response.
    #[error("Notify: endpoint returned status {status}: {body}")]
    ApiError { status: u16, body: String },
}
