/// Errors from one exhausted batch delivery.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Send: I/O error talking to {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Send: attempt timed out after {seconds}s against {endpoint}")]
    Timeout { endpoint: String, seconds: u64 },

    #[error("Send: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Send: backend {endpoint} answered status {status}")]
    Status { endpoint: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, SendError>;
