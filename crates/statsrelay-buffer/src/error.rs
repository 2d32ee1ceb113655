/// Errors from buffer file operations and line parsing.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Buffer: I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// One buffered line that does not round-trip to a metric. Skipped by
    /// the dispatcher, never fatal.
    #[error("Buffer: malformed line: {0}")]
    MalformedLine(String),
}

pub type Result<T> = std::result::Result<T, BufferError>;
