//! Error types for the scroll-synced playback controller

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving a controller
///
/// None of these are fatal at runtime: the frame loop swallows write failures
/// and keeps the video at its last good position.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A scroll length string that is not `<n>vh` or `<n>px`
    #[error("Invalid scroll length '{0}': expected a value like '400vh' or '4000px'")]
    InvalidScrollLength(String),

    /// A media source that is neither an absolute URL nor a resource path
    #[error("Invalid media source: {0}")]
    InvalidSource(String),

    /// The media surface refused a position assignment
    #[error("Seek to {time:.3}s rejected: {reason}")]
    SeekRejected { time: f64, reason: String },

    /// The host environment failed a registration or query
    #[error("Host environment error: {0}")]
    HostError(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidSource(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
