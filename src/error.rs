//! Error types for the buildah client.

use thiserror::Error;

/// Result type alias for buildah operations.
pub type Result<T> = std::result::Result<T, BuildahError>;

/// Errors surfaced by the buildah client.
///
/// There is no retry anywhere: every failure propagates immediately to the
/// caller. [`BuildahError::NotFound`] is raised only by `inspect`, to
/// distinguish a missing image/container from buildah rejecting the call.
#[derive(Error, Debug)]
pub enum BuildahError {
    /// buildah exited non-zero; carries its stderr verbatim.
    #[error("buildah exited with an error: {stderr}")]
    CommandFailed { stderr: String },

    /// An inspect call failed for this name or id.
    #[error("could not find container or image '{name_or_id}'")]
    NotFound {
        name_or_id: String,
        #[source]
        source: Box<BuildahError>,
    },

    /// buildah produced output this client cannot make sense of.
    #[error("unexpected output from `buildah {subcommand}`: {detail}")]
    UnexpectedOutput { subcommand: String, detail: String },

    /// A command token cannot be represented as a shell word.
    #[error("cannot quote command token: {0}")]
    Quote(#[from] shlex::QuoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
