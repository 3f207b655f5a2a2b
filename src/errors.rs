// Error types for Reflector
//
// Only structural failures live here. A value that fails to parse as JSON or
// base64 is not an error; the decoder just tries the next interpretation.

use thiserror::Error;

/// Fatal failure while loading or walking one archive source
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Source could not be opened or read
    #[error("{source_name}: failed to read archive: {error}")]
    Read {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// Document does not match the HAR schema
    #[error("{source_name}: malformed archive: {error}")]
    Schema {
        source_name: String,
        #[source]
        error: serde_json::Error,
    },

    /// A request URL could not be parsed
    #[error("{source_name}: invalid request URL {url:?}: {error}")]
    InvalidUrl {
        source_name: String,
        url: String,
        #[source]
        error: url::ParseError,
    },

    /// Results for the source could not be written out
    #[error("{source_name}: failed to write output: {error}")]
    Output {
        source_name: String,
        #[source]
        error: std::io::Error,
    },
}

impl ArchiveError {
    /// Name of the source (file path or `<stdin>`) the error belongs to
    pub fn source_name(&self) -> &str {
        match self {
            ArchiveError::Read { source_name, .. }
            | ArchiveError::Schema { source_name, .. }
            | ArchiveError::InvalidUrl { source_name, .. }
            | ArchiveError::Output { source_name, .. } => source_name,
        }
    }
}
