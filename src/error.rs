// Error taxonomy for the library. The binary wraps these in `anyhow` at
// the top level; everything below `main` returns `crate::error::Result`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The format template references an unknown key or is malformed.
    #[error("Invalid Format Specifier: {0}")]
    InvalidFormat(String),

    #[error("line does not match format {template:?}: {line:?}")]
    UnparsableLine { template: String, line: String },

    /// A parse failure located in a particular input source.
    #[error("{origin}, line {line_no}: {source}")]
    InputLine {
        origin: String,
        line_no: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("no mutation selected (use --delete, --archive or --favorite)")]
    NoActionSelected,

    #[error("record #{index} has no {field} (required for '{action}')")]
    MissingField {
        index: usize,
        field: &'static str,
        action: &'static str,
    },

    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("API request failed: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
