//! Common error types used throughout geoscout.
//!
//! The taxonomy separates failures that only degrade a branch or an item
//! (network, decode, extraction, tool) from failures that end a run
//! (corrupt or missing catalog state, configuration, I/O).

use std::path::PathBuf;

/// Common error type for geoscout.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection failure, timeout, or non-2xx response.
    #[error("Network error [{url}]: {message}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// A listing or catalog document was not valid JSON of the expected shape.
    #[error("Decode error [{context}]: {message}")]
    Decode {
        /// What was being decoded (usually a URL).
        context: String,
        /// Human-readable error description.
        message: String,
    },

    /// A metadata query for a single facet failed.
    #[error("Extraction error [{facet}]: {message}")]
    Extraction {
        /// The facet that could not be computed.
        facet: String,
        /// Human-readable error description.
        message: String,
    },

    /// The persisted catalog could not be read as a catalog.
    #[error("Corrupt catalog state in {}: {message}", path.display())]
    CorruptState {
        /// Location of the catalog document.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// The persisted catalog does not exist.
    #[error("Catalog not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An external tool (duckdb) failed to run or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new Network error.
    pub fn network(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a new Decode error.
    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a new Extraction error.
    pub fn extraction(facet: impl ToString, message: impl ToString) -> Self {
        Self::Extraction {
            facet: facet.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a new CorruptState error.
    pub fn corrupt_state(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::CorruptState {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a new Tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure only affects one branch or one item.
    ///
    /// Recoverable errors are logged and the affected unit is left for a
    /// later run; everything else aborts the current run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Decode { .. } | Self::Extraction { .. } | Self::Tool { .. }
        )
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
