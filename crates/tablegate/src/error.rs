//! Error types for the table gateway.

use thiserror::Error;

/// Maximum statement length carried inside a [`GatewayError::Query`].
const STATEMENT_SNIPPET_LEN: usize = 200;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be established or never reached a ready state.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Caller input was rejected before anything was sent to the engine.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The engine rejected or failed a statement.
    #[error("Query failed: {message}\n  Statement: {statement}")]
    Query { message: String, statement: String },

    /// Metadata invariant violated (e.g. a key column absent from the column list).
    #[error("Schema error: {0}")]
    Schema(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Create a Query error, keeping a truncated copy of the statement
    /// for diagnostics.
    pub fn query(message: impl Into<String>, statement: &str) -> Self {
        let mut snippet = statement.trim().to_string();
        if snippet.len() > STATEMENT_SNIPPET_LEN {
            let mut end = STATEMENT_SNIPPET_LEN;
            while !snippet.is_char_boundary(end) {
                end -= 1;
            }
            snippet.truncate(end);
            snippet.push_str("...");
        }
        GatewayError::Query {
            message: message.into(),
            statement: snippet,
        }
    }

    /// Create a Connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        GatewayError::Connection(message.into())
    }

    /// Classify a driver error: transport-level failures are connection
    /// errors, everything else is a failed statement.
    pub fn from_driver(err: tiberius::error::Error, statement: &str) -> Self {
        use tiberius::error::Error;
        match err {
            Error::Io { .. } | Error::Tls(_) | Error::Routing { .. } => {
                GatewayError::Connection(err.to_string())
            }
            other => GatewayError::query(other.to_string(), statement),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            GatewayError::Config(_) | GatewayError::Yaml(_) | GatewayError::Json(_) => 1,
            GatewayError::Connection(_) => 2,
            GatewayError::Validation(_) => 3,
            GatewayError::Query { .. } => 4,
            GatewayError::Schema(_) => 5,
            GatewayError::Io(_) => 7,
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
