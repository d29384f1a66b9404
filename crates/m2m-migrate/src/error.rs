//! Error types for the migration library.

use thiserror::Error;

/// Exit code for configuration errors (missing env vars, bad settings file).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when reading from the source workspace fails.
pub const EXIT_SOURCE_ERROR: u8 = 2;
/// Exit code when writing to the destination workspace fails.
pub const EXIT_DESTINATION_ERROR: u8 = 3;
/// Exit code for API, authentication and transport errors outside a table.
pub const EXIT_API_ERROR: u8 = 4;
/// Exit code for local IO errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid settings, empty catalog scope, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more required environment variables are not set.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    /// OAuth token exchange failed.
    #[error("Authentication against {host} failed (HTTP {status}): {message}")]
    Auth {
        host: String,
        status: u16,
        message: String,
    },

    /// Transport-level HTTP error (connect, timeout, decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The workspace answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A SQL statement reached a terminal state other than SUCCEEDED.
    #[error("Statement {statement_id} ended in state {state}: {message}")]
    Statement {
        statement_id: String,
        state: String,
        message: String,
    },

    /// A SQL statement did not finish within the configured timeout.
    #[error("Statement {statement_id} still running after {waited_secs}s")]
    StatementTimeout {
        statement_id: String,
        waited_secs: u64,
    },

    /// A statement that must return a value returned no rows.
    #[error("Statement returned no rows: {0}")]
    EmptyResult(String),

    /// Fetching a table's creation statement from the source failed.
    #[error("Failed to read creation statement for {table}")]
    CreateStatement {
        table: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Creating a table on the destination failed.
    #[error("Failed to create table {table} on destination")]
    DestinationWrite {
        table: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// At least one workspace could not be reached.
    #[error("Health check failed: {0}")]
    HealthCheck(String),

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

impl MigrateError {
    /// Create a CreateStatement error for a source table.
    pub fn create_statement(table: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::CreateStatement {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Create a DestinationWrite error for a destination table.
    pub fn destination_write(table: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::DestinationWrite {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Whether retrying the failed call could plausibly succeed.
    ///
    /// Transport failures, throttling (429) and server errors (5xx) are
    /// transient. Client errors, failed statements and empty results are not.
    pub fn is_transient(&self) -> bool {
        match self {
            MigrateError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            MigrateError::Api { status, .. } | MigrateError::Auth { status, .. } => {
                *status == 429 || *status >= 500
            }
            MigrateError::StatementTimeout { .. } => true,
            _ => false,
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::MissingEnv(_) | MigrateError::Yaml(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::CreateStatement { .. } => EXIT_SOURCE_ERROR,
            MigrateError::DestinationWrite { .. } => EXIT_DESTINATION_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            _ => EXIT_API_ERROR,
        }
    }

    /// Format error with full details including error chain
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
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
