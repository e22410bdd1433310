// Error types for sectorscope

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum SectorScopeError {
    // Errors raised by the analysis core
    #[snafu(display("Invalid input: {reason}"))]
    Validation { reason: String },
    #[snafu(display("Not found: {reason}"))]
    NotFound { reason: String },
    #[snafu(display("Ambiguous input '{query}', candidates: {candidates}"))]
    AmbiguousInput { query: String, candidates: String },

    // Artifact store errors
    #[snafu(display("Error accessing artifact {path}"))]
    ArtifactIo { path: String, source: io::Error },
    #[snafu(display("Error parsing artifact {path}"))]
    ArtifactParse {
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("Error loading telemetry file {path}"))]
    TelemetryLoader { path: String, source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory"))]
    NoDataDir,
    #[snafu(display("Error writing config file"))]
    ConfigIO { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerialize { source: serde_json::Error },

    // Session cache errors
    #[snafu(display("Failed to load session {key}: {reason}"))]
    SessionLoad { key: String, reason: String },
}

impl SectorScopeError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        SectorScopeError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(reason: impl Into<String>) -> Self {
        SectorScopeError::NotFound {
            reason: reason.into(),
        }
    }
}
