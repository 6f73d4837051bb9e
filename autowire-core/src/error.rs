use std::fmt;
use std::path::PathBuf;

/// Fatal analyzer failures.
///
/// Everything else — malformed source files, unresolvable dependencies,
/// graph problems — is accumulated as [`Issue`](crate::validator::Issue)s
/// and surfaced through the returned report, never by failing the run.
#[derive(Debug)]
pub enum AnalyzerError {
    /// A configured scan root could not be read at all.
    ScanRoot { path: PathBuf, message: String },
    /// The artifact directory could not be written after several retries.
    ArtifactWrite {
        path: PathBuf,
        attempts: u32,
        message: String,
    },
    /// A rebuild was requested while another one was still running and
    /// no previous result was available to hand back.
    RebuildInProgress,
    /// The `autowire.yaml` options file was present but malformed.
    Options { path: PathBuf, message: String },
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::ScanRoot { path, message } => {
                write!(f, "Cannot read scan root '{}': {}", path.display(), message)
            }
            AnalyzerError::ArtifactWrite {
                path,
                attempts,
                message,
            } => {
                write!(
                    f,
                    "Cannot write artifact directory '{}' after {} attempts: {}",
                    path.display(),
                    attempts,
                    message
                )
            }
            AnalyzerError::RebuildInProgress => {
                write!(f, "A rebuild is already in progress")
            }
            AnalyzerError::Options { path, message } => {
                write!(f, "Invalid options file '{}': {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for AnalyzerError {}
