use thiserror::Error;

/// Errors surfaced to callers of [`crate::Engine::convert`].
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("empty html input")]
    EmptyInput,
    #[error("failed to write document package")]
    Package(#[from] PackageError),
}

/// Reasons an external converter did not produce a document. Always recovered
/// by the orchestrator; never returned to callers.
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("converter `{name}` is unavailable: {reason}")]
    Unavailable { name: String, reason: String },
    #[error("converter `{name}` failed: {reason}")]
    Failed { name: String, reason: String },
}

impl ConverterError {
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
