use crate::{DoctorId, SummarizerId};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("source summarizer not found: {0}")]
    SourceNotFound(SummarizerId),
    #[error("doctor not found: {0}")]
    DoctorNotFound(DoctorId),

    #[error("summarizer id already in use: {0}")]
    DuplicateId(SummarizerId),
    #[error("failed to allocate a unique summarizer id after {attempts} attempts")]
    IdAllocation { attempts: usize },

    #[error("copy worker failed: {0}")]
    Worker(String),

    #[error("invalid text: {0}")]
    Text(#[from] console_types::TextError),
    #[error("invalid id: {0}")]
    Id(#[from] console_uuid::IdError),
}

impl TransferError {
    /// Returns true for errors that reference a record or doctor that does not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TransferError::SourceNotFound(_) | TransferError::DoctorNotFound(_)
        )
    }
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;
