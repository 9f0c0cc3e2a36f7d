//! Summarizer identifiers and the generators that allocate them.
//!
//! A summarizer id is opaque to the engine: it is compared for equality and nothing else.
//! Where ids come from is decided by whoever builds the store, through the [`IdGenerator`]
//! trait:
//!
//! - [`UuidIdGenerator`] produces random version 4 UUIDs in canonical form
//!   (32 lowercase hex characters, no hyphens), e.g. `550e8400e29b41d4a716446655440000`.
//! - [`SequentialIdGenerator`] produces `<prefix>-<n>` from a monotonic counter, which keeps
//!   test output deterministic.
//!
//! Ids supplied from outside (snapshot files, CLI input) only need to be non-empty; they are
//! not required to be canonical UUIDs.

mod service;

// Re-export public types
pub use service::{IdGenerator, SequentialIdGenerator, SummarizerId, UuidIdGenerator};

/// Error type for id operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for id operations.
pub type IdResult<T> = Result<T, IdError>;
