//! # Console Core
//!
//! Bulk configuration transfer engine for per-doctor summarizer records.
//!
//! The engine copies summarizer configurations from one doctor to one or more others:
//! - [`SummarizerStore`]: owned, in-memory collection of summarizer records
//! - [`transformer`]: pure adaptation of a record to a target doctor and EHR system
//! - [`TransferPlanner`]: expands a request into an ordered task list
//! - [`TransferExecutor`]: runs tasks with progress, cancellation and per-task isolation
//! - [`TransferService`]: plan + execute using the startup [`CoreConfig`]
//!
//! **No host concerns**: file formats, rendering, and transport belong to the host (see the
//! `summarizer-console` binary).

pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod executor;
pub mod planner;
pub mod service;
pub mod store;
pub mod summarizer;
pub mod transformer;

pub use config::{CoreConfig, ExecutionMode, IdStrategy};
pub use directory::{Doctor, DoctorDirectory, DoctorFilter, InMemoryDirectory};
pub use error::{TransferError, TransferResult};
pub use executor::{
    CancellationToken, ExecutorState, TaskFailure, TransferExecutor, TransferProgress,
    TransferReport,
};
pub use planner::{TransferPlan, TransferPlanner, TransferRequest, TransferTask};
pub use service::TransferService;
pub use store::SummarizerStore;
pub use summarizer::{CopyType, FieldMap, NewSummarizer, Summarizer, SummarizerPatch};
pub use transformer::{ResourceScope, TargetContext};

pub use console_types::{DoctorId, EhrSystem, NonEmptyText, TextError};
pub use console_uuid::{
    IdError, IdGenerator, SequentialIdGenerator, SummarizerId, UuidIdGenerator,
};
