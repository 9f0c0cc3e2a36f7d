//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! core never reads environment variables while a transfer is running; hosts call the
//! `*_from_env_value` helpers with whatever they read at startup.

use crate::constants::{MAX_WORKERS_LIMIT, SEQUENTIAL_ID_PREFIX};
use crate::{TransferError, TransferResult};
use console_uuid::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
use std::num::NonZeroUsize;

/// How the executor schedules the tasks of one transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One task at a time, in plan order.
    #[default]
    Sequential,
    /// Up to `max_workers` transformations at once; writes and progress stay in plan order.
    Parallel { max_workers: NonZeroUsize },
}

impl ExecutionMode {
    /// Number of tasks the executor works on at once.
    pub fn window(&self) -> usize {
        match self {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel { max_workers } => max_workers.get(),
        }
    }
}

/// Which id generator a store built from this configuration uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequential,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    execution_mode: ExecutionMode,
    id_strategy: IdStrategy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidInput`] if a parallel mode asks for more than
    /// [`MAX_WORKERS_LIMIT`] workers.
    pub fn new(execution_mode: ExecutionMode, id_strategy: IdStrategy) -> TransferResult<Self> {
        if execution_mode.window() > MAX_WORKERS_LIMIT {
            return Err(TransferError::InvalidInput(format!(
                "max workers cannot exceed {MAX_WORKERS_LIMIT}"
            )));
        }

        Ok(Self {
            execution_mode,
            id_strategy,
        })
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn id_strategy(&self) -> IdStrategy {
        self.id_strategy
    }

    /// Build the id generator this configuration asks for.
    pub fn id_generator(&self) -> Box<dyn IdGenerator> {
        match self.id_strategy {
            IdStrategy::Uuid => Box::new(UuidIdGenerator::new()),
            IdStrategy::Sequential => Box::new(SequentialIdGenerator::new(SEQUENTIAL_ID_PREFIX)),
        }
    }
}

/// Parse the execution mode from an optional worker-count value.
///
/// `None`, empty/whitespace, or `1` select [`ExecutionMode::Sequential`]; any larger count up to
/// [`MAX_WORKERS_LIMIT`] selects [`ExecutionMode::Parallel`].
pub fn execution_mode_from_env_value(value: Option<String>) -> TransferResult<ExecutionMode> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(value) = value else {
        return Ok(ExecutionMode::Sequential);
    };

    let workers: usize = value.parse().map_err(|_| {
        TransferError::InvalidInput(format!("max workers must be a positive integer, got '{value}'"))
    })?;

    match workers {
        0 => Err(TransferError::InvalidInput(
            "max workers must be at least 1".into(),
        )),
        1 => Ok(ExecutionMode::Sequential),
        n if n > MAX_WORKERS_LIMIT => Err(TransferError::InvalidInput(format!(
            "max workers cannot exceed {MAX_WORKERS_LIMIT}, got {n}"
        ))),
        n => Ok(ExecutionMode::Parallel {
            max_workers: NonZeroUsize::new(n).ok_or_else(|| {
                TransferError::InvalidInput("max workers must be at least 1".into())
            })?,
        }),
    }
}

/// Parse the id strategy from an optional value (`uuid` or `sequential`, case-insensitive).
pub fn id_strategy_from_env_value(value: Option<String>) -> TransferResult<IdStrategy> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None | Some("uuid") => Ok(IdStrategy::Uuid),
        Some("sequential") => Ok(IdStrategy::Sequential),
        Some(other) => Err(TransferError::InvalidInput(format!(
            "unknown id strategy '{other}' (expected 'uuid' or 'sequential')"
        ))),
    }
}
