//! Transfer executor.
//!
//! Runs a planned task list against the store:
//!
//! ```text
//! Idle -> Running -> Completed
//!                 -> Cancelled
//! ```
//!
//! After every task, successful or not, the executor emits a [`TransferProgress`] with
//! `current` one higher than the last. A failing task is recorded in the report and the batch
//! moves on. Cancellation is checked between tasks (between windows in parallel mode); work
//! already started is finished and kept.
//!
//! In [`ExecutionMode::Parallel`] the executor takes up to `max_workers` tasks at a time:
//! ids are allocated one after another on the calling thread, the transformations run on
//! scoped threads, and results are written and reported back in plan order.

use crate::config::ExecutionMode;
use crate::planner::TransferTask;
use crate::store::SummarizerStore;
use crate::summarizer::Summarizer;
use crate::transformer::transform;
use crate::{SummarizerId, TransferError, TransferResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Shared flag a host sets to stop a running transfer.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress after a task finished. `total` is always greater than zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TransferProgress {
    pub current: usize,
    pub total: usize,
}

impl TransferProgress {
    /// Whole-number percentage of tasks finished.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (100 * self.current / self.total).min(100) as u8
    }
}

/// A task that did not produce a copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFailure {
    /// Position of the task in the plan.
    pub index: usize,
    pub task: TransferTask,
    pub reason: String,
}

/// Outcome of one transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    /// Tasks in the plan.
    pub total: usize,
    /// Tasks that ran, successfully or not. Less than `total` only after cancellation.
    pub processed: usize,
    pub succeeded: usize,
    pub failed: Vec<TaskFailure>,
    /// Ids of the new records, in plan order.
    pub created_ids: Vec<SummarizerId>,
    pub state: ExecutorState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TransferReport {
    fn started(total: usize) -> Self {
        let now = Utc::now();
        Self {
            total,
            processed: 0,
            succeeded: 0,
            failed: Vec::new(),
            created_ids: Vec::new(),
            state: ExecutorState::Running,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn was_cancelled(&self) -> bool {
        self.state == ExecutorState::Cancelled
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Debug)]
pub struct TransferExecutor {
    mode: ExecutionMode,
    state: ExecutorState,
}

impl TransferExecutor {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            state: ExecutorState::Idle,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Runs `tasks` against `store`.
    ///
    /// Never fails as a whole: per-task errors are collected in the returned report.
    pub fn execute(
        &mut self,
        store: &mut SummarizerStore,
        tasks: Vec<TransferTask>,
        progress_fn: Option<&dyn Fn(TransferProgress)>,
        cancel: Option<&CancellationToken>,
    ) -> TransferReport {
        let total = tasks.len();
        self.state = ExecutorState::Running;
        let mut report = TransferReport::started(total);

        tracing::info!(total, window = self.mode.window(), "transfer started");

        let mut pending = tasks.into_iter().enumerate().peekable();
        while pending.peek().is_some() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                tracing::info!(
                    processed = report.processed,
                    total,
                    "transfer cancelled"
                );
                self.state = ExecutorState::Cancelled;
                break;
            }

            let window: Vec<(usize, TransferTask)> =
                pending.by_ref().take(self.mode.window()).collect();
            let outcomes = self.run_window(store, &window);

            for ((index, task), outcome) in window.into_iter().zip(outcomes) {
                let written = outcome.and_then(|copy| {
                    let id = copy.id.clone();
                    store.insert(copy)?;
                    Ok(id)
                });

                match written {
                    Ok(id) => {
                        tracing::debug!(
                            index,
                            source_id = %task.source_summarizer_id(),
                            target_doctor_id = %task.target_doctor_id(),
                            new_id = %id,
                            "summarizer copied"
                        );
                        report.succeeded += 1;
                        report.created_ids.push(id);
                    }
                    Err(err) => {
                        tracing::warn!(
                            index,
                            source_id = %task.source_summarizer_id(),
                            target_doctor_id = %task.target_doctor_id(),
                            error = %err,
                            "copy task failed"
                        );
                        report.failed.push(TaskFailure {
                            index,
                            task,
                            reason: err.to_string(),
                        });
                    }
                }

                report.processed += 1;
                if let Some(progress) = progress_fn {
                    progress(TransferProgress {
                        current: report.processed,
                        total,
                    });
                }
            }
        }

        if self.state == ExecutorState::Running {
            self.state = ExecutorState::Completed;
        }
        report.state = self.state;
        report.finished_at = Utc::now();

        tracing::info!(
            total,
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed_count(),
            state = ?report.state,
            "transfer finished"
        );

        report
    }

    /// Produces one copy per task in `window`, without writing anything.
    fn run_window(
        &self,
        store: &mut SummarizerStore,
        window: &[(usize, TransferTask)],
    ) -> Vec<TransferResult<Summarizer>> {
        // Ids first, on this thread, so no two tasks can be handed the same one.
        let mut reserved = HashSet::new();
        let ids: Vec<TransferResult<SummarizerId>> = window
            .iter()
            .map(|(_, task)| {
                if !store.contains(task.source_summarizer_id()) {
                    return Err(TransferError::SourceNotFound(
                        task.source_summarizer_id().clone(),
                    ));
                }
                let id = store.allocate_id_excluding(&reserved)?;
                reserved.insert(id.clone());
                Ok(id)
            })
            .collect();

        let store: &SummarizerStore = store;
        let jobs: Vec<TransferResult<(&Summarizer, &TransferTask, SummarizerId)>> = window
            .iter()
            .zip(ids)
            .map(|((_, task), id)| {
                let id = id?;
                let source = store
                    .get(task.source_summarizer_id())
                    .ok_or_else(|| TransferError::SourceNotFound(task.source_summarizer_id().clone()))?;
                Ok((source, task, id))
            })
            .collect();

        if jobs.len() <= 1 {
            return jobs.into_iter().map(|job| job.map(copy_for)).collect();
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .into_iter()
                .map(|job| scope.spawn(move || job.map(copy_for)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(TransferError::Worker("copy worker panicked".into()))
                    })
                })
                .collect()
        })
    }
}

fn copy_for((source, task, id): (&Summarizer, &TransferTask, SummarizerId)) -> Summarizer {
    transform(source, &task.target(), task.copy_type(), id)
}

impl Default for TransferExecutor {
    fn default() -> Self {
        Self::new(ExecutionMode::Sequential)
    }
}
