//! Transfer planner.
//!
//! Expands a user-level transfer request into an ordered list of [`TransferTask`]s. Planning
//! reads the store and the doctor directory but changes nothing; any error here means no task
//! runs.
//!
//! Task order is targets first, then sources: every copy for the first target doctor comes
//! before any copy for the second. Given the same store contents and request the plan is
//! identical, which keeps progress output reproducible.

use crate::directory::DoctorDirectory;
use crate::store::SummarizerStore;
use crate::summarizer::CopyType;
use crate::transformer::TargetContext;
use crate::{DoctorId, EhrSystem, SummarizerId, TransferError, TransferResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// What the user asked to copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_doctor_id: DoctorId,
    #[serde(default)]
    pub selected_summarizer_ids: Vec<SummarizerId>,
    pub target_doctor_ids: Vec<DoctorId>,
    pub copy_type: CopyType,
}

/// One planned copy of one source summarizer to one target doctor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTask {
    source_summarizer_id: SummarizerId,
    target_doctor_id: DoctorId,
    target_doctor_name: String,
    target_ehr: EhrSystem,
    copy_type: CopyType,
}

impl TransferTask {
    pub fn new(source_summarizer_id: SummarizerId, target: &TargetContext, copy_type: CopyType) -> Self {
        Self {
            source_summarizer_id,
            target_doctor_id: target.doctor_id.clone(),
            target_doctor_name: target.doctor_name.clone(),
            target_ehr: target.ehr.clone(),
            copy_type,
        }
    }

    pub fn source_summarizer_id(&self) -> &SummarizerId {
        &self.source_summarizer_id
    }

    pub fn target_doctor_id(&self) -> &DoctorId {
        &self.target_doctor_id
    }

    pub fn target_doctor_name(&self) -> &str {
        &self.target_doctor_name
    }

    pub fn target_ehr(&self) -> &EhrSystem {
        &self.target_ehr
    }

    pub fn copy_type(&self) -> CopyType {
        self.copy_type
    }

    pub fn target(&self) -> TargetContext {
        TargetContext {
            doctor_id: self.target_doctor_id.clone(),
            doctor_name: self.target_doctor_name.clone(),
            ehr: self.target_ehr.clone(),
        }
    }
}

/// Ordered tasks produced by [`TransferPlanner::plan`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferPlan {
    tasks: Vec<TransferTask>,
}

impl TransferPlan {
    pub fn tasks(&self) -> &[TransferTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_tasks(self) -> Vec<TransferTask> {
        self.tasks
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TransferPlanner;

impl TransferPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Expands `request` into tasks.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidSelection`] if no target doctor was given.
    /// - [`TransferError::DoctorNotFound`] if the source or any target doctor is unknown.
    /// - [`TransferError::InvalidSelection`] if a selected summarizer belongs to another doctor.
    ///
    /// Selected ids missing from the store are not rejected here; they fail their own tasks
    /// during execution.
    pub fn plan(
        &self,
        store: &SummarizerStore,
        directory: &dyn DoctorDirectory,
        request: &TransferRequest,
    ) -> TransferResult<TransferPlan> {
        if request.target_doctor_ids.is_empty() {
            return Err(TransferError::InvalidSelection(
                "at least one target doctor is required".into(),
            ));
        }

        directory
            .doctor(&request.source_doctor_id)
            .ok_or_else(|| TransferError::DoctorNotFound(request.source_doctor_id.clone()))?;

        let mut targets = Vec::new();
        for target_id in dedup_in_order(&request.target_doctor_ids) {
            let doctor = directory
                .doctor(target_id)
                .ok_or_else(|| TransferError::DoctorNotFound(target_id.clone()))?;
            if doctor.id == request.source_doctor_id {
                tracing::debug!(doctor_id = %doctor.id, "skipping self-copy target");
                continue;
            }
            targets.push(TargetContext::from(&doctor));
        }

        let sources = self.resolve_sources(store, request)?;

        let tasks: Vec<TransferTask> = targets
            .iter()
            .flat_map(|target| {
                sources
                    .iter()
                    .map(move |source| TransferTask::new(source.clone(), target, request.copy_type))
            })
            .collect();

        tracing::debug!(
            source_doctor_id = %request.source_doctor_id,
            copy_type = %request.copy_type,
            sources = sources.len(),
            targets = targets.len(),
            tasks = tasks.len(),
            "transfer planned"
        );

        Ok(TransferPlan { tasks })
    }

    fn resolve_sources(
        &self,
        store: &SummarizerStore,
        request: &TransferRequest,
    ) -> TransferResult<Vec<SummarizerId>> {
        let owned_by_source = || -> Vec<SummarizerId> {
            store
                .list_by_doctor(&request.source_doctor_id)
                .into_iter()
                .map(|summarizer| summarizer.id.clone())
                .collect()
        };

        match request.copy_type {
            CopyType::Full => Ok(owned_by_source()),
            CopyType::Templates if request.selected_summarizer_ids.is_empty() => {
                Ok(owned_by_source())
            }
            CopyType::Summarizers | CopyType::Templates => {
                dedup_in_order(&request.selected_summarizer_ids)
                    .into_iter()
                    .map(|id| match store.get(id) {
                        Some(existing) if existing.doctor_id != request.source_doctor_id => {
                            Err(TransferError::InvalidSelection(format!(
                                "summarizer {id} belongs to doctor {}, not {}",
                                existing.doctor_id, request.source_doctor_id
                            )))
                        }
                        _ => Ok(id.clone()),
                    })
                    .collect()
            }
        }
    }
}

/// Drops repeated values, keeping the first occurrence of each.
fn dedup_in_order<T: Eq + Hash>(values: &[T]) -> Vec<&T> {
    let mut seen = HashSet::new();
    values.iter().filter(|value| seen.insert(*value)).collect()
}
