//! Transfer service: plan and execute in one call.
//!
//! This is the entry point hosts use for bulk copies. Planning errors are returned before
//! anything is written; once execution starts, the result is always a report.

use crate::config::CoreConfig;
use crate::directory::DoctorDirectory;
use crate::executor::{CancellationToken, TransferExecutor, TransferProgress, TransferReport};
use crate::planner::{TransferPlan, TransferPlanner, TransferRequest};
use crate::store::SummarizerStore;
use crate::TransferResult;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct TransferService {
    cfg: Arc<CoreConfig>,
    planner: TransferPlanner,
}

impl TransferService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            planner: TransferPlanner::new(),
        }
    }

    /// Plans `request` without running it, e.g. to show the task count before confirming.
    pub fn preview(
        &self,
        store: &SummarizerStore,
        directory: &dyn DoctorDirectory,
        request: &TransferRequest,
    ) -> TransferResult<TransferPlan> {
        self.planner.plan(store, directory, request)
    }

    /// Plans and runs `request` against `store`.
    ///
    /// # Errors
    ///
    /// Only planning errors ([`TransferError::InvalidSelection`](crate::TransferError::InvalidSelection),
    /// [`TransferError::DoctorNotFound`](crate::TransferError::DoctorNotFound)) are returned;
    /// per-task failures are listed in the report.
    pub fn transfer(
        &self,
        store: &mut SummarizerStore,
        directory: &dyn DoctorDirectory,
        request: &TransferRequest,
        progress_fn: Option<&dyn Fn(TransferProgress)>,
        cancel: Option<&CancellationToken>,
    ) -> TransferResult<TransferReport> {
        let plan = self.planner.plan(store, directory, request)?;

        let mut executor = TransferExecutor::new(self.cfg.execution_mode());
        let report = executor.execute(store, plan.into_tasks(), progress_fn, cancel);

        tracing::info!(
            source_doctor_id = %request.source_doctor_id,
            copy_type = %request.copy_type,
            succeeded = report.succeeded,
            failed = report.failed_count(),
            duration_ms = report.duration_ms(),
            "bulk transfer done"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionMode, IdStrategy};
    use crate::directory::{Doctor, InMemoryDirectory};
    use crate::executor::ExecutorState;
    use crate::summarizer::{CopyType, NewSummarizer};
    use crate::{DoctorId, EhrSystem, SummarizerId, TransferError};
    use console_uuid::SequentialIdGenerator;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::num::NonZeroUsize;

    fn doctor_id(value: &str) -> DoctorId {
        DoctorId::new(value).unwrap()
    }

    fn sid(value: &str) -> SummarizerId {
        SummarizerId::parse(value).unwrap()
    }

    fn directory() -> InMemoryDirectory {
        let doctor = |id: &str, ehr: &str| Doctor {
            id: doctor_id(id),
            name: format!("Dr {id}"),
            ehr: EhrSystem::new(ehr).unwrap(),
            practice: Some("Northside".into()),
        };
        InMemoryDirectory::new(vec![
            doctor("D1", "Epic"),
            doctor("D2", "Epic"),
            doctor("D3", "Cerner"),
        ])
        .unwrap()
    }

    fn store() -> SummarizerStore {
        let mut store = SummarizerStore::new(Box::new(SequentialIdGenerator::new("copy")));
        for (id, resource) in [("S1", "epic-inbox"), ("S2", "epic-labs")] {
            store
                .add(
                    NewSummarizer::new(doctor_id("D1"), "Dr D1", EhrSystem::new("Epic").unwrap())
                        .with_id(sid(id))
                        .with_resource(resource)
                        .with_active(false)
                        .with_attribute("prompt", json!(format!("summarise {id}")))
                        .with_template("layout", json!("bullets")),
                )
                .unwrap();
        }
        store
    }

    fn service(mode: ExecutionMode) -> TransferService {
        TransferService::new(Arc::new(CoreConfig::new(mode, IdStrategy::Sequential).unwrap()))
    }

    fn request(copy_type: CopyType, selected: &[&str], targets: &[&str]) -> TransferRequest {
        TransferRequest {
            source_doctor_id: doctor_id("D1"),
            selected_summarizer_ids: selected.iter().map(|s| sid(s)).collect(),
            target_doctor_ids: targets.iter().map(|d| doctor_id(d)).collect(),
            copy_type,
        }
    }

    #[test]
    fn end_to_end_copy_across_systems() {
        let mut store = store();
        let existing: HashSet<_> = store.iter().map(|s| s.id.clone()).collect();

        let report = service(ExecutionMode::Sequential)
            .transfer(
                &mut store,
                &directory(),
                &request(CopyType::Summarizers, &["S1", "S2"], &["D2", "D3"]),
                None,
                None,
            )
            .unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed_count(), 0);
        assert_eq!(report.state, ExecutorState::Completed);

        for id in &report.created_ids {
            let copy = store.get(id).unwrap();
            assert!(copy.active);
            assert!(!existing.contains(id));
            match copy.doctor_id.as_str() {
                "D2" => assert!(copy.selected_resource.is_some()),
                "D3" => assert_eq!(copy.selected_resource, None),
                other => panic!("unexpected target {other}"),
            }
        }

        let d2: Vec<_> = store
            .list_by_doctor(&doctor_id("D2"))
            .into_iter()
            .map(|s| s.selected_resource.clone())
            .collect();
        assert_eq!(
            d2,
            vec![Some("epic-inbox".to_string()), Some("epic-labs".to_string())]
        );
        assert_eq!(store.list_by_doctor(&doctor_id("D3")).len(), 2);
    }

    #[test]
    fn full_copy_carries_templates_and_attributes() {
        let mut store = store();

        let report = service(ExecutionMode::Sequential)
            .transfer(&mut store, &directory(), &request(CopyType::Full, &[], &["D3"]), None, None)
            .unwrap();

        assert_eq!(report.succeeded, 2);
        for copy in store.list_by_doctor(&doctor_id("D3")) {
            assert_eq!(copy.templates["layout"], json!("bullets"));
            assert!(copy.attributes.contains_key("prompt"));
            assert_eq!(copy.ehr.as_str(), "Cerner");
        }
    }

    #[test]
    fn templates_copy_leaves_summarizer_fields_behind() {
        let mut store = store();

        service(ExecutionMode::Sequential)
            .transfer(&mut store, &directory(), &request(CopyType::Templates, &["S2"], &["D2"]), None, None)
            .unwrap();

        let copies = store.list_by_doctor(&doctor_id("D2"));
        assert_eq!(copies.len(), 1);
        assert!(copies[0].attributes.is_empty());
        assert_eq!(copies[0].selected_resource, None);
        assert_eq!(copies[0].templates["layout"], json!("bullets"));
    }

    #[test]
    fn planning_error_runs_nothing() {
        let mut store = store();
        let calls = RefCell::new(0);
        let count = |_: TransferProgress| *calls.borrow_mut() += 1;

        let err = service(ExecutionMode::Sequential)
            .transfer(&mut store, &directory(), &request(CopyType::Summarizers, &["S1"], &[]), Some(&count), None)
            .expect_err("empty target list");

        assert!(matches!(err, TransferError::InvalidSelection(_)));
        assert_eq!(store.len(), 2);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn source_deleted_after_preview_fails_only_its_tasks() {
        let mut store = store();
        let service = service(ExecutionMode::Sequential);
        let req = request(CopyType::Summarizers, &["S1", "S2"], &["D2"]);

        assert_eq!(service.preview(&store, &directory(), &req).unwrap().len(), 2);
        store.delete(&sid("S2"));

        let report = service.transfer(&mut store, &directory(), &req, None, None).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
    }

    #[test]
    fn parallel_service_produces_same_shape_as_sequential() {
        let mode = ExecutionMode::Parallel {
            max_workers: NonZeroUsize::new(3).unwrap(),
        };
        let mut parallel_store = store();
        let mut sequential_store = store();
        let req = request(CopyType::Summarizers, &["S1", "S2"], &["D2", "D3"]);

        let parallel = service(mode)
            .transfer(&mut parallel_store, &directory(), &req, None, None)
            .unwrap();
        let sequential = service(ExecutionMode::Sequential)
            .transfer(&mut sequential_store, &directory(), &req, None, None)
            .unwrap();

        assert_eq!(parallel.created_ids, sequential.created_ids);
        assert_eq!(
            parallel_store.iter().cloned().collect::<Vec<_>>(),
            sequential_store.iter().cloned().collect::<Vec<_>>()
        );
    }
}
