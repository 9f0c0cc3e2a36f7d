//! Copy transformer.
//!
//! Turns a source summarizer into a new record owned by a target doctor. Nothing here touches
//! the store: the caller allocates the new id and writes the result, which keeps every
//! function in this module pure.
//!
//! ## System boundary
//!
//! `selected_resource` is a handle into one EHR system. When source and target share the
//! system the handle is carried over; when they differ it is cleared, so a copy never points
//! at a resource that does not exist on the target side. Re-mapping the handle is left to the
//! host.

use crate::directory::Doctor;
use crate::store::SummarizerStore;
use crate::summarizer::{CopyType, FieldMap, Summarizer};
use crate::{DoctorId, EhrSystem, SummarizerId, TransferError, TransferResult};

/// The doctor a copy is being made for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetContext {
    pub doctor_id: DoctorId,
    pub doctor_name: String,
    pub ehr: EhrSystem,
}

impl From<&Doctor> for TargetContext {
    fn from(doctor: &Doctor) -> Self {
        Self {
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            ehr: doctor.ehr.clone(),
        }
    }
}

/// Whether a resource handle stays valid when moving between two EHR systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceScope {
    /// Same system: the handle is still valid.
    Shared,
    /// Different systems: the handle must be dropped.
    Mismatch,
}

pub fn resource_scope(source: &EhrSystem, target: &EhrSystem) -> ResourceScope {
    if source == target {
        ResourceScope::Shared
    } else {
        ResourceScope::Mismatch
    }
}

/// Builds the copy of `source` for `target` under `new_id`.
///
/// The copy is always active. `copy_type` decides which opaque maps travel:
/// - [`CopyType::Summarizers`]: attributes only, template configurations dropped
/// - [`CopyType::Full`]: attributes and template configurations
/// - [`CopyType::Templates`]: template configurations only, and no resource handle
pub fn transform(
    source: &Summarizer,
    target: &TargetContext,
    copy_type: CopyType,
    new_id: SummarizerId,
) -> Summarizer {
    let mut copy = source.clone();
    copy.id = new_id;
    copy.doctor_id = target.doctor_id.clone();
    copy.doctor_name = target.doctor_name.clone();
    copy.ehr = target.ehr.clone();

    if resource_scope(&source.ehr, &target.ehr) == ResourceScope::Mismatch {
        if let Some(resource) = copy.selected_resource.take() {
            tracing::debug!(
                source_id = %source.id,
                source_ehr = %source.ehr,
                target_ehr = %target.ehr,
                resource = %resource,
                "cleared resource handle on cross-system copy"
            );
        }
    }

    copy.active = true;

    match copy_type {
        CopyType::Summarizers => copy.templates = FieldMap::new(),
        CopyType::Full => {}
        CopyType::Templates => {
            copy.attributes = FieldMap::new();
            copy.selected_resource = None;
        }
    }

    copy
}

/// Looks `source_id` up in `store` and transforms it.
///
/// # Errors
///
/// Returns [`TransferError::SourceNotFound`] if the store holds no such record.
pub fn transform_by_id(
    store: &SummarizerStore,
    source_id: &SummarizerId,
    target: &TargetContext,
    copy_type: CopyType,
    new_id: SummarizerId,
) -> TransferResult<Summarizer> {
    let source = store
        .get(source_id)
        .ok_or_else(|| TransferError::SourceNotFound(source_id.clone()))?;
    Ok(transform(source, target, copy_type, new_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::NewSummarizer;
    use console_uuid::SequentialIdGenerator;
    use serde_json::json;

    fn id(value: &str) -> SummarizerId {
        SummarizerId::parse(value).unwrap()
    }

    fn source(ehr: &str, active: bool) -> Summarizer {
        NewSummarizer::new(DoctorId::new("D1").unwrap(), "Dr One", EhrSystem::new(ehr).unwrap())
            .with_name("Lab results")
            .with_resource("folder-42")
            .with_active(active)
            .with_attribute("prompt", json!("List abnormal values"))
            .with_template("layout", json!("table"))
            .into_summarizer(id("S1"))
    }

    fn target(doctor: &str, ehr: &str) -> TargetContext {
        TargetContext {
            doctor_id: DoctorId::new(doctor).unwrap(),
            doctor_name: format!("Dr {doctor}"),
            ehr: EhrSystem::new(ehr).unwrap(),
        }
    }

    #[test]
    fn same_system_keeps_resource_handle() {
        let copy = transform(&source("Epic", true), &target("D2", "Epic"), CopyType::Full, id("C1"));

        assert_eq!(copy.selected_resource.as_deref(), Some("folder-42"));
        assert_eq!(copy.ehr.as_str(), "Epic");
    }

    #[test]
    fn cross_system_clears_resource_handle() {
        let copy = transform(&source("Epic", true), &target("D3", "Cerner"), CopyType::Full, id("C1"));

        assert_eq!(copy.selected_resource, None);
        assert_eq!(copy.ehr.as_str(), "Cerner");
    }

    #[test]
    fn copy_is_reassigned_and_activated() {
        let original = source("Epic", false);
        let copy = transform(&original, &target("D2", "Epic"), CopyType::Full, id("C1"));

        assert_eq!(copy.id, id("C1"));
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.doctor_id.as_str(), "D2");
        assert_eq!(copy.doctor_name, "Dr D2");
        assert!(copy.active);
        assert_eq!(copy.name, original.name);
        assert_eq!(copy.attributes, original.attributes);
        assert_eq!(copy.templates, original.templates);
    }

    #[test]
    fn summarizers_copy_drops_templates() {
        let copy = transform(
            &source("Epic", true),
            &target("D2", "Epic"),
            CopyType::Summarizers,
            id("C1"),
        );

        assert!(copy.templates.is_empty());
        assert_eq!(copy.attributes["prompt"], json!("List abnormal values"));
        assert_eq!(copy.selected_resource.as_deref(), Some("folder-42"));
    }

    #[test]
    fn templates_copy_carries_only_template_fields() {
        let copy = transform(
            &source("Epic", false),
            &target("D2", "Epic"),
            CopyType::Templates,
            id("C1"),
        );

        assert!(copy.attributes.is_empty());
        assert_eq!(copy.templates["layout"], json!("table"));
        assert_eq!(copy.selected_resource, None);
        assert!(copy.active);
    }

    #[test]
    fn transform_does_not_modify_source() {
        let original = source("Epic", false);
        let before = original.clone();
        let _ = transform(&original, &target("D3", "Cerner"), CopyType::Templates, id("C1"));

        assert_eq!(original, before);
    }

    #[test]
    fn transform_by_id_reports_missing_source() {
        let store = SummarizerStore::new(Box::new(SequentialIdGenerator::default()));

        let err = transform_by_id(&store, &id("S404"), &target("D2", "Epic"), CopyType::Full, id("C1"))
            .expect_err("missing source should fail");

        assert!(matches!(err, TransferError::SourceNotFound(ref missing) if missing.as_str() == "S404"));
    }

    #[test]
    fn resource_scope_compares_systems() {
        let epic = EhrSystem::new("Epic").unwrap();
        let cerner = EhrSystem::new("Cerner").unwrap();

        assert_eq!(resource_scope(&epic, &epic), ResourceScope::Shared);
        assert_eq!(resource_scope(&epic, &cerner), ResourceScope::Mismatch);
    }
}
