//! Summarizer records and the copy types a transfer can apply to them.
//!
//! A summarizer is a per-doctor extraction configuration. Besides the fields the engine
//! reasons about (`doctor_id`, `ehr`, `selected_resource`, `active`) a record carries two
//! opaque maps:
//!
//! - `attributes`: summarizer content such as prompts or output settings
//! - `templates`: the template configurations associated with the summarizer
//!
//! The engine never looks inside either map; the copy type decides which of them travels
//! with a copy.

use crate::{DoctorId, EhrSystem, SummarizerId, TransferError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Opaque field map carried on a summarizer.
pub type FieldMap = BTreeMap<String, Value>;

/// A stored summarizer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summarizer {
    pub id: SummarizerId,
    pub doctor_id: DoctorId,
    pub doctor_name: String,
    #[serde(default)]
    pub name: String,
    pub ehr: EhrSystem,
    /// Resource handle, only meaningful within `ehr`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_resource: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: FieldMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: FieldMap,
}

/// Input to [`SummarizerStore::add`](crate::SummarizerStore::add).
///
/// `id` is optional; the store generates one when it is absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSummarizer {
    #[serde(default)]
    pub id: Option<SummarizerId>,
    pub doctor_id: DoctorId,
    pub doctor_name: String,
    #[serde(default)]
    pub name: String,
    pub ehr: EhrSystem,
    #[serde(default)]
    pub selected_resource: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub attributes: FieldMap,
    #[serde(default)]
    pub templates: FieldMap,
}

fn default_active() -> bool {
    true
}

impl NewSummarizer {
    /// Start a new, active summarizer for `doctor_id` on `ehr`.
    pub fn new(doctor_id: DoctorId, doctor_name: impl Into<String>, ehr: EhrSystem) -> Self {
        Self {
            id: None,
            doctor_id,
            doctor_name: doctor_name.into(),
            name: String::new(),
            ehr,
            selected_resource: None,
            active: true,
            attributes: FieldMap::new(),
            templates: FieldMap::new(),
        }
    }

    pub fn with_id(mut self, id: SummarizerId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.selected_resource = Some(resource.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_template(mut self, key: impl Into<String>, value: Value) -> Self {
        self.templates.insert(key.into(), value);
        self
    }

    pub(crate) fn into_summarizer(self, id: SummarizerId) -> Summarizer {
        Summarizer {
            id,
            doctor_id: self.doctor_id,
            doctor_name: self.doctor_name,
            name: self.name,
            ehr: self.ehr,
            selected_resource: self.selected_resource,
            active: self.active,
            attributes: self.attributes,
            templates: self.templates,
        }
    }
}

/// Partial update merged into an existing summarizer.
///
/// `None` leaves a field untouched. For `selected_resource`, `Some(None)` clears the handle.
/// Map entries merge key by key; a JSON `null` value removes the key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizerPatch {
    #[serde(default)]
    pub doctor_id: Option<DoctorId>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ehr: Option<EhrSystem>,
    #[serde(default)]
    pub selected_resource: Option<Option<String>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub attributes: FieldMap,
    #[serde(default)]
    pub templates: FieldMap,
}

impl SummarizerPatch {
    pub(crate) fn apply(self, target: &mut Summarizer) {
        if let Some(doctor_id) = self.doctor_id {
            target.doctor_id = doctor_id;
        }
        if let Some(doctor_name) = self.doctor_name {
            target.doctor_name = doctor_name;
        }
        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(ehr) = self.ehr {
            target.ehr = ehr;
        }
        if let Some(resource) = self.selected_resource {
            target.selected_resource = resource;
        }
        if let Some(active) = self.active {
            target.active = active;
        }
        merge_fields(&mut target.attributes, self.attributes);
        merge_fields(&mut target.templates, self.templates);
    }
}

fn merge_fields(target: &mut FieldMap, patch: FieldMap) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

/// What a transfer includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyType {
    /// The selected summarizer records, without their template configurations.
    Summarizers,
    /// Every summarizer of the source doctor, template configurations included.
    Full,
    /// Template configurations only; summarizer-specific fields are left out.
    Templates,
}

impl CopyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyType::Summarizers => "summarizers",
            CopyType::Full => "full",
            CopyType::Templates => "templates",
        }
    }
}

impl fmt::Display for CopyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CopyType {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarizers" => Ok(CopyType::Summarizers),
            "full" => Ok(CopyType::Full),
            "templates" => Ok(CopyType::Templates),
            other => Err(TransferError::InvalidInput(format!(
                "unknown copy type '{other}' (expected summarizers, full or templates)"
            ))),
        }
    }
}
