//! Doctor directory contract and a practice/search filter.
//!
//! The host owns the list of doctors. The engine only needs to resolve a doctor id to the
//! name and EHR system used when building a copy's target context.

use crate::{DoctorId, EhrSystem, TransferError, TransferResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub ehr: EhrSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice: Option<String>,
}

/// Lookup of doctors by id, provided by the host.
pub trait DoctorDirectory {
    fn doctor(&self, id: &DoctorId) -> Option<Doctor>;

    /// Every doctor in the directory, in the directory's own order.
    fn doctors(&self) -> Vec<Doctor>;
}

/// Directory backed by a vector, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    doctors: Vec<Doctor>,
}

impl InMemoryDirectory {
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidInput`] if two doctors share an id.
    pub fn new(doctors: Vec<Doctor>) -> TransferResult<Self> {
        for (i, doctor) in doctors.iter().enumerate() {
            if doctors[..i].iter().any(|other| other.id == doctor.id) {
                return Err(TransferError::InvalidInput(format!(
                    "doctor id '{}' appears more than once",
                    doctor.id
                )));
            }
        }
        Ok(Self { doctors })
    }
}

impl DoctorDirectory for InMemoryDirectory {
    fn doctor(&self, id: &DoctorId) -> Option<Doctor> {
        self.doctors.iter().find(|doctor| &doctor.id == id).cloned()
    }

    fn doctors(&self) -> Vec<Doctor> {
        self.doctors.clone()
    }
}

/// Narrows which doctors a host offers for selection.
///
/// `practice` must match exactly, ignoring case. `search` matches a case-insensitive
/// substring of the doctor's name or id. Empty values are ignored.
#[derive(Clone, Debug, Default)]
pub struct DoctorFilter {
    pub practice: Option<String>,
    pub search: Option<String>,
}

impl DoctorFilter {
    pub fn apply(&self, doctors: &[Doctor]) -> Vec<Doctor> {
        let practice = normalised(self.practice.as_deref());
        let search = normalised(self.search.as_deref());

        doctors
            .iter()
            .filter(|doctor| match &practice {
                Some(practice) => doctor
                    .practice
                    .as_deref()
                    .is_some_and(|p| p.trim().to_lowercase() == *practice),
                None => true,
            })
            .filter(|doctor| match &search {
                Some(needle) => {
                    doctor.name.to_lowercase().contains(needle.as_str())
                        || doctor.id.as_str().to_lowercase().contains(needle.as_str())
                }
                None => true,
            })
            .cloned()
            .collect()
    }
}

fn normalised(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: &str, name: &str, ehr: &str, practice: Option<&str>) -> Doctor {
        Doctor {
            id: DoctorId::new(id).unwrap(),
            name: name.into(),
            ehr: EhrSystem::new(ehr).unwrap(),
            practice: practice.map(String::from),
        }
    }

    fn roster() -> Vec<Doctor> {
        vec![
            doctor("D1", "Alice Moreno", "Epic", Some("Northside")),
            doctor("D2", "Bilal Khan", "Epic", Some("Northside")),
            doctor("D3", "Chloe Park", "Cerner", Some("Riverside")),
            doctor("D4", "Dan Alders", "Cerner", None),
        ]
    }

    #[test]
    fn directory_resolves_known_ids() {
        let directory = InMemoryDirectory::new(roster()).unwrap();

        let found = directory.doctor(&DoctorId::new("D3").unwrap()).unwrap();
        assert_eq!(found.name, "Chloe Park");
        assert!(directory.doctor(&DoctorId::new("D9").unwrap()).is_none());
        assert_eq!(directory.doctors().len(), 4);
    }

    #[test]
    fn directory_rejects_duplicate_ids() {
        let mut doctors = roster();
        doctors.push(doctor("D1", "Someone Else", "Epic", None));

        assert!(InMemoryDirectory::new(doctors).is_err());
    }

    #[test]
    fn filter_by_practice_ignores_case() {
        let filter = DoctorFilter {
            practice: Some("northSIDE".into()),
            search: None,
        };

        let ids: Vec<_> = filter
            .apply(&roster())
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["D1", "D2"]);
    }

    #[test]
    fn filter_by_search_matches_name_or_id() {
        let filter = DoctorFilter {
            practice: None,
            search: Some("ALDER".into()),
        };
        let ids: Vec<_> = filter
            .apply(&roster())
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["D4"]);

        let by_id = DoctorFilter {
            practice: None,
            search: Some("d2".into()),
        };
        assert_eq!(by_id.apply(&roster()).len(), 1);
    }

    #[test]
    fn empty_filter_keeps_everyone() {
        let filter = DoctorFilter {
            practice: Some("  ".into()),
            search: None,
        };
        assert_eq!(filter.apply(&roster()).len(), 4);
    }
}
