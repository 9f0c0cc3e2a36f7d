//! In-memory summarizer store.
//!
//! The store is the single source of truth for summarizer records during a session. The host
//! creates it at session start (optionally seeding it with [`SummarizerStore::from_records`])
//! and passes it by reference to the planner and, mutably, to the executor.
//!
//! Records keep insertion order. Missing ids are never an error for reads, deletes, updates or
//! toggles: the host may race a delete against an edit, and the store treats the late edit as
//! a no-op.

use crate::constants::MAX_ID_ATTEMPTS;
use crate::summarizer::{NewSummarizer, Summarizer, SummarizerPatch};
use crate::{DoctorId, SummarizerId, TransferError, TransferResult};
use console_uuid::{IdGenerator, UuidIdGenerator};
use std::collections::HashSet;
use std::fmt;

pub struct SummarizerStore {
    records: Vec<Summarizer>,
    ids: HashSet<SummarizerId>,
    id_source: Box<dyn IdGenerator>,
}

impl SummarizerStore {
    /// Creates an empty store that allocates ids from `id_source`.
    pub fn new(id_source: Box<dyn IdGenerator>) -> Self {
        Self {
            records: Vec::new(),
            ids: HashSet::new(),
            id_source,
        }
    }

    /// Creates a store seeded with existing records, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::DuplicateId`] if two records share an id.
    pub fn from_records(
        records: impl IntoIterator<Item = Summarizer>,
        id_source: Box<dyn IdGenerator>,
    ) -> TransferResult<Self> {
        let mut store = Self::new(id_source);
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Adds a summarizer, generating an id when none is supplied.
    ///
    /// # Returns
    ///
    /// The id the record is stored under.
    ///
    /// # Errors
    ///
    /// - [`TransferError::DuplicateId`] if a supplied id is already in use.
    /// - [`TransferError::IdAllocation`] if no unique id could be generated.
    pub fn add(&mut self, new: NewSummarizer) -> TransferResult<SummarizerId> {
        let id = match new.id.clone() {
            Some(id) => id,
            None => self.allocate_id()?,
        };
        let record = new.into_summarizer(id.clone());
        self.insert(record)?;
        Ok(id)
    }

    /// Appends a fully formed record.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::DuplicateId`] if the record's id is already in use; the store
    /// is left unchanged.
    pub fn insert(&mut self, record: Summarizer) -> TransferResult<()> {
        if !self.ids.insert(record.id.clone()) {
            return Err(TransferError::DuplicateId(record.id));
        }
        tracing::debug!(summarizer_id = %record.id, doctor_id = %record.doctor_id, "summarizer stored");
        self.records.push(record);
        Ok(())
    }

    /// Draws a fresh id from the generator that no stored record uses.
    ///
    /// Pathological generators (or ids supplied by the host that happen to match generated
    /// ones) are guarded against by retrying up to [`MAX_ID_ATTEMPTS`] times.
    pub fn allocate_id(&mut self) -> TransferResult<SummarizerId> {
        self.allocate_id_excluding(&HashSet::new())
    }

    /// Like [`allocate_id`](Self::allocate_id), but also avoids ids in `reserved` that have
    /// been handed out and not yet inserted.
    pub(crate) fn allocate_id_excluding(
        &mut self,
        reserved: &HashSet<SummarizerId>,
    ) -> TransferResult<SummarizerId> {
        for _attempt in 0..MAX_ID_ATTEMPTS {
            let candidate = self.id_source.next_id();
            if !self.ids.contains(&candidate) && !reserved.contains(&candidate) {
                return Ok(candidate);
            }
            tracing::debug!(candidate = %candidate, "generated summarizer id already in use, retrying");
        }

        Err(TransferError::IdAllocation {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Merges `patch` into the record with `id`.
    ///
    /// Returns `false` without changing anything when no such record exists.
    pub fn update(&mut self, id: &SummarizerId, patch: SummarizerPatch) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                patch.apply(record);
                true
            }
            None => {
                tracing::debug!(summarizer_id = %id, "update ignored for missing summarizer");
                false
            }
        }
    }

    /// Removes the record with `id`. Deleting an absent id is not an error.
    ///
    /// Returns whether a record was removed.
    pub fn delete(&mut self, id: &SummarizerId) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.records.retain(|record| &record.id != id);
        true
    }

    pub fn get(&self, id: &SummarizerId) -> Option<&Summarizer> {
        self.records.iter().find(|record| &record.id == id)
    }

    fn get_mut(&mut self, id: &SummarizerId) -> Option<&mut Summarizer> {
        self.records.iter_mut().find(|record| &record.id == id)
    }

    pub fn contains(&self, id: &SummarizerId) -> bool {
        self.ids.contains(id)
    }

    /// Records owned by `doctor_id`, in insertion order.
    pub fn list_by_doctor(&self, doctor_id: &DoctorId) -> Vec<&Summarizer> {
        self.records
            .iter()
            .filter(|record| &record.doctor_id == doctor_id)
            .collect()
    }

    /// Flips `active` on the record with `id`.
    ///
    /// Returns the new state, or `None` if no such record exists.
    pub fn toggle_active(&mut self, id: &SummarizerId) -> Option<bool> {
        let record = self.get_mut(id)?;
        record.active = !record.active;
        Some(record.active)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Summarizer> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the store, returning its records in order.
    pub fn into_records(self) -> Vec<Summarizer> {
        self.records
    }
}

impl Default for SummarizerStore {
    fn default() -> Self {
        Self::new(Box::new(UuidIdGenerator::new()))
    }
}

impl fmt::Debug for SummarizerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerStore")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EhrSystem;
    use console_uuid::SequentialIdGenerator;

    fn store() -> SummarizerStore {
        SummarizerStore::new(Box::new(SequentialIdGenerator::new("t")))
    }

    fn new_summarizer(doctor: &str) -> NewSummarizer {
        NewSummarizer::new(
            DoctorId::new(doctor).unwrap(),
            format!("Dr {doctor}"),
            EhrSystem::new("Epic").unwrap(),
        )
    }

    fn id(value: &str) -> SummarizerId {
        SummarizerId::parse(value).unwrap()
    }

    /// Always hands out the same id.
    struct StuckGenerator;

    impl IdGenerator for StuckGenerator {
        fn next_id(&mut self) -> SummarizerId {
            SummarizerId::parse("stuck").unwrap()
        }
    }

    #[test]
    fn add_generates_id_when_absent() {
        let mut store = store();
        let first = store.add(new_summarizer("D1")).unwrap();
        let second = store.add(new_summarizer("D1")).unwrap();

        assert_eq!(first.as_str(), "t-1");
        assert_eq!(second.as_str(), "t-2");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_keeps_supplied_id() {
        let mut store = store();
        let assigned = store.add(new_summarizer("D1").with_id(id("S1"))).unwrap();

        assert_eq!(assigned, id("S1"));
        assert!(store.get(&id("S1")).is_some());
    }

    #[test]
    fn add_rejects_duplicate_supplied_id() {
        let mut store = store();
        store.add(new_summarizer("D1").with_id(id("S1"))).unwrap();

        let err = store
            .add(new_summarizer("D2").with_id(id("S1")))
            .expect_err("duplicate id should be rejected");

        assert!(matches!(err, TransferError::DuplicateId(ref dup) if dup.as_str() == "S1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id("S1")).unwrap().doctor_id.as_str(), "D1");
    }

    #[test]
    fn allocate_id_skips_ids_already_in_use() {
        let mut store = store();
        store.add(new_summarizer("D1").with_id(id("t-1"))).unwrap();

        assert_eq!(store.allocate_id().unwrap().as_str(), "t-2");
    }

    #[test]
    fn allocate_id_gives_up_after_repeated_collisions() {
        let mut store = SummarizerStore::new(Box::new(StuckGenerator));
        store.add(new_summarizer("D1")).unwrap();

        let err = store.allocate_id().expect_err("generator never yields a fresh id");
        assert!(matches!(err, TransferError::IdAllocation { attempts: MAX_ID_ATTEMPTS }));
    }

    #[test]
    fn update_merges_into_existing_record() {
        let mut store = store();
        let sid = store.add(new_summarizer("D1")).unwrap();

        let changed = store.update(
            &sid,
            SummarizerPatch {
                name: Some("Referral letters".into()),
                ..Default::default()
            },
        );

        assert!(changed);
        assert_eq!(store.get(&sid).unwrap().name, "Referral letters");
    }

    #[test]
    fn update_of_missing_id_is_a_no_op() {
        let mut store = store();
        store.add(new_summarizer("D1")).unwrap();
        let before: Vec<_> = store.iter().cloned().collect();

        let changed = store.update(
            &id("missing"),
            SummarizerPatch {
                active: Some(false),
                ..Default::default()
            },
        );

        assert!(!changed);
        assert_eq!(store.iter().cloned().collect::<Vec<_>>(), before);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = store();
        let sid = store.add(new_summarizer("D1")).unwrap();
        store.add(new_summarizer("D1")).unwrap();

        assert!(store.delete(&sid));
        let after_first: Vec<_> = store.iter().cloned().collect();

        assert!(!store.delete(&sid));
        assert!(!store.delete(&id("never-existed")));
        assert!(!store.delete(&id("never-existed")));
        assert_eq!(store.iter().cloned().collect::<Vec<_>>(), after_first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn deleted_id_can_be_reused_by_insert() {
        let mut store = store();
        let sid = store.add(new_summarizer("D1").with_id(id("S1"))).unwrap();
        store.delete(&sid);

        assert!(store.add(new_summarizer("D1").with_id(id("S1"))).is_ok());
    }

    #[test]
    fn list_by_doctor_keeps_insertion_order() {
        let mut store = store();
        let a = store.add(new_summarizer("D1")).unwrap();
        store.add(new_summarizer("D2")).unwrap();
        let c = store.add(new_summarizer("D1")).unwrap();

        let owned: Vec<_> = store
            .list_by_doctor(&DoctorId::new("D1").unwrap())
            .into_iter()
            .map(|s| s.id.clone())
            .collect();

        assert_eq!(owned, vec![a, c]);
        assert!(store
            .list_by_doctor(&DoctorId::new("D9").unwrap())
            .is_empty());
    }

    #[test]
    fn toggle_active_flips_and_ignores_missing() {
        let mut store = store();
        let sid = store.add(new_summarizer("D1")).unwrap();

        assert_eq!(store.toggle_active(&sid), Some(false));
        assert_eq!(store.toggle_active(&sid), Some(true));
        assert_eq!(store.toggle_active(&id("missing")), None);
    }

    #[test]
    fn from_records_rejects_duplicates() {
        let mut seed = store();
        let sid = seed.add(new_summarizer("D1")).unwrap();
        let record = seed.get(&sid).unwrap().clone();

        let result = SummarizerStore::from_records(
            vec![record.clone(), record],
            Box::new(SequentialIdGenerator::default()),
        );

        assert!(matches!(result, Err(TransferError::DuplicateId(_))));
    }
}
