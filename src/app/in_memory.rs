use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::domain::{
    HabitSeries, HabitSeriesDraft, HabitSeriesDto, HabitSeriesRecord, PersistenceError,
    PipelineRequest,
};

use super::ports::{ArtifactRepository, DomainPolicy, Eligibility, UserStateRepository};

fn lock<'a, T>(mutex: &'a Mutex<T>, operation: &str) -> Result<MutexGuard<'a, T>, PersistenceError> {
    mutex
        .lock()
        .map_err(|_| PersistenceError::new(operation, "in-memory store lock poisoned"))
}

/// Process-local habit series store. Series are kept as records and
/// rehydrated on read, the same way a database-backed repository would.
#[derive(Debug, Default)]
pub struct InMemoryHabitSeriesRepository {
    records: Mutex<IndexMap<String, HabitSeriesRecord>>,
}

impl InMemoryHabitSeriesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, id: &str) -> Option<HabitSeries> {
        let records = lock(&self.records, "find").ok()?;
        records.get(id).cloned().map(HabitSeries::rehydrate)
    }

    pub fn list_for_user(&self, user_id: &str) -> Vec<HabitSeries> {
        let Ok(records) = lock(&self.records, "list_for_user") else {
            return Vec::new();
        };
        records
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .map(HabitSeries::rehydrate)
            .collect()
    }

    pub fn count(&self) -> usize {
        lock(&self.records, "count").map_or(0, |records| records.len())
    }
}

impl ArtifactRepository for InMemoryHabitSeriesRepository {
    fn create_from_validated(
        &self,
        user_id: &str,
        draft: HabitSeriesDraft,
    ) -> Result<HabitSeriesDto, PersistenceError> {
        let series = HabitSeries::create(Uuid::new_v4().to_string(), user_id, draft, Utc::now());
        let mut records = lock(&self.records, "create_from_validated")?;
        records.insert(series.id().to_string(), series.to_record());
        Ok(series.to_dto())
    }
}

/// Per-user counter of created habit series.
#[derive(Debug, Default)]
pub struct InMemoryUserState {
    artifact_counts: Mutex<HashMap<String, u32>>,
}

impl InMemoryUserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact_count(&self, user_id: &str) -> u32 {
        lock(&self.artifact_counts, "artifact_count")
            .map_or(0, |counts| counts.get(user_id).copied().unwrap_or(0))
    }
}

impl UserStateRepository for InMemoryUserState {
    fn record_new_artifact(&self, user_id: &str) -> Result<(), PersistenceError> {
        let mut counts = lock(&self.artifact_counts, "record_new_artifact")?;
        let count = counts.entry(user_id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPolicy;

impl DomainPolicy for AllowAllPolicy {
    fn check_eligibility(&self, _user_id: &str, _request: &PipelineRequest) -> Eligibility {
        Eligibility::Allow
    }
}
