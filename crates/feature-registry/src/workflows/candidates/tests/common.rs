use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::store::StoreError;
use crate::workflows::candidates::domain::{
    CandidateId, CandidateStatus, FeatureCandidate, ScoreDefinition, TagDefinition,
};
use crate::workflows::candidates::repository::CandidateStore;
use crate::workflows::candidates::service::CandidateReviewService;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn candidate(id: &str, candidate_type: &str, status: &str) -> FeatureCandidate {
    FeatureCandidate {
        candidate_id: CandidateId(id.to_string()),
        candidate_type: candidate_type.to_string(),
        name_proposed: Some(format!("{id}_name")),
        description_proposed: Some(format!("Proposed {candidate_type} {id}")),
        status: Some(status.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct MemoryState {
    pub(super) candidates: HashMap<CandidateId, FeatureCandidate>,
    pub(super) tags: HashMap<String, TagDefinition>,
    pub(super) scores: HashMap<String, ScoreDefinition>,
    pub(super) status_writes: usize,
}

/// In-memory store. `atomically` restores a snapshot when the work fails.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) state: Arc<Mutex<MemoryState>>,
    pub(super) fail_definition_inserts: bool,
}

impl MemoryStore {
    pub(super) fn with(candidates: Vec<FeatureCandidate>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.state.lock().expect("store mutex poisoned");
            for candidate in candidates {
                guard
                    .candidates
                    .insert(candidate.candidate_id.clone(), candidate);
            }
        }
        store
    }

    pub(super) fn failing_inserts(mut self) -> Self {
        self.fail_definition_inserts = true;
        self
    }

    pub(super) fn snapshot(&self) -> MemoryState {
        self.state.lock().expect("store mutex poisoned").clone()
    }

    pub(super) fn status_of(&self, id: &str) -> Option<String> {
        self.snapshot()
            .candidates
            .get(&CandidateId(id.to_string()))
            .and_then(|candidate| candidate.status.clone())
    }

    fn insert_failure() -> StoreError {
        StoreError::Sqlite(rusqlite::Error::InvalidQuery)
    }
}

impl CandidateStore for MemoryStore {
    fn find(&self, id: &CandidateId) -> Result<Option<FeatureCandidate>, StoreError> {
        let guard = self.state.lock().expect("store mutex poisoned");
        Ok(guard.candidates.get(id).cloned())
    }

    fn set_status(
        &self,
        id: &CandidateId,
        status: CandidateStatus,
        _at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        guard.status_writes += 1;
        match guard.candidates.get_mut(id) {
            Some(candidate) => {
                candidate.status = Some(status.label().to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn insert_tag_definition(&self, definition: &TagDefinition) -> Result<bool, StoreError> {
        if self.fail_definition_inserts {
            return Err(Self::insert_failure());
        }
        let mut guard = self.state.lock().expect("store mutex poisoned");
        if guard.tags.contains_key(&definition.tag_id) {
            return Ok(false);
        }
        guard
            .tags
            .insert(definition.tag_id.clone(), definition.clone());
        Ok(true)
    }

    fn insert_score_definition(&self, definition: &ScoreDefinition) -> Result<bool, StoreError> {
        if self.fail_definition_inserts {
            return Err(Self::insert_failure());
        }
        let mut guard = self.state.lock().expect("store mutex poisoned");
        if guard.scores.contains_key(&definition.score_id) {
            return Ok(false);
        }
        guard
            .scores
            .insert(definition.score_id.clone(), definition.clone());
        Ok(true)
    }

    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let before = self.snapshot();
        let result = work(self);
        if result.is_err() {
            *self.state.lock().expect("store mutex poisoned") = before;
        }
        result
    }
}

pub(super) fn service_with(
    candidates: Vec<FeatureCandidate>,
) -> (CandidateReviewService<MemoryStore>, MemoryStore) {
    let store = MemoryStore::with(candidates);
    let service = CandidateReviewService::with_clock(store.clone(), fixed_now);
    (service, store)
}
