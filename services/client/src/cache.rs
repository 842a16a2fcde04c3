//! services/client/src/cache.rs
//!
//! Owned key-value store per entity kind.
//!
//! Entries live until explicitly invalidated: there is no TTL and no eviction.
//! Values are handed out as `Arc`s so a cache hit returns the very same
//! snapshot that was stored. Concurrent writers follow last-write-wins.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use biro_core::{
    Assignment, AssignmentDetail, AssignmentId, EvaluationId, Exercise, ExerciseId, NamedReport,
    SubjectInstance, SubjectInstanceId, SubmissionFile, SubmissionId, SubmissionStatus,
};

pub struct EntityCache<K, V> {
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K, V> Default for EntityCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V> EntityCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lock().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.lock().insert(key, Arc::clone(&value));
        value
    }

    /// Removes the entry; returns whether one was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// The full set of caches held by one client.
#[derive(Default)]
pub struct Caches {
    /// The enrolment listing, stored under the unit key.
    pub subject_instance_list: EntityCache<(), Vec<SubjectInstance>>,
    pub subject_instances: EntityCache<SubjectInstanceId, SubjectInstance>,
    /// Assignment listings keyed by the subject instance they belong to.
    pub assignments: EntityCache<SubjectInstanceId, Vec<Assignment>>,
    pub assignment_details: EntityCache<AssignmentId, AssignmentDetail>,
    pub exercises: EntityCache<ExerciseId, Exercise>,
    pub submission_statuses: EntityCache<SubmissionId, SubmissionStatus>,
    pub reports: EntityCache<EvaluationId, Vec<NamedReport>>,
    pub submission_files: EntityCache<SubmissionId, Vec<SubmissionFile>>,
}

impl Caches {
    pub fn clear(&self) {
        self.subject_instance_list.clear();
        self.subject_instances.clear();
        self.assignments.clear();
        self.assignment_details.clear();
        self.exercises.clear();
        self.submission_statuses.clear();
        self.reports.clear();
        self.submission_files.clear();
    }
}
