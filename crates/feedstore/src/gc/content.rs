use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use feedstore_storage::{ContentMutation, ContentStorage};
use feedstore_types::LocalAction;
use tracing::{debug, error, info};

use crate::error::StoreResult;
use crate::keys::{semantic_properties_key, SHARED_STATE_PREFIX};
use crate::traits::AccessibleContentSupplier;

/// Lazily reads the actions whose content keeps its semantic properties.
pub type ActionSupplier = Box<dyn FnOnce() -> StoreResult<Vec<LocalAction>> + Send + 'static>;

/// Result of a content GC pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Keys present in content storage when the pass started.
    pub population: usize,
    /// Keys deleted by the pass.
    pub deleted: usize,
}

/// Reachability-based collector for the content key space.
///
/// Content carries no references to other content, so reachability is
/// membership in one of the root sets:
///
/// 1. accessible content ids
/// 2. reserved content ids
/// 3. semantic-properties keys of accessible content
/// 4. semantic-properties keys of content with a recorded action
/// 5. every shared-state key
///
/// Every other key is deleted in a single storage commit.
pub struct ContentGc {
    storage: Arc<dyn ContentStorage>,
    accessible: AccessibleContentSupplier,
    reserved: HashSet<String>,
    actions: ActionSupplier,
}

impl ContentGc {
    pub fn new(
        storage: Arc<dyn ContentStorage>,
        accessible: AccessibleContentSupplier,
        reserved: HashSet<String>,
        actions: ActionSupplier,
    ) -> Self {
        Self {
            storage,
            accessible,
            reserved,
            actions,
        }
    }

    /// Run the pass on the calling thread.
    ///
    /// Failing to list the population or to read the actions deletes
    /// nothing.
    pub fn run(self) -> GcReport {
        let started = Instant::now();

        let mut population: HashSet<String> = match self.storage.get_all_keys() {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                error!(error = %e, "content GC could not list keys; skipping");
                return GcReport::default();
            }
        };
        let population_size = population.len();

        let actions = match (self.actions)() {
            Ok(actions) => actions,
            Err(e) => {
                error!(error = %e, "content GC could not read actions; skipping");
                return GcReport {
                    population: population_size,
                    deleted: 0,
                };
            }
        };

        let accessible = (self.accessible)();
        for id in &accessible {
            population.remove(id);
            population.remove(&semantic_properties_key(id));
        }
        for id in &self.reserved {
            population.remove(id);
        }
        for action in &actions {
            population.remove(&semantic_properties_key(&action.content_id));
        }
        population.retain(|key| !key.starts_with(SHARED_STATE_PREFIX));

        if population.is_empty() {
            debug!(population = population_size, "content GC found nothing to delete");
            return GcReport {
                population: population_size,
                deleted: 0,
            };
        }

        let mut doomed: Vec<String> = population.into_iter().collect();
        doomed.sort();
        let deleted = doomed.len();
        let mutation = doomed
            .into_iter()
            .fold(ContentMutation::new(), |mutation, key| mutation.delete(key));

        if !self.storage.commit(mutation).is_success() {
            error!(population = population_size, "content GC delete commit failed");
            return GcReport {
                population: population_size,
                deleted: 0,
            };
        }

        info!(
            population = population_size,
            deleted,
            accessible = accessible.len(),
            reserved = self.reserved.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "content GC complete"
        );
        GcReport {
            population: population_size,
            deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use feedstore_storage::InMemoryContentStorage;
    use proptest::prelude::*;

    use super::*;
    use crate::error::StoreError;
    use crate::keys::shared_state_key;

    fn seeded(keys: &[&str]) -> Arc<InMemoryContentStorage> {
        let storage = Arc::new(InMemoryContentStorage::new());
        let mutation = keys
            .iter()
            .fold(ContentMutation::new(), |m, key| m.upsert(*key, vec![1]));
        assert!(storage.commit(mutation).is_success());
        storage
    }

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn gc(
        storage: &Arc<InMemoryContentStorage>,
        accessible: &[&str],
        reserved: &[&str],
        actions: Vec<LocalAction>,
    ) -> ContentGc {
        let accessible = ids(accessible);
        ContentGc::new(
            storage.clone(),
            Box::new(move || accessible),
            ids(reserved),
            Box::new(move || Ok(actions)),
        )
    }

    // -----------------------------------------------------------------------
    // Root sets
    // -----------------------------------------------------------------------

    #[test]
    fn unreachable_content_is_deleted() {
        let storage = seeded(&["a", "b", "c"]);
        let report = gc(&storage, &["a"], &["b"], Vec::new()).run();
        assert_eq!(report, GcReport { population: 3, deleted: 1 });
        assert_eq!(storage.keys(), vec!["a", "b"]);
    }

    #[test]
    fn semantic_properties_follow_accessible_content() {
        let storage = seeded(&["a", "sp::a", "sp::b"]);
        gc(&storage, &["a"], &[], Vec::new()).run();
        assert_eq!(storage.keys(), vec!["a", "sp::a"]);
    }

    #[test]
    fn reserved_ids_do_not_protect_semantic_properties() {
        let storage = seeded(&["r", "sp::r"]);
        gc(&storage, &[], &["r"], Vec::new()).run();
        assert_eq!(storage.keys(), vec!["r"]);
    }

    #[test]
    fn actions_protect_semantic_properties_only() {
        let storage = seeded(&["c1", "sp::c1"]);
        gc(&storage, &[], &[], vec![LocalAction::dismiss("c1", 100)]).run();
        assert_eq!(storage.keys(), vec!["sp::c1"]);
    }

    #[test]
    fn shared_states_are_never_collected() {
        let ss = shared_state_key("x");
        let storage = seeded(&[ss.as_str(), "y"]);
        let report = gc(&storage, &[], &[], Vec::new()).run();
        assert_eq!(report.deleted, 1);
        assert_eq!(storage.keys(), vec![ss]);
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    #[test]
    fn unreadable_population_deletes_nothing() {
        let storage = seeded(&["a"]);
        storage.set_fail_reads(true);
        let report = gc(&storage, &[], &[], Vec::new()).run();
        assert_eq!(report, GcReport::default());
        storage.set_fail_reads(false);
        assert_eq!(storage.keys(), vec!["a"]);
    }

    #[test]
    fn unreadable_actions_delete_nothing() {
        let storage = seeded(&["a", "sp::a"]);
        let report = ContentGc::new(
            storage.clone(),
            Box::new(|| HashSet::new()),
            HashSet::new(),
            Box::new(|| Err(StoreError::CommitFailed("actions unavailable".into()))),
        )
        .run();
        assert_eq!(report.deleted, 0);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn failed_commit_reports_no_deletions() {
        let storage = seeded(&["a"]);
        storage.set_fail_commits(true);
        let report = gc(&storage, &[], &[], Vec::new()).run();
        assert_eq!(report, GcReport { population: 1, deleted: 0 });
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn accessible_supplier_runs_once_at_run_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let storage = seeded(&["a"]);
        let pass = ContentGc::new(
            storage.clone(),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                ids(&["a"])
            }),
            HashSet::new(),
            Box::new(|| Ok(Vec::new())),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        pass.run();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Safety property
    // -----------------------------------------------------------------------

    fn key_strategy() -> impl Strategy<Value = String> {
        (prop_oneof![Just(""), Just("sp::"), Just("ss::")], "[a-f]")
            .prop_map(|(prefix, id)| format!("{prefix}{id}"))
    }

    proptest! {
        #[test]
        fn deletes_exactly_the_unprotected_keys(
            population in prop::collection::hash_set(key_strategy(), 0..10),
            accessible in prop::collection::hash_set("[a-f]", 0..6),
            reserved in prop::collection::hash_set("[a-f]", 0..6),
            action_ids in prop::collection::vec("[a-f]", 0..6),
        ) {
            let storage = Arc::new(InMemoryContentStorage::new());
            let seed = population
                .iter()
                .fold(ContentMutation::new(), |m, key| m.upsert(key.clone(), vec![0]));
            storage.commit(seed);

            let mut protected: HashSet<String> = HashSet::new();
            protected.extend(accessible.iter().cloned());
            protected.extend(reserved.iter().cloned());
            protected.extend(accessible.iter().map(|id| semantic_properties_key(id)));
            protected.extend(action_ids.iter().map(|id| semantic_properties_key(id)));

            let actions: Vec<LocalAction> = action_ids
                .iter()
                .map(|id| LocalAction::dismiss(id.clone(), 1))
                .collect();
            let supplied = accessible.clone();
            let report = ContentGc::new(
                storage.clone(),
                Box::new(move || supplied),
                reserved.clone(),
                Box::new(move || Ok(actions)),
            )
            .run();

            let expected: HashSet<String> = population
                .iter()
                .filter(|key| protected.contains(*key) || key.starts_with(SHARED_STATE_PREFIX))
                .cloned()
                .collect();
            let remaining: HashSet<String> = storage.keys().into_iter().collect();
            prop_assert_eq!(&remaining, &expected);
            prop_assert_eq!(report.deleted, population.len() - expected.len());
        }
    }
}
