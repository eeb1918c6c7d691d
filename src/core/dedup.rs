use crate::domain::model::{JobPosting, SeenRecord};
use crate::domain::ports::SeenStore;
use crate::utils::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What to do when the store fails for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistencePolicy {
    /// Propagate the error and abandon the rest of the batch.
    #[default]
    Abort,
    /// Log the failing candidate, leave it out of the result, keep going.
    Skip,
}

/// Split `postings` into the ones never seen before, recording each of them.
///
/// Candidates are handled one at a time so a posting repeated within the
/// batch is recorded and returned once. A candidate is only returned after its
/// record has been written.
pub async fn reconcile<S: SeenStore>(
    store: &S,
    postings: Vec<JobPosting>,
    policy: PersistencePolicy,
) -> Result<Vec<JobPosting>> {
    let mut new_jobs = Vec::new();

    for posting in postings {
        match record_if_new(store, &posting).await {
            Ok(true) => new_jobs.push(posting),
            Ok(false) => tracing::debug!("Already seen job {}", posting.id),
            Err(e) => match policy {
                PersistencePolicy::Abort => return Err(e),
                PersistencePolicy::Skip => {
                    tracing::error!("Skipping job {} after store failure: {}", posting.id, e);
                }
            },
        }
    }

    Ok(new_jobs)
}

async fn record_if_new<S: SeenStore>(store: &S, posting: &JobPosting) -> Result<bool> {
    if store.find(&posting.id).await?.is_some() {
        return Ok(false);
    }
    store
        .insert(&SeenRecord::from_posting(posting, Utc::now()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::WatchError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStore {
        records: Arc<Mutex<HashMap<String, SeenRecord>>>,
        failing_ids: Arc<HashSet<String>>,
        writes: Arc<Mutex<usize>>,
    }

    impl MockStore {
        fn failing_on(ids: &[&str]) -> Self {
            Self {
                failing_ids: Arc::new(ids.iter().map(|s| s.to_string()).collect()),
                ..Self::default()
            }
        }

        async fn len(&self) -> usize {
            self.records.lock().await.len()
        }
    }

    impl SeenStore for MockStore {
        async fn find(&self, id: &str) -> Result<Option<SeenRecord>> {
            if self.failing_ids.contains(id) {
                return Err(WatchError::Persistence(sqlx::Error::PoolTimedOut));
            }
            Ok(self.records.lock().await.get(id).cloned())
        }

        async fn insert(&self, record: &SeenRecord) -> Result<bool> {
            *self.writes.lock().await += 1;
            let mut records = self.records.lock().await;
            if records.contains_key(&record.id) {
                return Ok(false);
            }
            records.insert(record.id.clone(), record.clone());
            Ok(true)
        }
    }

    fn posting(id: &str) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: format!("Job {}", id),
            link: format!("https://www.upwork.com/jobs/~{}", id),
            skills: vec!["React developer".to_string()],
        }
    }

    fn ids(postings: &[JobPosting]) -> Vec<&str> {
        postings.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_second_pass_only_reports_unseen() {
        let store = MockStore::default();

        let first = reconcile(&store, vec![posting("A"), posting("B")], PersistencePolicy::Abort)
            .await
            .unwrap();
        assert_eq!(ids(&first), vec!["A", "B"]);
        assert_eq!(store.len().await, 2);

        let second = reconcile(&store, vec![posting("A"), posting("C")], PersistencePolicy::Abort)
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["C"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_is_reported_once() {
        let store = MockStore::default();

        let new_jobs = reconcile(
            &store,
            vec![posting("A"), posting("A"), posting("B")],
            PersistencePolicy::Abort,
        )
        .await
        .unwrap();

        assert_eq!(ids(&new_jobs), vec!["A", "B"]);
        assert_eq!(store.len().await, 2);
        assert_eq!(*store.writes.lock().await, 2);
    }

    #[tokio::test]
    async fn test_seen_posting_causes_no_write() {
        let store = MockStore::default();
        reconcile(&store, vec![posting("A")], PersistencePolicy::Abort)
            .await
            .unwrap();
        reconcile(&store, vec![posting("A")], PersistencePolicy::Abort)
            .await
            .unwrap();
        assert_eq!(*store.writes.lock().await, 1);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_the_batch() {
        let store = MockStore::failing_on(&["B"]);

        let result = reconcile(
            &store,
            vec![posting("A"), posting("B"), posting("C")],
            PersistencePolicy::Abort,
        )
        .await;

        assert!(matches!(result, Err(WatchError::Persistence(_))));
        // A was recorded before the failure, C never reached
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_failure() {
        let store = MockStore::failing_on(&["B"]);

        let new_jobs = reconcile(
            &store,
            vec![posting("A"), posting("B"), posting("C")],
            PersistencePolicy::Skip,
        )
        .await
        .unwrap();

        assert_eq!(ids(&new_jobs), vec!["A", "C"]);
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: PersistencePolicy,
        }
        let w: Wrapper = toml::from_str(r#"policy = "skip""#).unwrap();
        assert_eq!(w.policy, PersistencePolicy::Skip);
    }
}
