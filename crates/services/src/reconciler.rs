use std::sync::{Arc, PoisonError, RwLock};

use hanzi_core::model::{BadgeStatus, ItemId, UserId, UserProgressSnapshot};
use storage::repository::{ProgressRepository, StorageError};
use tracing::{debug, warn};

//
// ─── PROGRESS CACHE ────────────────────────────────────────────────────────────
//

/// Last known progress snapshot, shared by every session of the process.
///
/// Each refresh replaces the whole value; readers never see a partial update.
#[derive(Debug, Clone, Default)]
pub struct ProgressCache {
    inner: Arc<RwLock<Option<UserProgressSnapshot>>>,
}

impl ProgressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<UserProgressSnapshot> {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, snapshot: UserProgressSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }
}

//
// ─── RECONCILER ────────────────────────────────────────────────────────────────
//

/// What happened to the remote side of one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Completion stored and the profile refreshed into the cache.
    Synced(UserProgressSnapshot),
    /// Completion stored but the refresh failed; the cache is unchanged.
    Stale { reason: String },
    /// Completion could not be stored; no refresh was attempted.
    Failed { reason: String },
}

impl ReconcileOutcome {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }
}

/// Pushes completed characters to the backend and refreshes the profile.
///
/// Local session state is never rolled back; failures only surface as
/// outcomes and log lines.
#[derive(Clone)]
pub struct CompletionReconciler {
    progress: Arc<dyn ProgressRepository>,
    cache: ProgressCache,
}

impl CompletionReconciler {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>, cache: ProgressCache) -> Self {
        Self { progress, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    /// Record then refresh, strictly in that order.
    pub async fn on_item_completed(&self, user: UserId, item: ItemId) -> ReconcileOutcome {
        if let Err(err) = self.progress.record_completion(user, item).await {
            warn!(user_id = %user, item_id = %item, error = %err, "failed to record completion");
            return ReconcileOutcome::Failed {
                reason: err.to_string(),
            };
        }

        match self.progress.refresh_profile(user).await {
            Ok(snapshot) => {
                debug!(
                    user_id = %user,
                    item_id = %item,
                    level = snapshot.level,
                    mastered = snapshot.mastered,
                    "progress refreshed"
                );
                self.cache.replace(snapshot);
                ReconcileOutcome::Synced(snapshot)
            }
            Err(err) => {
                warn!(user_id = %user, item_id = %item, error = %err, "failed to refresh profile");
                ReconcileOutcome::Stale {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Load the stored profile into the cache, e.g. on dashboard entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be read.
    pub async fn load_profile(
        &self,
        user: UserId,
    ) -> Result<Option<UserProgressSnapshot>, StorageError> {
        let profile = self.progress.fetch_profile(user).await?;
        if let Some(snapshot) = profile {
            self.cache.replace(snapshot);
        }
        Ok(profile)
    }

    /// Every badge with the learner's earned state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if badges cannot be read.
    pub async fn load_badges(&self, user: UserId) -> Result<Vec<BadgeStatus>, StorageError> {
        self.progress.list_badges(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedProgress {
        fail_record: bool,
        fail_refresh: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedProgress {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProgressRepository for ScriptedProgress {
        async fn record_completion(&self, _user: UserId, _item: ItemId) -> Result<(), StorageError> {
            self.calls.lock().unwrap().push("record");
            if self.fail_record {
                return Err(StorageError::Connection("offline".into()));
            }
            Ok(())
        }

        async fn refresh_profile(&self, _user: UserId) -> Result<UserProgressSnapshot, StorageError> {
            self.calls.lock().unwrap().push("refresh");
            if self.fail_refresh {
                return Err(StorageError::Connection("timeout".into()));
            }
            Ok(UserProgressSnapshot {
                level: 1,
                mastered: 0,
                learning: 1,
                streak_days: 1,
                total_practiced: 1,
            })
        }

        async fn fetch_profile(
            &self,
            _user: UserId,
        ) -> Result<Option<UserProgressSnapshot>, StorageError> {
            Ok(None)
        }

        async fn list_badges(&self, _user: UserId) -> Result<Vec<BadgeStatus>, StorageError> {
            Ok(Vec::new())
        }
    }

    fn ids() -> (UserId, ItemId) {
        (UserId::from_u128(1), ItemId::from_u128(2))
    }

    #[tokio::test]
    async fn success_records_then_refreshes_into_cache() {
        let repo = Arc::new(ScriptedProgress::default());
        let reconciler = CompletionReconciler::new(repo.clone(), ProgressCache::new());
        let (user, item) = ids();

        let outcome = reconciler.on_item_completed(user, item).await;

        assert!(outcome.is_synced());
        assert_eq!(repo.calls(), vec!["record", "refresh"]);
        assert_eq!(reconciler.cache().get().map(|s| s.learning), Some(1));
    }

    #[tokio::test]
    async fn record_failure_skips_refresh() {
        let repo = Arc::new(ScriptedProgress {
            fail_record: true,
            ..ScriptedProgress::default()
        });
        let reconciler = CompletionReconciler::new(repo.clone(), ProgressCache::new());
        let (user, item) = ids();

        let outcome = reconciler.on_item_completed(user, item).await;

        assert!(matches!(outcome, ReconcileOutcome::Failed { .. }));
        assert_eq!(repo.calls(), vec!["record"]);
        assert!(reconciler.cache().get().is_none());
    }

    #[tokio::test]
    async fn refresh_failure_leaves_cache_untouched() {
        let previous = UserProgressSnapshot {
            level: 3,
            mastered: 25,
            learning: 4,
            streak_days: 7,
            total_practiced: 60,
        };
        let cache = ProgressCache::new();
        cache.replace(previous);
        let repo = Arc::new(ScriptedProgress {
            fail_refresh: true,
            ..ScriptedProgress::default()
        });
        let reconciler = CompletionReconciler::new(repo.clone(), cache.clone());
        let (user, item) = ids();

        let outcome = reconciler.on_item_completed(user, item).await;

        assert!(matches!(outcome, ReconcileOutcome::Stale { .. }));
        assert_eq!(repo.calls(), vec!["record", "refresh"]);
        assert_eq!(cache.get(), Some(previous));
    }
}
