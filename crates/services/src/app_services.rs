use std::sync::Arc;

use hanzi_core::model::UserId;
use storage::{common_catalog, starter_badges};
use storage::repository::{
    AuthSession, CatalogRepository, InMemoryRepository, StaticAuth, Storage,
};
use storage::sqlite::SqliteRepository;
use storage::supabase::SupabaseConfig;
use tracing::info;

use crate::config::PracticeConfig;
use crate::error::AppServicesError;
use crate::practice::{PracticeRunner, PracticeSession};
use crate::practice_service::PracticeService;
use crate::reconciler::{CompletionReconciler, ProgressCache};
use crate::study_set_service::StudySetService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    practice: Arc<PracticeService>,
    study_sets: Arc<StudySetService>,
    reconciler: CompletionReconciler,
}

impl AppServices {
    /// Wire services over an existing `Storage`.
    #[must_use]
    pub fn new(storage: Storage, config: PracticeConfig) -> Self {
        let practice = Arc::new(
            PracticeService::new(
                Arc::clone(&storage.auth),
                Arc::clone(&storage.catalog),
                Arc::clone(&storage.study_sets),
            )
            .with_config(config),
        );
        let study_sets = Arc::new(StudySetService::new(
            Arc::clone(&storage.auth),
            Arc::clone(&storage.study_sets),
        ));
        let reconciler =
            CompletionReconciler::new(Arc::clone(&storage.progress), ProgressCache::new());
        Self {
            storage,
            practice,
            study_sets,
            reconciler,
        }
    }

    /// Build services backed by `SQLite`, seeding the catalog and badges on first run.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or seeding fails.
    pub async fn sqlite(
        db_url: &str,
        user: Option<UserId>,
        config: PracticeConfig,
    ) -> Result<Self, AppServicesError> {
        let repo = SqliteRepository::connect(db_url).await?;
        repo.migrate().await?;
        if repo.fetch_catalog_items(Some(1)).await?.is_empty() {
            let entries = common_catalog(None);
            repo.upsert_catalog(&entries).await?;
            info!(characters = entries.len(), "seeded empty catalog");
        }
        let badges = repo.ensure_badges(&starter_badges()).await?;
        if badges > 0 {
            info!(badges, "seeded starter badges");
        }
        let auth: Arc<dyn AuthSession> =
            Arc::new(user.map_or_else(StaticAuth::signed_out, StaticAuth::signed_in));
        Ok(Self::new(Storage::from_repository(repo, auth), config))
    }

    /// Build services backed by a Supabase project.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Supabase` if the HTTP client cannot be built.
    pub fn supabase(
        supabase: SupabaseConfig,
        config: PracticeConfig,
    ) -> Result<Self, AppServicesError> {
        Ok(Self::new(Storage::supabase(supabase)?, config))
    }

    /// Build services over an in-memory repository.
    #[must_use]
    pub fn in_memory(
        repo: InMemoryRepository,
        user: Option<UserId>,
        config: PracticeConfig,
    ) -> Self {
        Self::new(Storage::in_memory(repo, user), config)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.storage.auth.current_user_id()
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn study_sets(&self) -> Arc<StudySetService> {
        Arc::clone(&self.study_sets)
    }

    #[must_use]
    pub fn reconciler(&self) -> &CompletionReconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn progress_cache(&self) -> &ProgressCache {
        self.reconciler.cache()
    }

    /// Runner that executes `session`'s effects against this backend.
    #[must_use]
    pub fn runner(&self, session: PracticeSession) -> PracticeRunner {
        PracticeRunner::new(
            session,
            self.current_user(),
            self.reconciler.clone(),
            Arc::clone(&self.storage.study_sets),
        )
    }
}
