use std::sync::Arc;

use hanzi_core::model::{
    CardOrientation, ItemId, PracticeItem, ProgressState, RecentPractice, SetId, UserId,
};
use storage::repository::{AuthSession, CatalogRepository, StudySetRepository};
use tracing::debug;

use crate::config::PracticeConfig;
use crate::error::SessionError;
use crate::practice::{PracticeMode, PracticeSession, SessionOptions};

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// Characters picked by hand for a custom session, in pick order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<PracticeItem>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the item, or remove it when already picked. Returns whether it is
    /// now selected.
    pub fn toggle(&mut self, item: &PracticeItem) -> bool {
        if let Some(idx) = self.items.iter().position(|i| i.id() == item.id()) {
            self.items.remove(idx);
            false
        } else {
            self.items.push(item.clone());
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[PracticeItem] {
        &self.items
    }
}

//
// ─── STUDY OPTIONS ─────────────────────────────────────────────────────────────
//

/// How a study set is turned into a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudyOptions {
    pub shuffle: bool,
    pub orientation: CardOrientation,
    pub starred_only: bool,
}

/// What the dashboard suggests practicing next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedItem {
    pub item: PracticeItem,
    pub state: ProgressState,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Builds practice sessions from the catalog, the learner's progress or a
/// study set.
#[derive(Clone)]
pub struct PracticeService {
    auth: Arc<dyn AuthSession>,
    catalog: Arc<dyn CatalogRepository>,
    study_sets: Arc<dyn StudySetRepository>,
    config: PracticeConfig,
    seed: Option<u64>,
}

impl PracticeService {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthSession>,
        catalog: Arc<dyn CatalogRepository>,
        study_sets: Arc<dyn StudySetRepository>,
    ) -> Self {
        Self {
            auth,
            catalog,
            study_sets,
            config: PracticeConfig::default(),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PracticeConfig) -> Self {
        self.config = config;
        self
    }

    /// Fix the RNG seed of every session this service starts.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn user(&self) -> Result<UserId, SessionError> {
        self.auth.current_user_id().ok_or(SessionError::NotSignedIn)
    }

    fn session(
        &self,
        mode: PracticeMode,
        items: Vec<PracticeItem>,
        shuffle: bool,
    ) -> Result<PracticeSession, SessionError> {
        if items.is_empty() {
            return Err(SessionError::Empty);
        }
        debug!(%mode, items = items.len(), shuffle, "starting practice session");
        Ok(PracticeSession::new(
            mode,
            items,
            SessionOptions {
                shuffle,
                distractors: self.config.distractors,
                seed: self.seed,
            },
        ))
    }

    /// The most frequent characters, `new_batch` of them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn`, `Empty` for an empty catalog, or
    /// `Storage`.
    pub async fn start_new_characters(
        &self,
        mode: PracticeMode,
    ) -> Result<PracticeSession, SessionError> {
        self.user()?;
        let items = self
            .catalog
            .fetch_catalog_items(Some(self.config.new_batch))
            .await?;
        self.session(mode, items, self.config.shuffle)
    }

    /// Characters the learner is still learning, least recently practiced first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn`, `Empty` when nothing is in
    /// progress, or `Storage`.
    pub async fn start_review(&self, mode: PracticeMode) -> Result<PracticeSession, SessionError> {
        let user = self.user()?;
        let items = self.catalog.fetch_learning_items(user).await?;
        self.session(mode, items, self.config.shuffle)
    }

    /// Catalog to pick a custom selection from, by frequency.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the catalog cannot be read.
    pub async fn catalog_for_selection(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<PracticeItem>, SessionError> {
        Ok(self.catalog.fetch_catalog_items(limit).await?)
    }

    /// Start on hand-picked characters. Nothing is fetched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptySelection` when nothing is picked.
    pub fn start_selected(
        &self,
        mode: PracticeMode,
        selection: &Selection,
    ) -> Result<PracticeSession, SessionError> {
        if selection.is_empty() {
            return Err(SessionError::EmptySelection);
        }
        self.session(mode, selection.items().to_vec(), false)
    }

    /// Quiz or flip through the cards of a study set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for a set without cards,
    /// `NoStarredCards` when only starred cards were asked for and none are,
    /// or `Storage`.
    pub async fn start_study_set(
        &self,
        set_id: SetId,
        mode: PracticeMode,
        options: StudyOptions,
    ) -> Result<PracticeSession, SessionError> {
        let cards = self.study_sets.get_set_items(set_id).await?;
        if cards.is_empty() {
            return Err(SessionError::Empty);
        }
        let items: Vec<PracticeItem> = cards
            .iter()
            .filter(|card| !options.starred_only || card.starred)
            .map(|card| card.to_practice_item(options.orientation))
            .collect();
        if items.is_empty() {
            return Err(SessionError::NoStarredCards);
        }
        self.session(mode, items, options.shuffle)
    }

    /// The stalest learning character, else the most frequent catalog one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` or `Storage`.
    pub async fn next_suggested_item(&self) -> Result<Option<SuggestedItem>, SessionError> {
        let user = self.user()?;
        if let Some(item) = self
            .catalog
            .fetch_learning_items(user)
            .await?
            .into_iter()
            .next()
        {
            return Ok(Some(SuggestedItem {
                item,
                state: ProgressState::Learning,
            }));
        }
        let next = self
            .catalog
            .fetch_catalog_items(Some(1))
            .await?
            .into_iter()
            .next()
            .map(|item| SuggestedItem {
                item,
                state: ProgressState::New,
            });
        Ok(next)
    }

    /// Recently practiced characters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` or `Storage`.
    pub async fn recent_activity(&self) -> Result<Vec<RecentPractice>, SessionError> {
        let user = self.user()?;
        Ok(self
            .catalog
            .recent_practice(user, self.config.recent_limit)
            .await?)
    }
}
