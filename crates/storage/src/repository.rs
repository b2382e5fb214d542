use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hanzi_core::Clock;
use hanzi_core::model::{
    Badge, BadgeCriterion, BadgeStatus, EarnedBadge, Flashcard, ItemId, MASTERY_THRESHOLD,
    PracticeItem, ProgressRecord, ProgressState, RecentPractice, SetId, StudySet, TermPair, UserId,
    UserProgressSnapshot, badge_board, snapshot_from,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote call failed with status {status}: {message}")]
    Remote { status: u16, message: String },
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Catalog row: a character and its frequency rank (1 = most frequent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: ItemId,
    pub hanzi: String,
    pub pinyin: String,
    pub meaning: String,
    pub frequency_rank: u32,
}

impl CatalogEntry {
    #[must_use]
    pub fn to_item(&self) -> PracticeItem {
        PracticeItem::character(self.id, &self.hanzi, &self.pinyin, &self.meaning)
    }
}

/// Badge plus the rule a local backend awards it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeRule {
    pub badge: Badge,
    pub criterion: BadgeCriterion,
}

/// Counters applied to a card after one quiz verdict.
pub fn apply_answer(card: &mut Flashcard, correct: bool, at: DateTime<Utc>) {
    if correct {
        card.times_correct = card.times_correct.saturating_add(1);
    } else {
        card.times_incorrect = card.times_incorrect.saturating_add(1);
    }
    card.mastered = card.times_correct >= MASTERY_THRESHOLD;
    card.last_practiced = Some(at);
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Who is signed in, as far as the core cares.
pub trait AuthSession: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;

    fn is_signed_in(&self) -> bool {
        self.current_user_id().is_some()
    }
}

/// Auth session pinned to a fixed user (or none); used by local backends and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAuth {
    user: Option<UserId>,
}

impl StaticAuth {
    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

impl AuthSession for StaticAuth {
    fn current_user_id(&self) -> Option<UserId> {
        self.user
    }
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Catalog characters, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn fetch_catalog_items(&self, limit: Option<u32>)
    -> Result<Vec<PracticeItem>, StorageError>;

    /// Characters the user is currently learning, least recently practiced first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if progress cannot be read.
    async fn fetch_learning_items(&self, user: UserId) -> Result<Vec<PracticeItem>, StorageError>;

    /// Most recently practiced characters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if progress cannot be read.
    async fn recent_practice(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<RecentPractice>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Upsert the user's progress row for a character: created as learning when
    /// absent, advanced otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown character, or other storage errors.
    async fn record_completion(&self, user: UserId, item: ItemId) -> Result<(), StorageError>;

    /// Recompute the profile aggregates and return them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the aggregates cannot be recomputed.
    async fn refresh_profile(&self, user: UserId) -> Result<UserProgressSnapshot, StorageError>;

    /// Read the stored aggregates without recomputing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be read.
    async fn fetch_profile(
        &self,
        user: UserId,
    ) -> Result<Option<UserProgressSnapshot>, StorageError>;

    /// Every badge, earned or locked, ordered by name.
    ///
    /// Awarding happens in the backend during `refresh_profile`; this only reads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if badges cannot be read.
    async fn list_badges(&self, user: UserId) -> Result<Vec<BadgeStatus>, StorageError>;
}

#[async_trait]
pub trait StudySetRepository: Send + Sync {
    /// Create an empty set owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already has a set with this title.
    async fn create_set(
        &self,
        user: UserId,
        title: &str,
        description: Option<&str>,
    ) -> Result<SetId, StorageError>;

    /// Rename / re-describe a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` or `StorageError::Conflict`.
    async fn update_set(
        &self,
        set_id: SetId,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Append cards to a set, positioned after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the set is missing.
    async fn add_items(&self, set_id: SetId, items: &[TermPair])
    -> Result<Vec<ItemId>, StorageError>;

    /// Remove every card of a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn clear_items(&self, set_id: SetId) -> Result<(), StorageError>;

    /// Delete a set and its cards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the set is missing.
    async fn delete_set(&self, set_id: SetId) -> Result<(), StorageError>;

    /// Sets owned by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sets(&self, user: UserId) -> Result<Vec<StudySet>, StorageError>;

    /// Cards of a set ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_set_items(&self, set_id: SetId) -> Result<Vec<Flashcard>, StorageError>;

    /// Delete one card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing.
    async fn remove_item(&self, item: ItemId) -> Result<(), StorageError>;

    /// Bump the card's correct/incorrect counters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing.
    async fn record_answer(&self, card: ItemId, correct: bool) -> Result<(), StorageError>;

    /// Flip the star flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing.
    async fn toggle_star(&self, card: ItemId) -> Result<bool, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct StoredSet {
    owner: UserId,
    set: StudySet,
}

#[derive(Debug, Default)]
struct MemoryState {
    catalog: Vec<CatalogEntry>,
    progress: HashMap<(UserId, ItemId), ProgressRecord>,
    practice_days: HashMap<UserId, BTreeSet<NaiveDate>>,
    profiles: HashMap<UserId, UserProgressSnapshot>,
    badges: Vec<BadgeRule>,
    earned: HashMap<UserId, Vec<EarnedBadge>>,
    sets: Vec<StoredSet>,
    cards: Vec<Flashcard>,
}

impl MemoryState {
    fn card_count(&self, set_id: SetId) -> u32 {
        let count = self.cards.iter().filter(|c| c.set_id == set_id).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn catalog_item(&self, id: ItemId) -> Option<PracticeItem> {
        self.catalog.iter().find(|e| e.id == id).map(CatalogEntry::to_item)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clock: Clock,
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Insert or replace catalog characters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_catalog(
        &self,
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        for entry in entries {
            guard.catalog.retain(|e| e.id != entry.id);
            guard.catalog.push(entry);
        }
        guard.catalog.sort_by_key(|e| e.frequency_rank);
        Ok(())
    }

    /// Insert or replace badges and their award rules.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_badges(
        &self,
        rules: impl IntoIterator<Item = BadgeRule>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        for rule in rules {
            guard.badges.retain(|r| r.badge.id != rule.badge.id);
            guard.badges.push(rule);
        }
        Ok(())
    }

    /// Progress row for a (user, character) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn progress_of(
        &self,
        user: UserId,
        item: ItemId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        Ok(self.lock()?.progress.get(&(user, item)).copied())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn fetch_catalog_items(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<PracticeItem>, StorageError> {
        let guard = self.lock()?;
        let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(guard
            .catalog
            .iter()
            .take(take)
            .map(CatalogEntry::to_item)
            .collect())
    }

    async fn fetch_learning_items(&self, user: UserId) -> Result<Vec<PracticeItem>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<(ItemId, ProgressRecord)> = guard
            .progress
            .iter()
            .filter(|((owner, _), record)| {
                *owner == user && record.state == ProgressState::Learning
            })
            .map(|((_, item), record)| (*item, *record))
            .collect();
        rows.sort_by_key(|(item, record)| (record.last_practiced, *item));
        Ok(rows
            .into_iter()
            .filter_map(|(item, _)| guard.catalog_item(item))
            .collect())
    }

    async fn recent_practice(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<RecentPractice>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<(ItemId, ProgressRecord)> = guard
            .progress
            .iter()
            .filter(|((owner, _), _)| *owner == user)
            .map(|((_, item), record)| (*item, *record))
            .collect();
        rows.sort_by(|a, b| b.1.last_practiced.cmp(&a.1.last_practiced));
        Ok(rows
            .into_iter()
            .filter_map(|(item, record)| {
                guard.catalog_item(item).map(|item| RecentPractice {
                    item,
                    state: record.state,
                    last_practiced: record.last_practiced,
                })
            })
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn record_completion(&self, user: UserId, item: ItemId) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        if guard.catalog_item(item).is_none() {
            return Err(StorageError::NotFound);
        }
        let existing = guard.progress.get(&(user, item)).copied();
        guard
            .progress
            .insert((user, item), ProgressRecord::advance(existing, now));
        guard
            .practice_days
            .entry(user)
            .or_default()
            .insert(now.date_naive());
        Ok(())
    }

    async fn refresh_profile(&self, user: UserId) -> Result<UserProgressSnapshot, StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        let records: Vec<ProgressRecord> = guard
            .progress
            .iter()
            .filter(|((owner, _), _)| *owner == user)
            .map(|(_, record)| *record)
            .collect();
        let days = guard
            .practice_days
            .get(&user)
            .cloned()
            .unwrap_or_default();
        let snapshot = snapshot_from(records, days, now.date_naive());
        guard.profiles.insert(user, snapshot);

        let unlocked: Vec<EarnedBadge> = guard
            .badges
            .iter()
            .filter(|rule| rule.criterion.is_met(&snapshot))
            .map(|rule| EarnedBadge {
                badge_id: rule.badge.id,
                earned_at: now,
            })
            .collect();
        let held = guard.earned.entry(user).or_default();
        for badge in unlocked {
            if !held.iter().any(|e| e.badge_id == badge.badge_id) {
                held.push(badge);
            }
        }
        Ok(snapshot)
    }

    async fn fetch_profile(
        &self,
        user: UserId,
    ) -> Result<Option<UserProgressSnapshot>, StorageError> {
        Ok(self.lock()?.profiles.get(&user).copied())
    }

    async fn list_badges(&self, user: UserId) -> Result<Vec<BadgeStatus>, StorageError> {
        let guard = self.lock()?;
        let badges = guard.badges.iter().map(|r| r.badge.clone()).collect();
        let earned = guard.earned.get(&user).map_or(&[][..], Vec::as_slice);
        Ok(badge_board(badges, earned))
    }
}

#[async_trait]
impl StudySetRepository for InMemoryRepository {
    async fn create_set(
        &self,
        user: UserId,
        title: &str,
        description: Option<&str>,
    ) -> Result<SetId, StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        if guard
            .sets
            .iter()
            .any(|s| s.owner == user && s.set.title == title)
        {
            return Err(StorageError::Conflict);
        }
        let id = SetId::random();
        guard.sets.push(StoredSet {
            owner: user,
            set: StudySet {
                id,
                title: title.to_owned(),
                description: description.map(str::to_owned),
                card_count: 0,
                is_public: false,
                created_at: now,
            },
        });
        Ok(id)
    }

    async fn update_set(
        &self,
        set_id: SetId,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let owner = guard
            .sets
            .iter()
            .find(|s| s.set.id == set_id)
            .map(|s| s.owner)
            .ok_or(StorageError::NotFound)?;
        if guard
            .sets
            .iter()
            .any(|s| s.owner == owner && s.set.id != set_id && s.set.title == title)
        {
            return Err(StorageError::Conflict);
        }
        if let Some(stored) = guard.sets.iter_mut().find(|s| s.set.id == set_id) {
            stored.set.title = title.to_owned();
            stored.set.description = description.map(str::to_owned);
        }
        Ok(())
    }

    async fn add_items(
        &self,
        set_id: SetId,
        items: &[TermPair],
    ) -> Result<Vec<ItemId>, StorageError> {
        let mut guard = self.lock()?;
        if !guard.sets.iter().any(|s| s.set.id == set_id) {
            return Err(StorageError::NotFound);
        }
        let start = guard
            .cards
            .iter()
            .filter(|c| c.set_id == set_id)
            .map(|c| c.position)
            .max()
            .unwrap_or(0);
        let mut ids = Vec::with_capacity(items.len());
        for (offset, pair) in (1_u32..).zip(items) {
            let id = ItemId::random();
            guard.cards.push(Flashcard {
                id,
                set_id,
                term: pair.term.clone(),
                definition: pair.definition.clone(),
                position: start + offset,
                starred: false,
                mastered: false,
                times_correct: 0,
                times_incorrect: 0,
                last_practiced: None,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn clear_items(&self, set_id: SetId) -> Result<(), StorageError> {
        self.lock()?.cards.retain(|c| c.set_id != set_id);
        Ok(())
    }

    async fn delete_set(&self, set_id: SetId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let before = guard.sets.len();
        guard.sets.retain(|s| s.set.id != set_id);
        if guard.sets.len() == before {
            return Err(StorageError::NotFound);
        }
        guard.cards.retain(|c| c.set_id != set_id);
        Ok(())
    }

    async fn list_sets(&self, user: UserId) -> Result<Vec<StudySet>, StorageError> {
        let guard = self.lock()?;
        let mut sets: Vec<StudySet> = guard
            .sets
            .iter()
            .filter(|s| s.owner == user)
            .map(|s| StudySet {
                card_count: guard.card_count(s.set.id),
                ..s.set.clone()
            })
            .collect();
        // newest first; insertion order breaks ties under a fixed clock
        sets.reverse();
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sets)
    }

    async fn get_set_items(&self, set_id: SetId) -> Result<Vec<Flashcard>, StorageError> {
        let guard = self.lock()?;
        let mut cards: Vec<Flashcard> = guard
            .cards
            .iter()
            .filter(|c| c.set_id == set_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.position);
        Ok(cards)
    }

    async fn remove_item(&self, item: ItemId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let before = guard.cards.len();
        guard.cards.retain(|c| c.id != item);
        if guard.cards.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn record_answer(&self, card: ItemId, correct: bool) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        let card = guard
            .cards
            .iter_mut()
            .find(|c| c.id == card)
            .ok_or(StorageError::NotFound)?;
        apply_answer(card, correct, now);
        Ok(())
    }

    async fn toggle_star(&self, card: ItemId) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let card = guard
            .cards
            .iter_mut()
            .find(|c| c.id == card)
            .ok_or(StorageError::NotFound)?;
        card.starred = !card.starred;
        Ok(card.starred)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Data-access handles behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub auth: Arc<dyn AuthSession>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub study_sets: Arc<dyn StudySetRepository>,
}

impl Storage {
    /// Wire every contract to one repository value.
    #[must_use]
    pub fn from_repository<R>(repo: R, auth: Arc<dyn AuthSession>) -> Self
    where
        R: CatalogRepository + ProgressRepository + StudySetRepository + Clone + 'static,
    {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let study_sets: Arc<dyn StudySetRepository> = Arc::new(repo);
        Self {
            auth,
            catalog,
            progress,
            study_sets,
        }
    }

    #[must_use]
    pub fn in_memory(repo: InMemoryRepository, user: Option<UserId>) -> Self {
        let auth = user.map_or_else(StaticAuth::signed_out, StaticAuth::signed_in);
        Self::from_repository(repo, Arc::new(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanzi_core::time::{fixed_clock, fixed_now};

    fn entry(n: u128, hanzi: &str, rank: u32) -> CatalogEntry {
        CatalogEntry {
            id: ItemId::from_u128(n),
            hanzi: hanzi.into(),
            pinyin: format!("p{n}"),
            meaning: format!("m{n}"),
            frequency_rank: rank,
        }
    }

    #[tokio::test]
    async fn catalog_is_ordered_by_frequency() {
        let repo = InMemoryRepository::new();
        repo.insert_catalog([entry(2, "是", 3), entry(1, "的", 1), entry(3, "一", 2)])
            .unwrap();

        let items = repo.fetch_catalog_items(Some(2)).await.unwrap();
        let glyphs: Vec<&str> = items.iter().map(PracticeItem::primary).collect();
        assert_eq!(glyphs, vec!["的", "一"]);
    }

    #[tokio::test]
    async fn completion_creates_learning_row_then_refresh_counts_it() {
        let repo = InMemoryRepository::new().with_clock(fixed_clock());
        repo.insert_catalog([entry(1, "的", 1)]).unwrap();
        let user = UserId::from_u128(7);

        repo.record_completion(user, ItemId::from_u128(1))
            .await
            .unwrap();
        let snap = repo.refresh_profile(user).await.unwrap();

        assert_eq!(snap.learning, 1);
        assert_eq!(snap.mastered, 0);
        assert_eq!(snap.streak_days, 1);
        assert_eq!(repo.fetch_profile(user).await.unwrap(), Some(snap));
        let learning = repo.fetch_learning_items(user).await.unwrap();
        assert_eq!(learning.len(), 1);
    }

    fn rule(n: u128, name: &str, criterion: BadgeCriterion) -> BadgeRule {
        BadgeRule {
            badge: Badge {
                id: hanzi_core::model::BadgeId::from_u128(n),
                name: name.into(),
                description: String::new(),
                icon: "🏅".into(),
            },
            criterion,
        }
    }

    #[tokio::test]
    async fn refresh_awards_met_badges_once() {
        let repo = InMemoryRepository::new().with_clock(fixed_clock());
        repo.insert_catalog([entry(1, "的", 1)]).unwrap();
        repo.insert_badges([
            rule(1, "First Stroke", BadgeCriterion::Practiced(1)),
            rule(2, "Ten Mastered", BadgeCriterion::Mastered(10)),
        ])
        .unwrap();
        let user = UserId::from_u128(7);

        assert!(repo.list_badges(user).await.unwrap().iter().all(|b| !b.is_earned()));

        repo.record_completion(user, ItemId::from_u128(1)).await.unwrap();
        let snap = repo.refresh_profile(user).await.unwrap();
        repo.refresh_profile(user).await.unwrap();
        assert_eq!(snap.total_practiced, 1);

        let board = repo.list_badges(user).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].badge.name, "First Stroke");
        assert_eq!(board[0].earned_at, Some(fixed_now()));
        assert!(!board[1].is_earned());
        // other learners are unaffected
        let other = repo.list_badges(UserId::from_u128(8)).await.unwrap();
        assert!(other.iter().all(|b| !b.is_earned()));
    }

    #[tokio::test]
    async fn completion_of_unknown_character_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .record_completion(UserId::from_u128(1), ItemId::from_u128(99))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_set_title_conflicts() {
        let repo = InMemoryRepository::new();
        let user = UserId::from_u128(1);
        repo.create_set(user, "HSK 1", None).await.unwrap();
        let err = repo.create_set(user, "HSK 1", None).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        // another user may reuse the title
        repo.create_set(UserId::from_u128(2), "HSK 1", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn items_append_after_existing_positions() {
        let repo = InMemoryRepository::new();
        let set = repo
            .create_set(UserId::from_u128(1), "Greetings", Some("basics"))
            .await
            .unwrap();
        repo.add_items(set, &[TermPair::new("你好", "hello")])
            .await
            .unwrap();
        repo.add_items(set, &[TermPair::new("再见", "goodbye")])
            .await
            .unwrap();

        let cards = repo.get_set_items(set).await.unwrap();
        let positions: Vec<u32> = cards.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2]);

        let sets = repo.list_sets(UserId::from_u128(1)).await.unwrap();
        assert_eq!(sets[0].card_count, 2);
    }

    #[tokio::test]
    async fn star_toggles_and_answers_count() {
        let repo = InMemoryRepository::new().with_clock(fixed_clock());
        let set = repo
            .create_set(UserId::from_u128(1), "Set", None)
            .await
            .unwrap();
        let ids = repo
            .add_items(set, &[TermPair::new("水", "water")])
            .await
            .unwrap();

        assert!(repo.toggle_star(ids[0]).await.unwrap());
        assert!(!repo.toggle_star(ids[0]).await.unwrap());

        repo.record_answer(ids[0], true).await.unwrap();
        repo.record_answer(ids[0], false).await.unwrap();
        let card = &repo.get_set_items(set).await.unwrap()[0];
        assert_eq!((card.times_correct, card.times_incorrect), (1, 1));
        assert_eq!(card.last_practiced, Some(fixed_now()));
    }

    #[tokio::test]
    async fn deleting_a_set_drops_its_cards() {
        let repo = InMemoryRepository::new();
        let set = repo
            .create_set(UserId::from_u128(1), "Set", None)
            .await
            .unwrap();
        repo.add_items(set, &[TermPair::new("a", "b")]).await.unwrap();
        repo.delete_set(set).await.unwrap();
        assert!(repo.get_set_items(set).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_set(set).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
