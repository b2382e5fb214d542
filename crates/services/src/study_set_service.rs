use std::sync::Arc;

use hanzi_core::model::{Flashcard, ItemId, SetId, StudySet, StudySetDraft, TermPair, UserId};
use hanzi_core::{Delimiter, ImportError, ImportPreview, parse_delimited, serialize_pairs};
use storage::repository::{AuthSession, StudySetRepository};
use tracing::{info, warn};

use crate::error::StudySetServiceError;

/// What a commit persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub set_id: SetId,
    pub cards_added: usize,
    /// Set saved but its cards were not.
    pub warning: Option<String>,
}

/// Create, import, edit and export study sets for the signed-in user.
#[derive(Clone)]
pub struct StudySetService {
    auth: Arc<dyn AuthSession>,
    sets: Arc<dyn StudySetRepository>,
}

impl StudySetService {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthSession>, sets: Arc<dyn StudySetRepository>) -> Self {
        Self { auth, sets }
    }

    fn user(&self) -> Result<UserId, StudySetServiceError> {
        self.auth
            .current_user_id()
            .ok_or(StudySetServiceError::NotSignedIn)
    }

    /// Validate a builder draft and persist it as a new set.
    ///
    /// A set whose cards fail to save is still returned, with a warning.
    ///
    /// # Errors
    ///
    /// Returns `StudySetServiceError::Draft` for an invalid draft,
    /// `DuplicateTitle` when the title is taken, or `Storage`.
    pub async fn create_from_draft(
        &self,
        draft: &StudySetDraft,
    ) -> Result<CommitOutcome, StudySetServiceError> {
        let user = self.user()?;
        let valid = draft.validate()?;
        self.commit_new(user, &valid.title, valid.description.as_deref(), &valid.pairs)
            .await
    }

    /// Parse delimited text without persisting anything.
    #[must_use]
    pub fn preview_import(text: &str, delimiter: &Delimiter) -> ImportPreview {
        parse_delimited(text, delimiter)
    }

    /// Parse delimited text and persist it as a new set.
    ///
    /// A blank description becomes "Imported N cards".
    ///
    /// # Errors
    ///
    /// Returns `StudySetServiceError::Import` when the text is empty or yields
    /// no card, `Draft` for a blank title, and the `create_from_draft` errors.
    pub async fn import(
        &self,
        title: &str,
        description: Option<&str>,
        text: &str,
        delimiter: &Delimiter,
    ) -> Result<CommitOutcome, StudySetServiceError> {
        let user = self.user()?;
        if text.trim().is_empty() {
            return Err(ImportError::EmptyInput.into());
        }
        let preview = parse_delimited(text, delimiter);
        let dropped = preview.dropped_count();
        let pairs = preview.into_pairs()?;

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map_or_else(|| format!("Imported {} cards", pairs.len()), str::to_owned);
        let draft = StudySetDraft::new(title, description).with_rows(pairs);
        let valid = draft.validate()?;

        if dropped > 0 {
            info!(dropped, "import skipped invalid lines");
        }
        self.commit_new(user, &valid.title, valid.description.as_deref(), &valid.pairs)
            .await
    }

    async fn commit_new(
        &self,
        user: UserId,
        title: &str,
        description: Option<&str>,
        pairs: &[TermPair],
    ) -> Result<CommitOutcome, StudySetServiceError> {
        let set_id = self.sets.create_set(user, title, description).await?;
        match self.sets.add_items(set_id, pairs).await {
            Ok(ids) => {
                info!(user_id = %user, set_id = %set_id, cards = ids.len(), "study set created");
                Ok(CommitOutcome {
                    set_id,
                    cards_added: ids.len(),
                    warning: None,
                })
            }
            Err(err) => {
                warn!(set_id = %set_id, error = %err, "study set created without cards");
                Ok(CommitOutcome {
                    set_id,
                    cards_added: 0,
                    warning: Some(format!("set created but cards were not saved: {err}")),
                })
            }
        }
    }

    /// Seed an edit draft from a stored set.
    ///
    /// # Errors
    ///
    /// Returns `StudySetServiceError::NotFound` when the user has no such set.
    pub async fn edit_draft(&self, set_id: SetId) -> Result<StudySetDraft, StudySetServiceError> {
        let set = self.find(set_id).await?;
        let cards = self.sets.get_set_items(set_id).await?;
        Ok(StudySetDraft::from_cards(&set, &cards))
    }

    /// Replace a set's title, description and cards with the draft's.
    ///
    /// Card progress counters start over for the rewritten cards.
    ///
    /// # Errors
    ///
    /// Returns `Draft` for an invalid draft, `NotFound`, `DuplicateTitle` or
    /// `Storage`.
    pub async fn update_from_draft(
        &self,
        set_id: SetId,
        draft: &StudySetDraft,
    ) -> Result<CommitOutcome, StudySetServiceError> {
        self.user()?;
        let valid = draft.validate()?;
        self.sets
            .update_set(set_id, &valid.title, valid.description.as_deref())
            .await?;
        self.sets.clear_items(set_id).await?;
        match self.sets.add_items(set_id, &valid.pairs).await {
            Ok(ids) => Ok(CommitOutcome {
                set_id,
                cards_added: ids.len(),
                warning: None,
            }),
            Err(err) => {
                warn!(set_id = %set_id, error = %err, "study set updated without cards");
                Ok(CommitOutcome {
                    set_id,
                    cards_added: 0,
                    warning: Some(format!("set updated but cards were not saved: {err}")),
                })
            }
        }
    }

    /// # Errors
    ///
    /// Returns `NotSignedIn`, `NotFound` or `Storage`.
    pub async fn delete(&self, set_id: SetId) -> Result<(), StudySetServiceError> {
        self.user()?;
        self.sets.delete_set(set_id).await?;
        info!(set_id = %set_id, "study set deleted");
        Ok(())
    }

    /// The user's sets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` or `Storage`.
    pub async fn list(&self) -> Result<Vec<StudySet>, StudySetServiceError> {
        let user = self.user()?;
        Ok(self.sets.list_sets(user).await?)
    }

    /// # Errors
    ///
    /// Returns `Storage` on backend failures.
    pub async fn cards(&self, set_id: SetId) -> Result<Vec<Flashcard>, StudySetServiceError> {
        Ok(self.sets.get_set_items(set_id).await?)
    }

    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    pub async fn remove_card(&self, card: ItemId) -> Result<(), StudySetServiceError> {
        self.sets.remove_item(card).await?;
        Ok(())
    }

    /// Flip a card's star; returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    pub async fn toggle_star(&self, card: ItemId) -> Result<bool, StudySetServiceError> {
        Ok(self.sets.toggle_star(card).await?)
    }

    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    pub async fn record_answer(
        &self,
        card: ItemId,
        correct: bool,
    ) -> Result<(), StudySetServiceError> {
        self.sets.record_answer(card, correct).await?;
        Ok(())
    }

    /// Serialize a set's cards back to delimited text.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failures.
    pub async fn export(
        &self,
        set_id: SetId,
        delimiter: &Delimiter,
    ) -> Result<String, StudySetServiceError> {
        let pairs: Vec<TermPair> = self
            .sets
            .get_set_items(set_id)
            .await?
            .into_iter()
            .map(|card| TermPair::new(card.term, card.definition))
            .collect();
        Ok(serialize_pairs(&pairs, delimiter))
    }

    async fn find(&self, set_id: SetId) -> Result<StudySet, StudySetServiceError> {
        let user = self.user()?;
        self.sets
            .list_sets(user)
            .await?
            .into_iter()
            .find(|set| set.id == set_id)
            .ok_or(StudySetServiceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hanzi_core::model::StudySetError;
    use storage::repository::{InMemoryRepository, StaticAuth, StorageError};

    fn user() -> UserId {
        UserId::from_u128(7)
    }

    fn service(repo: InMemoryRepository) -> StudySetService {
        StudySetService::new(Arc::new(StaticAuth::signed_in(user())), Arc::new(repo))
    }

    #[tokio::test]
    async fn draft_commit_skips_incomplete_rows() {
        let svc = service(InMemoryRepository::new());
        let draft = StudySetDraft::new("Greetings", "").with_rows([
            TermPair::new("你好", "hello"),
            TermPair::new("再见", ""),
            TermPair::new(" 谢谢 ", " thank you "),
        ]);

        let outcome = svc.create_from_draft(&draft).await.unwrap();
        assert_eq!(outcome.cards_added, 2);
        assert!(outcome.warning.is_none());

        let cards = svc.cards(outcome.set_id).await.unwrap();
        let terms: Vec<&str> = cards.iter().map(|c| c.term.as_str()).collect();
        assert_eq!(terms, vec!["你好", "谢谢"]);
        assert_eq!(cards[1].definition, "thank you");
    }

    #[tokio::test]
    async fn invalid_drafts_are_refused_before_storage() {
        let svc = service(InMemoryRepository::new());
        let untitled = StudySetDraft::new("  ", "").with_rows([TermPair::new("a", "b")]);
        assert!(matches!(
            svc.create_from_draft(&untitled).await,
            Err(StudySetServiceError::Draft(StudySetError::EmptyTitle))
        ));
        let empty = StudySetDraft::new("Empty", "");
        assert!(matches!(
            svc.create_from_draft(&empty).await,
            Err(StudySetServiceError::Draft(StudySetError::NoCompleteRows))
        ));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn import_fills_default_description() {
        let svc = service(InMemoryRepository::new());
        let text = "hello\t你好\nbroken line\n\ngoodbye\t再见";
        let outcome = svc
            .import("Basics", None, text, &Delimiter::Tab)
            .await
            .unwrap();
        assert_eq!(outcome.cards_added, 2);

        let sets = svc.list().await.unwrap();
        assert_eq!(sets[0].description.as_deref(), Some("Imported 2 cards"));
    }

    #[tokio::test]
    async fn import_without_valid_lines_fails() {
        let svc = service(InMemoryRepository::new());
        let err = svc
            .import("Bad", None, "no delimiter here", &Delimiter::Tab)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StudySetServiceError::Import(ImportError::NoValidLines { dropped: 1 })
        ));
        let err = svc.import("Bad", None, "  \n ", &Delimiter::Tab).await.unwrap_err();
        assert!(matches!(
            err,
            StudySetServiceError::Import(ImportError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn duplicate_title_maps_to_service_error() {
        let svc = service(InMemoryRepository::new());
        let draft = StudySetDraft::new("Same", "").with_rows([TermPair::new("a", "b")]);
        svc.create_from_draft(&draft).await.unwrap();
        assert!(matches!(
            svc.create_from_draft(&draft).await,
            Err(StudySetServiceError::DuplicateTitle)
        ));
    }

    #[tokio::test]
    async fn edit_round_trip_rewrites_cards() {
        let svc = service(InMemoryRepository::new());
        let draft = StudySetDraft::new("Colors", "basic").with_rows([
            TermPair::new("红", "red"),
            TermPair::new("蓝", "blue"),
        ]);
        let set_id = svc.create_from_draft(&draft).await.unwrap().set_id;

        let mut edit = svc.edit_draft(set_id).await.unwrap();
        assert_eq!(edit.rows().len(), 2);
        assert!(edit.remove_row(0));
        edit.add_row();
        edit.update_row(1, TermPair::new("绿", "green"));
        edit.set_title("Colours");

        let outcome = svc.update_from_draft(set_id, &edit).await.unwrap();
        assert_eq!(outcome.cards_added, 2);
        let exported = svc.export(set_id, &Delimiter::Comma).await.unwrap();
        assert_eq!(exported, "蓝,blue\n绿,green");
        assert_eq!(svc.list().await.unwrap()[0].title, "Colours");
    }

    #[tokio::test]
    async fn signed_out_user_cannot_list() {
        let svc = StudySetService::new(
            Arc::new(StaticAuth::signed_out()),
            Arc::new(InMemoryRepository::new()),
        );
        assert!(matches!(
            svc.list().await,
            Err(StudySetServiceError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn missing_set_is_not_found() {
        let svc = service(InMemoryRepository::new());
        assert!(matches!(
            svc.edit_draft(SetId::from_u128(99)).await,
            Err(StudySetServiceError::NotFound)
        ));
    }

    /// Delegates to memory but refuses to add cards.
    #[derive(Clone, Default)]
    struct CardsOffline(InMemoryRepository);

    #[async_trait]
    impl StudySetRepository for CardsOffline {
        async fn create_set(
            &self,
            user: UserId,
            title: &str,
            description: Option<&str>,
        ) -> Result<SetId, StorageError> {
            self.0.create_set(user, title, description).await
        }
        async fn update_set(
            &self,
            set_id: SetId,
            title: &str,
            description: Option<&str>,
        ) -> Result<(), StorageError> {
            self.0.update_set(set_id, title, description).await
        }
        async fn add_items(
            &self,
            _set_id: SetId,
            _items: &[TermPair],
        ) -> Result<Vec<ItemId>, StorageError> {
            Err(StorageError::Connection("network down".into()))
        }
        async fn clear_items(&self, set_id: SetId) -> Result<(), StorageError> {
            self.0.clear_items(set_id).await
        }
        async fn delete_set(&self, set_id: SetId) -> Result<(), StorageError> {
            self.0.delete_set(set_id).await
        }
        async fn list_sets(&self, user: UserId) -> Result<Vec<StudySet>, StorageError> {
            self.0.list_sets(user).await
        }
        async fn get_set_items(&self, set_id: SetId) -> Result<Vec<Flashcard>, StorageError> {
            self.0.get_set_items(set_id).await
        }
        async fn remove_item(&self, item: ItemId) -> Result<(), StorageError> {
            self.0.remove_item(item).await
        }
        async fn record_answer(&self, card: ItemId, correct: bool) -> Result<(), StorageError> {
            self.0.record_answer(card, correct).await
        }
        async fn toggle_star(&self, card: ItemId) -> Result<bool, StorageError> {
            self.0.toggle_star(card).await
        }
    }

    #[tokio::test]
    async fn card_failure_after_create_keeps_the_set_with_a_warning() {
        let svc = StudySetService::new(
            Arc::new(StaticAuth::signed_in(user())),
            Arc::new(CardsOffline::default()),
        );
        let draft = StudySetDraft::new("Half", "").with_rows([TermPair::new("a", "b")]);
        let outcome = svc.create_from_draft(&draft).await.unwrap();
        assert_eq!(outcome.cards_added, 0);
        assert!(outcome.warning.is_some());
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }
}
