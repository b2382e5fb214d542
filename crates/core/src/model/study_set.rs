use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ItemId, SetId};
use crate::model::item::{PracticeItem, SourceKind};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySetError {
    #[error("study set title cannot be empty")]
    EmptyTitle,

    #[error("add at least one card with both a term and a definition")]
    NoCompleteRows,
}

//
// ─── TERM PAIRS ────────────────────────────────────────────────────────────────
//

/// A term with its definition, as typed or imported by the learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub term: String,
    pub definition: String,
}

impl TermPair {
    #[must_use]
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }

    /// Both fields carry text after trimming.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.term.trim().is_empty() && !self.definition.trim().is_empty()
    }

    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self::new(self.term.trim(), self.definition.trim())
    }
}

/// Which field of a card is asked and which is expected as the answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardOrientation {
    /// Show the term, answer with the definition.
    #[default]
    TermFirst,
    /// Show the definition, answer with the term.
    DefinitionFirst,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Study set being created or edited in builder mode.
///
/// Rows may be incomplete while editing; `validate` drops them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySetDraft {
    title: String,
    description: String,
    rows: Vec<TermPair>,
}

impl Default for StudySetDraft {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl StudySetDraft {
    /// New draft with a single blank row.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            rows: vec![TermPair::default()],
        }
    }

    /// Seed an edit draft from a persisted set and its cards.
    #[must_use]
    pub fn from_cards(set: &StudySet, cards: &[Flashcard]) -> Self {
        let mut rows: Vec<TermPair> = cards
            .iter()
            .map(|card| TermPair::new(card.term.clone(), card.definition.clone()))
            .collect();
        if rows.is_empty() {
            rows.push(TermPair::default());
        }
        Self {
            title: set.title.clone(),
            description: set.description.clone().unwrap_or_default(),
            rows,
        }
    }

    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = TermPair>) -> Self {
        self.rows = rows.into_iter().collect();
        if self.rows.is_empty() {
            self.rows.push(TermPair::default());
        }
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn rows(&self) -> &[TermPair] {
        &self.rows
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn add_row(&mut self) {
        self.rows.push(TermPair::default());
    }

    /// Remove a row; the last remaining row is kept.
    ///
    /// Returns `true` when a row was removed.
    pub fn remove_row(&mut self, index: usize) -> bool {
        if self.rows.len() <= 1 || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    /// Replace the row at `index`. Out-of-range indices are ignored.
    pub fn update_row(&mut self, index: usize, pair: TermPair) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                *row = pair;
                true
            }
            None => false,
        }
    }

    /// Complete rows, trimmed, in their original order.
    #[must_use]
    pub fn complete_rows(&self) -> Vec<TermPair> {
        self.rows
            .iter()
            .filter(|row| row.is_complete())
            .map(TermPair::trimmed)
            .collect()
    }

    /// Check the draft can be committed.
    ///
    /// # Errors
    ///
    /// Returns `StudySetError::EmptyTitle` for a blank title and
    /// `StudySetError::NoCompleteRows` when no row has both fields.
    pub fn validate(&self) -> Result<ValidatedStudySet, StudySetError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(StudySetError::EmptyTitle);
        }
        let pairs = self.complete_rows();
        if pairs.is_empty() {
            return Err(StudySetError::NoCompleteRows);
        }
        let description = self.description.trim();
        Ok(ValidatedStudySet {
            title: title.to_owned(),
            description: (!description.is_empty()).then(|| description.to_owned()),
            pairs,
        })
    }
}

/// A draft that passed validation and is ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStudySet {
    pub title: String,
    pub description: Option<String>,
    pub pairs: Vec<TermPair>,
}

//
// ─── PERSISTED SHAPES ──────────────────────────────────────────────────────────
//

/// A saved study set as listed to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySet {
    pub id: SetId,
    pub title: String,
    pub description: Option<String>,
    pub card_count: u32,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// A saved card with the learner's running stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: ItemId,
    pub set_id: SetId,
    pub term: String,
    pub definition: String,
    pub position: u32,
    pub starred: bool,
    pub mastered: bool,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl Flashcard {
    #[must_use]
    pub fn question(&self, orientation: CardOrientation) -> &str {
        match orientation {
            CardOrientation::TermFirst => &self.term,
            CardOrientation::DefinitionFirst => &self.definition,
        }
    }

    #[must_use]
    pub fn answer(&self, orientation: CardOrientation) -> &str {
        match orientation {
            CardOrientation::TermFirst => &self.definition,
            CardOrientation::DefinitionFirst => &self.term,
        }
    }

    /// Project the card into a session item, question first.
    #[must_use]
    pub fn to_practice_item(&self, orientation: CardOrientation) -> PracticeItem {
        PracticeItem::new(
            self.id,
            self.question(orientation),
            self.answer(orientation),
            SourceKind::StudySet,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn card(term: &str, definition: &str) -> Flashcard {
        Flashcard {
            id: ItemId::from_u128(1),
            set_id: SetId::from_u128(9),
            term: term.into(),
            definition: definition.into(),
            position: 1,
            starred: false,
            mastered: false,
            times_correct: 0,
            times_incorrect: 0,
            last_practiced: None,
        }
    }

    #[test]
    fn validate_drops_incomplete_rows() {
        let draft = StudySetDraft::new("  HSK 1 ", "").with_rows([
            TermPair::new("你", "you"),
            TermPair::new("好", "  "),
            TermPair::new("", "orphan"),
            TermPair::new(" 我 ", " I "),
        ]);

        let validated = draft.validate().unwrap();
        assert_eq!(validated.title, "HSK 1");
        assert_eq!(validated.description, None);
        assert_eq!(
            validated.pairs,
            vec![TermPair::new("你", "you"), TermPair::new("我", "I")]
        );
    }

    #[test]
    fn validate_rejects_blank_title() {
        let draft = StudySetDraft::new("   ", "").with_rows([TermPair::new("a", "b")]);
        assert_eq!(draft.validate().unwrap_err(), StudySetError::EmptyTitle);
    }

    #[test]
    fn validate_requires_a_complete_row() {
        let draft = StudySetDraft::new("Set", "desc");
        assert_eq!(draft.validate().unwrap_err(), StudySetError::NoCompleteRows);
    }

    #[test]
    fn last_row_cannot_be_removed() {
        let mut draft = StudySetDraft::new("Set", "");
        assert!(!draft.remove_row(0));
        draft.add_row();
        assert!(draft.remove_row(1));
        assert_eq!(draft.rows().len(), 1);
    }

    #[test]
    fn edit_draft_from_empty_set_has_one_blank_row() {
        let set = StudySet {
            id: SetId::from_u128(9),
            title: "Empty".into(),
            description: Some("nothing yet".into()),
            card_count: 0,
            is_public: false,
            created_at: fixed_now(),
        };
        let draft = StudySetDraft::from_cards(&set, &[]);
        assert_eq!(draft.rows(), &[TermPair::default()]);
        assert_eq!(draft.description(), "nothing yet");
    }

    #[test]
    fn orientation_swaps_question_and_answer() {
        let card = card("goodbye", "再见");
        let item = card.to_practice_item(CardOrientation::DefinitionFirst);
        assert_eq!(item.primary(), "再见");
        assert_eq!(item.answer(), "goodbye");
        assert_eq!(item.source(), SourceKind::StudySet);
    }
}
