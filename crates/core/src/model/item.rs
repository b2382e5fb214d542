use serde::{Deserialize, Serialize};

use crate::model::ids::ItemId;

/// Where a practice item was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The shared character catalog, ordered by frequency.
    Catalog,
    /// Characters entered by the learner outside any saved set.
    Custom,
    /// A card of a user study set.
    StudySet,
}

impl SourceKind {
    /// Whether completing this item feeds the learner's character mastery.
    #[must_use]
    pub fn tracks_mastery(self) -> bool {
        matches!(self, SourceKind::Catalog)
    }

    /// Whether quiz verdicts on this item are recorded against a card.
    #[must_use]
    pub fn records_answers(self) -> bool {
        matches!(self, SourceKind::StudySet)
    }
}

/// A single thing to practice: a Hanzi with pinyin and meaning, or a term with
/// its definition.
///
/// Immutable once built; sessions own clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeItem {
    id: ItemId,
    primary: String,
    secondary: String,
    tertiary: Option<String>,
    source: SourceKind,
}

impl PracticeItem {
    #[must_use]
    pub fn new(
        id: ItemId,
        primary: impl Into<String>,
        secondary: impl Into<String>,
        source: SourceKind,
    ) -> Self {
        Self {
            id,
            primary: primary.into(),
            secondary: secondary.into(),
            tertiary: None,
            source,
        }
    }

    /// Catalog character: glyph, pinyin and meaning.
    #[must_use]
    pub fn character(
        id: ItemId,
        hanzi: impl Into<String>,
        pinyin: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Self {
        Self::new(id, hanzi, pinyin, SourceKind::Catalog).with_tertiary(meaning)
    }

    #[must_use]
    pub fn with_tertiary(mut self, tertiary: impl Into<String>) -> Self {
        let tertiary = tertiary.into();
        self.tertiary = if tertiary.trim().is_empty() {
            None
        } else {
            Some(tertiary)
        };
        self
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// The Hanzi or the term shown as the prompt.
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Pinyin or definition.
    #[must_use]
    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    #[must_use]
    pub fn tertiary(&self) -> Option<&str> {
        self.tertiary.as_deref()
    }

    #[must_use]
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Canonical answer used by quizzes.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.secondary
    }
}
