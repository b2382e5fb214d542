//! PostgREST row shapes and their conversion into core types.

use chrono::{DateTime, Utc};
use hanzi_core::model::{
    Badge, BadgeId, EarnedBadge, Flashcard, ItemId, PracticeItem, RecentPractice, SetId, StudySet,
    UserProgressSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CharacterRow {
    pub id: ItemId,
    pub character: String,
    pub pinyin: String,
    pub meaning: String,
}

impl CharacterRow {
    pub fn into_item(self) -> PracticeItem {
        PracticeItem::character(self.id, self.character, self.pinyin, self.meaning)
    }
}

/// `user_character_progress` joined with its character.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProgressRow {
    pub state: String,
    pub last_practiced: DateTime<Utc>,
    pub characters: CharacterRow,
}

impl ProgressRow {
    pub fn into_recent(self) -> Result<RecentPractice, StorageError> {
        let state = hanzi_core::model::ProgressState::parse(&self.state)
            .ok_or_else(|| StorageError::Serialization(format!("invalid state: {}", self.state)))?;
        Ok(RecentPractice {
            item: self.characters.into_item(),
            state,
            last_practiced: self.last_practiced,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileRow {
    #[serde(default = "first_level")]
    pub level: u32,
    #[serde(default)]
    pub mastered: u32,
    #[serde(default)]
    pub learning: u32,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub total_characters_practiced: u32,
}

fn first_level() -> u32 {
    1
}

impl From<ProfileRow> for UserProgressSnapshot {
    fn from(row: ProfileRow) -> Self {
        Self {
            level: row.level.max(1),
            mastered: row.mastered,
            learning: row.learning,
            streak_days: row.streak,
            total_practiced: row.total_characters_practiced,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BadgeRow {
    pub id: BadgeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_emoji: Option<String>,
}

impl BadgeRow {
    pub fn into_badge(self) -> Badge {
        Badge {
            id: self.id,
            name: self.name,
            description: self.description.unwrap_or_default(),
            icon: self.icon_emoji.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EarnedBadgeRow {
    pub badge_id: BadgeId,
    pub earned_at: DateTime<Utc>,
}

impl From<EarnedBadgeRow> for EarnedBadge {
    fn from(row: EarnedBadgeRow) -> Self {
        Self {
            badge_id: row.badge_id,
            earned_at: row.earned_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdRow<T> {
    pub id: T,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CountRow {
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SetRow {
    pub id: SetId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    /// Embedded `flashcards(count)` aggregate.
    #[serde(default)]
    pub flashcards: Vec<CountRow>,
}

impl From<SetRow> for StudySet {
    fn from(row: SetRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description.filter(|d| !d.trim().is_empty()),
            card_count: row.flashcards.first().map_or(0, |c| c.count),
            is_public: row.is_public,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CardRow {
    pub id: ItemId,
    pub set_id: SetId,
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub mastered: bool,
    #[serde(default)]
    pub times_correct: u32,
    #[serde(default)]
    pub times_incorrect: u32,
    #[serde(default)]
    pub last_practiced: Option<DateTime<Utc>>,
}

impl From<CardRow> for Flashcard {
    fn from(row: CardRow) -> Self {
        Self {
            id: row.id,
            set_id: row.set_id,
            term: row.term,
            definition: row.definition,
            position: row.position,
            starred: row.starred,
            mastered: row.mastered,
            times_correct: row.times_correct,
            times_incorrect: row.times_incorrect,
            last_practiced: row.last_practiced,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewSetBody<'a> {
    pub user_id: String,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewCardBody<'a> {
    pub set_id: String,
    pub term: &'a str,
    pub definition: &'a str,
    pub position: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PositionRow {
    pub position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanzi_core::model::{ProgressState, SourceKind};

    #[test]
    fn set_row_reads_embedded_count() {
        let json = r#"[{
            "id": "00000000-0000-0000-0000-000000000001",
            "title": "HSK 1",
            "description": "",
            "created_at": "2024-01-02T03:04:05Z",
            "flashcards": [{"count": 12}]
        }]"#;
        let rows: Vec<SetRow> = serde_json::from_str(json).unwrap();
        let set = StudySet::from(rows.into_iter().next().unwrap());
        assert_eq!(set.card_count, 12);
        assert_eq!(set.description, None);
        assert!(!set.is_public);
    }

    #[test]
    fn card_row_defaults_missing_stats() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000002",
            "set_id": "00000000-0000-0000-0000-000000000001",
            "term": "你好",
            "definition": "hello"
        }"#;
        let card = Flashcard::from(serde_json::from_str::<CardRow>(json).unwrap());
        assert_eq!(card.times_correct, 0);
        assert!(!card.starred);
        assert_eq!(card.last_practiced, None);
    }

    #[test]
    fn progress_row_becomes_recent_practice() {
        let json = r#"{
            "state": "learning",
            "last_practiced": "2024-01-02T03:04:05Z",
            "characters": {
                "id": "00000000-0000-0000-0000-000000000003",
                "character": "的",
                "pinyin": "de",
                "meaning": "possessive particle"
            }
        }"#;
        let recent = serde_json::from_str::<ProgressRow>(json)
            .unwrap()
            .into_recent()
            .unwrap();
        assert_eq!(recent.state, ProgressState::Learning);
        assert_eq!(recent.item.primary(), "的");
        assert_eq!(recent.item.source(), SourceKind::Catalog);
    }

    #[test]
    fn unknown_progress_state_is_rejected() {
        let json = r#"{
            "state": "forgotten",
            "last_practiced": "2024-01-02T03:04:05Z",
            "characters": {
                "id": "00000000-0000-0000-0000-000000000003",
                "character": "的",
                "pinyin": "de",
                "meaning": ""
            }
        }"#;
        let err = serde_json::from_str::<ProgressRow>(json)
            .unwrap()
            .into_recent()
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn profile_row_maps_streak() {
        let row: ProfileRow =
            serde_json::from_str(r#"{"level": 3, "mastered": 25, "learning": 4, "streak": 6}"#)
                .unwrap();
        let snap = UserProgressSnapshot::from(row);
        assert_eq!(snap.streak_days, 6);
        assert_eq!(snap.level, 3);
        assert_eq!(snap.total_practiced, 0);
    }

    #[test]
    fn badge_row_tolerates_null_description() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000009",
            "name": "Week Streak",
            "description": null,
            "icon_emoji": "🔥"
        }"#;
        let badge = serde_json::from_str::<BadgeRow>(json).unwrap().into_badge();
        assert_eq!(badge.description, "");
        assert_eq!(badge.icon, "🔥");
    }
}
