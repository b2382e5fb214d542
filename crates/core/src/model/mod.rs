mod badge;
mod ids;
mod item;
mod progress;
mod quiz;
mod study_set;

pub use badge::{Badge, BadgeCriterion, BadgeStatus, EarnedBadge, badge_board};
pub use ids::{BadgeId, ItemId, ParseIdError, SetId, UserId};
pub use item::{PracticeItem, SourceKind};
pub use progress::{
    CHARACTERS_PER_LEVEL, MASTERY_THRESHOLD, ProgressRecord, ProgressState, RecentPractice,
    UserProgressSnapshot, level_for, snapshot_from, streak_days,
};
pub use quiz::{QuizLog, QuizResult, Score, ScoreBand};
pub use study_set::{
    CardOrientation, Flashcard, StudySet, StudySetDraft, StudySetError, TermPair,
    ValidatedStudySet,
};
