use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::item::PracticeItem;

/// Completions of the same character needed before it counts as mastered.
pub const MASTERY_THRESHOLD: u32 = 3;

/// Mastered characters per level step.
pub const CHARACTERS_PER_LEVEL: u32 = 10;

/// Learner aggregate shown in the dashboard header.
///
/// A cache of the backend's state; the backend stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgressSnapshot {
    pub level: u32,
    pub mastered: u32,
    pub learning: u32,
    pub streak_days: u32,
    /// Completions across every character, repeats included.
    pub total_practiced: u32,
}

impl Default for UserProgressSnapshot {
    fn default() -> Self {
        Self {
            level: 1,
            mastered: 0,
            learning: 0,
            streak_days: 0,
            total_practiced: 0,
        }
    }
}

/// Per-character learning state kept by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    New,
    Learning,
    Mastered,
}

impl ProgressState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressState::New => "new",
            ProgressState::Learning => "learning",
            ProgressState::Mastered => "mastered",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ProgressState::New),
            "learning" => Some(ProgressState::Learning),
            "mastered" => Some(ProgressState::Mastered),
            _ => None,
        }
    }
}

/// Progress row for one (user, character) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRecord {
    pub state: ProgressState,
    pub times_practiced: u32,
    pub last_practiced: DateTime<Utc>,
}

impl ProgressRecord {
    /// Row created by the first completion of a character.
    #[must_use]
    pub fn first_completion(at: DateTime<Utc>) -> Self {
        Self {
            state: ProgressState::Learning,
            times_practiced: 1,
            last_practiced: at,
        }
    }

    /// Apply one more completion: absent rows start learning, learning rows
    /// become mastered once they reach `MASTERY_THRESHOLD`.
    #[must_use]
    pub fn advance(existing: Option<Self>, at: DateTime<Utc>) -> Self {
        let Some(mut record) = existing else {
            return Self::first_completion(at);
        };
        record.times_practiced = record.times_practiced.saturating_add(1);
        record.last_practiced = at;
        if record.state != ProgressState::Mastered {
            record.state = if record.times_practiced >= MASTERY_THRESHOLD {
                ProgressState::Mastered
            } else {
                ProgressState::Learning
            };
        }
        record
    }
}

/// Level reached for a number of mastered characters.
#[must_use]
pub fn level_for(mastered: u32) -> u32 {
    1 + mastered / CHARACTERS_PER_LEVEL
}

/// Consecutive practice days ending today, or yesterday when today has no
/// practice yet.
#[must_use]
pub fn streak_days(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0_u32;
    while days.contains(&cursor) {
        streak = streak.saturating_add(1);
        cursor -= Duration::days(1);
    }
    streak
}

/// Build the aggregate from per-character records and practice days.
#[must_use]
pub fn snapshot_from(
    records: impl IntoIterator<Item = ProgressRecord>,
    practice_days: impl IntoIterator<Item = NaiveDate>,
    today: NaiveDate,
) -> UserProgressSnapshot {
    let mut mastered = 0_u32;
    let mut learning = 0_u32;
    let mut total_practiced = 0_u32;
    for record in records {
        match record.state {
            ProgressState::Mastered => mastered = mastered.saturating_add(1),
            ProgressState::Learning => learning = learning.saturating_add(1),
            ProgressState::New => {}
        }
        total_practiced = total_practiced.saturating_add(record.times_practiced);
    }
    UserProgressSnapshot {
        level: level_for(mastered),
        mastered,
        learning,
        streak_days: streak_days(practice_days, today),
        total_practiced,
    }
}

/// A recently practiced character for the dashboard activity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPractice {
    pub item: PracticeItem,
    pub state: ProgressState,
    pub last_practiced: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn day(offset: i64) -> NaiveDate {
        fixed_now().date_naive() + Duration::days(offset)
    }

    #[test]
    fn first_completion_starts_learning() {
        let record = ProgressRecord::advance(None, fixed_now());
        assert_eq!(record.state, ProgressState::Learning);
        assert_eq!(record.times_practiced, 1);
    }

    #[test]
    fn threshold_promotes_to_mastered_and_stays() {
        let mut record = ProgressRecord::advance(None, fixed_now());
        for _ in 1..MASTERY_THRESHOLD {
            record = ProgressRecord::advance(Some(record), fixed_now());
        }
        assert_eq!(record.state, ProgressState::Mastered);
        let again = ProgressRecord::advance(Some(record), fixed_now());
        assert_eq!(again.state, ProgressState::Mastered);
    }

    #[test]
    fn streak_counts_back_from_today() {
        assert_eq!(streak_days([day(0), day(-1), day(-2), day(-4)], day(0)), 3);
    }

    #[test]
    fn streak_survives_until_today_is_practiced() {
        assert_eq!(streak_days([day(-1), day(-2)], day(0)), 2);
        assert_eq!(streak_days([day(-2)], day(0)), 0);
    }

    fn record(state: ProgressState, times_practiced: u32) -> ProgressRecord {
        ProgressRecord {
            state,
            times_practiced,
            last_practiced: fixed_now(),
        }
    }

    #[test]
    fn snapshot_counts_states_and_levels() {
        let mut records = vec![record(ProgressState::Mastered, 3); 12];
        records.push(record(ProgressState::Learning, 2));
        let snap = snapshot_from(records, [day(0)], day(0));
        assert_eq!(snap.level, 2);
        assert_eq!(snap.mastered, 12);
        assert_eq!(snap.learning, 1);
        assert_eq!(snap.streak_days, 1);
        assert_eq!(snap.total_practiced, 38);
    }
}
