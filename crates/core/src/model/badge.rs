use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ids::BadgeId;
use crate::model::progress::UserProgressSnapshot;

/// Achievement shown on the dashboard, earned or locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub icon: String,
}

/// A badge the learner already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub badge_id: BadgeId,
    pub earned_at: DateTime<Utc>,
}

/// One badge as the learner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeStatus {
    pub badge: Badge,
    pub earned_at: Option<DateTime<Utc>>,
}

impl BadgeStatus {
    #[must_use]
    pub fn is_earned(&self) -> bool {
        self.earned_at.is_some()
    }
}

/// Profile threshold that awards a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum BadgeCriterion {
    Mastered(u32),
    Streak(u32),
    Practiced(u32),
}

impl BadgeCriterion {
    #[must_use]
    pub fn is_met(self, profile: &UserProgressSnapshot) -> bool {
        match self {
            Self::Mastered(n) => profile.mastered >= n,
            Self::Streak(n) => profile.streak_days >= n,
            Self::Practiced(n) => profile.total_practiced >= n,
        }
    }

    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Mastered(_) => "mastered",
            Self::Streak(_) => "streak",
            Self::Practiced(_) => "practiced",
        }
    }

    #[must_use]
    pub fn threshold(self) -> u32 {
        match self {
            Self::Mastered(n) | Self::Streak(n) | Self::Practiced(n) => n,
        }
    }

    #[must_use]
    pub fn from_parts(kind: &str, threshold: u32) -> Option<Self> {
        match kind {
            "mastered" => Some(Self::Mastered(threshold)),
            "streak" => Some(Self::Streak(threshold)),
            "practiced" => Some(Self::Practiced(threshold)),
            _ => None,
        }
    }
}

/// Join the badge catalog with the learner's earned rows, ordered by name.
#[must_use]
pub fn badge_board(badges: Vec<Badge>, earned: &[EarnedBadge]) -> Vec<BadgeStatus> {
    let earned: HashMap<BadgeId, DateTime<Utc>> =
        earned.iter().map(|e| (e.badge_id, e.earned_at)).collect();
    let mut board: Vec<BadgeStatus> = badges
        .into_iter()
        .map(|badge| BadgeStatus {
            earned_at: earned.get(&badge.id).copied(),
            badge,
        })
        .collect();
    board.sort_by(|a, b| a.badge.name.cmp(&b.badge.name));
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn badge(n: u128, name: &str) -> Badge {
        Badge {
            id: BadgeId::from_u128(n),
            name: name.into(),
            description: String::new(),
            icon: "🏅".into(),
        }
    }

    #[test]
    fn board_marks_earned_and_sorts_by_name() {
        let earned = [EarnedBadge {
            badge_id: BadgeId::from_u128(2),
            earned_at: fixed_now(),
        }];
        let board = badge_board(vec![badge(1, "Week Streak"), badge(2, "First Steps")], &earned);

        assert_eq!(board[0].badge.name, "First Steps");
        assert!(board[0].is_earned());
        assert!(!board[1].is_earned());
    }

    #[test]
    fn criteria_read_the_matching_counter() {
        let profile = UserProgressSnapshot {
            mastered: 10,
            streak_days: 2,
            total_practiced: 30,
            ..UserProgressSnapshot::default()
        };
        assert!(BadgeCriterion::Mastered(10).is_met(&profile));
        assert!(!BadgeCriterion::Streak(7).is_met(&profile));
        assert!(BadgeCriterion::Practiced(1).is_met(&profile));
    }

    #[test]
    fn criterion_parts_round_trip_through_storage_columns() {
        let c = BadgeCriterion::Streak(7);
        assert_eq!(BadgeCriterion::from_parts(c.kind(), c.threshold()), Some(c));
        assert_eq!(BadgeCriterion::from_parts("level", 2), None);
    }
}
