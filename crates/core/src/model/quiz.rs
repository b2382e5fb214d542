use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::item::PracticeItem;

/// First-attempt verdict for one quiz item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub item: PracticeItem,
    pub user_answer: String,
    pub correct: bool,
}

/// Append-only log of quiz verdicts for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizLog {
    results: Vec<QuizResult>,
}

impl QuizLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: QuizResult) {
        self.results.push(result);
    }

    #[must_use]
    pub fn results(&self) -> &[QuizResult] {
        &self.results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn score(&self) -> Score {
        let correct = self.results.iter().filter(|r| r.correct).count();
        Score::new(correct, self.results.len())
    }
}

/// Correct answers out of total, as shown on the results view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

/// Coarse result tier used to pick the results headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    Perfect,
    Good,
    KeepStudying,
}

impl Score {
    #[must_use]
    pub fn new(correct: usize, total: usize) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }

    /// Percentage rounded half up; `0` for an empty quiz.
    #[must_use]
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        (self.correct * 200 + self.total) / (self.total * 2)
    }

    /// Results tier; an empty quiz earns nothing.
    #[must_use]
    pub fn band(&self) -> ScoreBand {
        if self.total == 0 {
            ScoreBand::KeepStudying
        } else if self.correct == self.total {
            ScoreBand::Perfect
        } else if self.correct * 10 >= self.total * 7 {
            ScoreBand::Good
        } else {
            ScoreBand::KeepStudying
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, {}%", self.correct, self.total, self.percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::ItemId;

    fn result(id: u128, correct: bool) -> QuizResult {
        QuizResult {
            item: PracticeItem::character(ItemId::from_u128(id), "字", "zì", "character"),
            user_answer: "zi".into(),
            correct,
        }
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let mut log = QuizLog::new();
        log.push(result(1, true));
        log.push(result(2, true));
        log.push(result(3, false));

        let score = log.score();
        assert_eq!(score.percent(), 67);
        assert_eq!(score.to_string(), "2/3, 67%");
        assert_eq!(score.band(), ScoreBand::KeepStudying);
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(Score::new(4, 4).band(), ScoreBand::Perfect);
        assert_eq!(Score::new(7, 10).band(), ScoreBand::Good);
        assert_eq!(Score::new(6, 10).band(), ScoreBand::KeepStudying);
    }

    #[test]
    fn empty_log_scores_zero() {
        let score = QuizLog::new().score();
        assert_eq!(score.percent(), 0);
        assert_eq!(score.total, 0);
        assert_eq!(score.band(), ScoreBand::KeepStudying);
    }

    #[test]
    fn half_rounds_up() {
        assert_eq!(Score::new(1, 8).percent(), 13);
    }
}
