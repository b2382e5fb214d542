use hanzi_core::matching::matches;
use hanzi_core::model::{ItemId, PracticeItem, QuizLog, QuizResult, Score};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::sequencer::{Advance, AdvanceError, CompletionState, SessionQueue};
use crate::sampler::{DEFAULT_DISTRACTORS, sample};

//
// ─── MODES & INPUTS ────────────────────────────────────────────────────────────
//

/// How items are practiced in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
    /// Flip cards, no verdict.
    Flashcards,
    /// Type the answer; a wrong answer must be retyped.
    Written,
    /// Pick one of several options.
    MultipleChoice,
    /// Draw the glyph on the stroke-order canvas.
    Writing,
}

impl PracticeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PracticeMode::Flashcards => "flashcards",
            PracticeMode::Written => "written",
            PracticeMode::MultipleChoice => "multiple_choice",
            PracticeMode::Writing => "writing",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flashcards" | "cards" => Some(PracticeMode::Flashcards),
            "written" | "write-in" => Some(PracticeMode::Written),
            "multiple_choice" | "multiple-choice" | "mc" => Some(PracticeMode::MultipleChoice),
            "writing" | "canvas" => Some(PracticeMode::Writing),
            _ => None,
        }
    }

    /// Modes that record a first-attempt verdict per item.
    #[must_use]
    pub fn is_quiz(self) -> bool {
        !matches!(self, PracticeMode::Flashcards)
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the front end or the drawing surface can feed into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeInput {
    /// Flip the current flashcard.
    Reveal,
    Next,
    /// Back to the previous flashcard.
    Previous,
    SubmitAnswer(String),
    SubmitRetype(String),
    SelectOption(usize),
    /// Drawing surface: a stroke matched.
    CorrectStroke,
    /// Drawing surface: a stroke missed.
    Mistake,
    /// Drawing surface: the glyph is finished.
    Complete { item_id: ItemId },
    /// Clear the canvas and its counters for the current glyph.
    Restart,
}

/// Side effects requested by a transition, executed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist a catalog character completion and refresh the profile.
    RecordCompletion { item_id: ItemId },
    /// Bump a study-set card's answer counters.
    RecordAnswer { item_id: ItemId, correct: bool },
    /// Tell the drawing surface to clear its strokes.
    ResetCanvas,
    /// The queue is exhausted; `score` covers the whole session.
    Finished { score: Score },
}

/// Why an input was refused. The session is untouched when this is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejected {
    #[error("{input} is not available in {mode} mode")]
    WrongMode {
        input: &'static str,
        mode: PracticeMode,
    },
    #[error("session is finished")]
    Finished,
    #[error("finish the current item first")]
    NotCompleted,
    #[error("reveal the card before moving on")]
    NotRevealed,
    #[error("this item was already answered")]
    AlreadyAnswered,
    #[error("no answer is waiting to be retyped")]
    NotAwaitingRetype,
    #[error("retype the correct answer exactly")]
    RetypeMismatch,
    #[error("option {0} does not exist")]
    OptionOutOfRange(usize),
    #[error("already at the first card")]
    AtStart,
    #[error("completion reported for an item that is not current")]
    StaleItem,
}

//
// ─── PHASES & SNAPSHOT ─────────────────────────────────────────────────────────
//

/// Where the current item stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Question shown (front face, empty answer box, blank canvas).
    Presenting,
    /// Flashcard back face shown.
    Revealed,
    /// Verdict given and final for this item.
    Answered { correct: bool },
    /// Wrong written answer; the canonical answer must be retyped.
    MustRetype,
    /// Item completed without a pending verdict (retype done, glyph drawn).
    Completed,
    /// Queue exhausted; results view.
    Finished,
}

/// Read-only projection of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeSnapshot {
    pub mode: PracticeMode,
    pub phase: Phase,
    pub item: Option<PracticeItem>,
    /// 0-based cursor; equals `total` once finished.
    pub position: usize,
    pub total: usize,
    pub is_last: bool,
    pub can_advance: bool,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub submitted: Option<String>,
    pub strokes: u32,
    pub mistakes: u32,
    pub completed: usize,
    pub score: Score,
}

#[derive(Debug, Clone, Default)]
struct ItemProgress {
    revealed_once: bool,
    submitted: Option<String>,
    options: Vec<String>,
    selected: Option<usize>,
    strokes: u32,
    mistakes: u32,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Knobs fixed when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub shuffle: bool,
    pub distractors: usize,
    /// Fixed RNG seed for reproducible shuffles and options.
    pub seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            shuffle: false,
            distractors: DEFAULT_DISTRACTORS,
            seed: None,
        }
    }
}

/// One practice session: the queue, the per-item state and the quiz log.
///
/// Every input goes through `handle`, which either applies a transition and
/// returns the effects to run, or returns `Rejected` without changing anything.
pub struct PracticeSession {
    mode: PracticeMode,
    queue: SessionQueue,
    log: QuizLog,
    phase: Phase,
    progress: ItemProgress,
    distractors: usize,
    rng: StdRng,
}

impl PracticeSession {
    /// Start a session over `items`. An empty list yields a finished session.
    #[must_use]
    pub fn new(mode: PracticeMode, items: Vec<PracticeItem>, options: SessionOptions) -> Self {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let queue = SessionQueue::new(items, options.shuffle, &mut rng);
        let mut session = Self {
            mode,
            queue,
            log: QuizLog::new(),
            phase: Phase::Presenting,
            progress: ItemProgress::default(),
            distractors: options.distractors,
            rng,
        };
        session.present();
        session
    }

    #[must_use]
    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn log(&self) -> &QuizLog {
        &self.log
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.log.score()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&PracticeItem> {
        self.queue.current()
    }

    /// Glyph the drawing surface should trace, in writing mode.
    #[must_use]
    pub fn target_glyph(&self) -> Option<&str> {
        match self.mode {
            PracticeMode::Writing => self.queue.current().map(PracticeItem::primary),
            _ => None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PracticeSnapshot {
        PracticeSnapshot {
            mode: self.mode,
            phase: self.phase,
            item: self.queue.current().cloned(),
            position: self.queue.cursor(),
            total: self.queue.len(),
            is_last: self.queue.is_last(),
            can_advance: self.can_advance(),
            options: self.progress.options.clone(),
            selected: self.progress.selected,
            submitted: self.progress.submitted.clone(),
            strokes: self.progress.strokes,
            mistakes: self.progress.mistakes,
            completed: self.queue.completed_count(),
            score: self.log.score(),
        }
    }

    /// Apply one input.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the input is not valid in the current mode or
    /// phase; nothing is mutated in that case.
    pub fn handle(&mut self, input: PracticeInput) -> Result<Vec<Effect>, Rejected> {
        if self.is_finished() {
            return Err(Rejected::Finished);
        }
        match input {
            PracticeInput::Reveal => self.reveal(),
            PracticeInput::Next => self.next(),
            PracticeInput::Previous => self.previous(),
            PracticeInput::SubmitAnswer(answer) => self.submit_answer(answer),
            PracticeInput::SubmitRetype(answer) => self.submit_retype(&answer),
            PracticeInput::SelectOption(index) => self.select_option(index),
            PracticeInput::CorrectStroke => self.stroke(true),
            PracticeInput::Mistake => self.stroke(false),
            PracticeInput::Complete { item_id } => self.complete_glyph(item_id),
            PracticeInput::Restart => self.restart(),
        }
    }

    fn require_mode(&self, input: &'static str, mode: PracticeMode) -> Result<(), Rejected> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(Rejected::WrongMode {
                input,
                mode: self.mode,
            })
        }
    }

    fn can_advance(&self) -> bool {
        match self.queue.current_state() {
            Some(CompletionState::Completed) => true,
            Some(_) => self.mode == PracticeMode::Flashcards && self.progress.revealed_once,
            None => false,
        }
    }

    /// Reset per-item state for whatever is now under the cursor.
    fn present(&mut self) {
        self.progress = ItemProgress::default();
        if self.queue.is_finished() {
            self.phase = Phase::Finished;
            return;
        }
        self.queue.mark_in_progress();
        let completed = self.queue.current_state() == Some(CompletionState::Completed);
        self.progress.revealed_once = completed;
        self.phase = if completed && self.mode != PracticeMode::Flashcards {
            Phase::Completed
        } else {
            Phase::Presenting
        };
        if self.mode == PracticeMode::MultipleChoice && !completed {
            let cursor = self.queue.cursor();
            let answer = self
                .queue
                .current()
                .map(|item| item.answer().to_owned())
                .unwrap_or_default();
            self.progress.options = sample(
                self.queue.items(),
                cursor,
                &answer,
                self.distractors,
                &mut self.rng,
            );
        }
    }

    fn current(&self) -> Result<&PracticeItem, Rejected> {
        self.queue.current().ok_or(Rejected::Finished)
    }

    fn reveal(&mut self) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("reveal", PracticeMode::Flashcards)?;
        self.phase = match self.phase {
            Phase::Revealed => Phase::Presenting,
            _ => Phase::Revealed,
        };
        self.progress.revealed_once = true;
        Ok(Vec::new())
    }

    fn next(&mut self) -> Result<Vec<Effect>, Rejected> {
        if !self.can_advance() {
            return Err(match self.mode {
                PracticeMode::Flashcards => Rejected::NotRevealed,
                _ => Rejected::NotCompleted,
            });
        }
        if self.mode == PracticeMode::Flashcards {
            self.queue.mark_completed();
        }
        match self.queue.advance() {
            Ok(Advance::Next) => {
                self.present();
                Ok(Vec::new())
            }
            Ok(Advance::Finished) => {
                self.present();
                let score = self.log.score();
                debug!(mode = %self.mode, %score, "practice session finished");
                Ok(vec![Effect::Finished { score }])
            }
            Err(AdvanceError::NotCompleted) => Err(Rejected::NotCompleted),
            Err(AdvanceError::Finished) => Err(Rejected::Finished),
        }
    }

    fn previous(&mut self) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("previous", PracticeMode::Flashcards)?;
        if !self.queue.retreat() {
            return Err(Rejected::AtStart);
        }
        self.present();
        Ok(Vec::new())
    }

    fn record(&mut self, user_answer: String, correct: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(item) = self.queue.current().cloned() else {
            return effects;
        };
        if item.source().records_answers() {
            effects.push(Effect::RecordAnswer {
                item_id: item.id(),
                correct,
            });
        }
        self.log.push(QuizResult {
            item,
            user_answer,
            correct,
        });
        effects
    }

    fn submit_answer(&mut self, answer: String) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("submit answer", PracticeMode::Written)?;
        if self.phase != Phase::Presenting {
            return Err(Rejected::AlreadyAnswered);
        }
        let correct = matches(&answer, self.current()?.answer());
        self.progress.submitted = Some(answer.clone());
        let effects = self.record(answer, correct);
        if correct {
            self.queue.mark_completed();
            self.phase = Phase::Answered { correct: true };
        } else {
            self.phase = Phase::MustRetype;
        }
        Ok(effects)
    }

    fn submit_retype(&mut self, answer: &str) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("retype", PracticeMode::Written)?;
        if self.phase != Phase::MustRetype {
            return Err(Rejected::NotAwaitingRetype);
        }
        if !matches(answer, self.current()?.answer()) {
            return Err(Rejected::RetypeMismatch);
        }
        self.queue.mark_completed();
        self.phase = Phase::Completed;
        Ok(Vec::new())
    }

    fn select_option(&mut self, index: usize) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("select option", PracticeMode::MultipleChoice)?;
        if self.phase != Phase::Presenting {
            return Err(Rejected::AlreadyAnswered);
        }
        let choice = self
            .progress
            .options
            .get(index)
            .cloned()
            .ok_or(Rejected::OptionOutOfRange(index))?;
        let correct = matches(&choice, self.current()?.answer());
        self.progress.selected = Some(index);
        let effects = self.record(choice, correct);
        self.queue.mark_completed();
        self.phase = Phase::Answered { correct };
        Ok(effects)
    }

    fn stroke(&mut self, correct: bool) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("stroke", PracticeMode::Writing)?;
        // Late strokes after completion are ignored.
        if self.phase == Phase::Presenting {
            if correct {
                self.progress.strokes = self.progress.strokes.saturating_add(1);
            } else {
                self.progress.mistakes = self.progress.mistakes.saturating_add(1);
            }
        }
        Ok(Vec::new())
    }

    fn complete_glyph(&mut self, item_id: ItemId) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("complete", PracticeMode::Writing)?;
        let Some(position) = self.queue.position_of(item_id) else {
            return Err(Rejected::StaleItem);
        };
        if self.queue.state_at(position) == Some(CompletionState::Completed) {
            debug!(%item_id, "duplicate completion ignored");
            return Ok(Vec::new());
        }
        if position != self.queue.cursor() {
            return Err(Rejected::StaleItem);
        }

        let item = self.current()?.clone();
        let mistakes = self.progress.mistakes;
        let mut effects = self.record(item.primary().to_owned(), mistakes == 0);
        if item.source().tracks_mastery() {
            effects.push(Effect::RecordCompletion { item_id: item.id() });
        }
        self.queue.mark_completed();
        self.phase = Phase::Completed;
        Ok(effects)
    }

    fn restart(&mut self) -> Result<Vec<Effect>, Rejected> {
        self.require_mode("restart", PracticeMode::Writing)?;
        self.progress.strokes = 0;
        self.progress.mistakes = 0;
        Ok(vec![Effect::ResetCanvas])
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("cursor", &self.queue.cursor())
            .field("items_len", &self.queue.len())
            .field("results_len", &self.log.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use hanzi_core::model::{ScoreBand, SourceKind};

    fn card(n: u128, term: &str, definition: &str) -> PracticeItem {
        PracticeItem::new(ItemId::from_u128(n), term, definition, SourceKind::StudySet)
    }

    fn glyph(n: u128, hanzi: &str) -> PracticeItem {
        PracticeItem::character(ItemId::from_u128(n), hanzi, "pin", "meaning")
    }

    fn seeded(mode: PracticeMode, items: Vec<PracticeItem>) -> PracticeSession {
        PracticeSession::new(
            mode,
            items,
            SessionOptions {
                seed: Some(11),
                ..SessionOptions::default()
            },
        )
    }

    fn three_cards() -> Vec<PracticeItem> {
        vec![
            card(1, "你好", "hello"),
            card(2, "再见", "goodbye"),
            card(3, "谢谢", "thank you"),
        ]
    }

    #[test]
    fn written_quiz_retype_flow_scores_first_attempts() {
        let mut s = seeded(PracticeMode::Written, three_cards());

        s.handle(PracticeInput::SubmitAnswer(" Hello ".into())).unwrap();
        s.handle(PracticeInput::Next).unwrap();
        s.handle(PracticeInput::SubmitAnswer("GOODBYE".into())).unwrap();
        s.handle(PracticeInput::Next).unwrap();

        let effects = s.handle(PracticeInput::SubmitAnswer("thanks".into())).unwrap();
        assert_eq!(
            effects,
            vec![Effect::RecordAnswer {
                item_id: ItemId::from_u128(3),
                correct: false
            }]
        );
        assert_eq!(s.phase(), Phase::MustRetype);
        assert_eq!(s.handle(PracticeInput::Next), Err(Rejected::NotCompleted));
        assert_eq!(
            s.handle(PracticeInput::SubmitRetype("thanks".into())),
            Err(Rejected::RetypeMismatch)
        );
        s.handle(PracticeInput::SubmitRetype("thank you".into())).unwrap();

        let effects = s.handle(PracticeInput::Next).unwrap();
        let verdicts: Vec<bool> = s.log().results().iter().map(|r| r.correct).collect();
        assert_eq!(verdicts, vec![true, true, false]);
        assert_eq!(s.score().to_string(), "2/3, 67%");
        assert_eq!(
            effects,
            vec![Effect::Finished {
                score: Score::new(2, 3)
            }]
        );
        assert_eq!(s.snapshot().phase, Phase::Finished);
    }

    #[test]
    fn written_answer_is_judged_once() {
        let mut s = seeded(PracticeMode::Written, three_cards());
        s.handle(PracticeInput::SubmitAnswer("hello".into())).unwrap();
        assert_eq!(
            s.handle(PracticeInput::SubmitAnswer("hello".into())),
            Err(Rejected::AlreadyAnswered)
        );
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn blank_written_answer_is_wrong() {
        let mut s = seeded(PracticeMode::Written, three_cards());
        s.handle(PracticeInput::SubmitAnswer("   ".into())).unwrap();
        assert_eq!(s.phase(), Phase::MustRetype);
        assert!(!s.log().results()[0].correct);
    }

    #[test]
    fn flashcard_reveal_is_reentrant() {
        let mut s = seeded(PracticeMode::Flashcards, three_cards());
        assert_eq!(s.handle(PracticeInput::Next), Err(Rejected::NotRevealed));

        s.handle(PracticeInput::Reveal).unwrap();
        assert_eq!(s.phase(), Phase::Revealed);
        let effects = s.handle(PracticeInput::Reveal).unwrap();
        assert!(effects.is_empty());
        assert_eq!(s.phase(), Phase::Presenting);
        assert!(s.log().is_empty());

        s.handle(PracticeInput::Next).unwrap();
        assert_eq!(s.snapshot().position, 1);
    }

    #[test]
    fn flashcard_previous_keeps_completion() {
        let mut s = seeded(PracticeMode::Flashcards, three_cards());
        assert_eq!(s.handle(PracticeInput::Previous), Err(Rejected::AtStart));
        s.handle(PracticeInput::Reveal).unwrap();
        s.handle(PracticeInput::Next).unwrap();

        s.handle(PracticeInput::Previous).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.position, 0);
        assert_eq!(snap.phase, Phase::Presenting);
        assert!(snap.can_advance);
        assert_eq!(snap.completed, 1);
    }

    #[test]
    fn multiple_choice_is_single_shot() {
        let mut s = seeded(PracticeMode::MultipleChoice, three_cards());
        let snap = s.snapshot();
        assert_eq!(snap.options.len(), 3);
        let right = snap.options.iter().position(|o| o == "hello").unwrap();
        let wrong = (right + 1) % snap.options.len();

        let effects = s.handle(PracticeInput::SelectOption(wrong)).unwrap();
        assert_eq!(
            effects,
            vec![Effect::RecordAnswer {
                item_id: ItemId::from_u128(1),
                correct: false
            }]
        );
        assert_eq!(
            s.handle(PracticeInput::SelectOption(right)),
            Err(Rejected::AlreadyAnswered)
        );
        assert_eq!(s.phase(), Phase::Answered { correct: false });
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn multiple_choice_rejects_out_of_range_without_mutation() {
        let mut s = seeded(PracticeMode::MultipleChoice, three_cards());
        let before = s.snapshot();
        assert_eq!(
            s.handle(PracticeInput::SelectOption(9)),
            Err(Rejected::OptionOutOfRange(9))
        );
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn options_are_regenerated_per_item() {
        let mut s = seeded(PracticeMode::MultipleChoice, three_cards());
        s.handle(PracticeInput::SelectOption(0)).unwrap();
        s.handle(PracticeInput::Next).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.selected, None);
        assert!(snap.options.contains(&"goodbye".to_owned()));
    }

    #[test]
    fn duplicate_completion_is_idempotent() {
        let mut s = seeded(PracticeMode::Writing, vec![glyph(1, "的"), glyph(2, "一")]);
        let id = ItemId::from_u128(1);

        s.handle(PracticeInput::CorrectStroke).unwrap();
        let first = s.handle(PracticeInput::Complete { item_id: id }).unwrap();
        assert_eq!(first.iter().filter(|e| matches!(e, Effect::RecordCompletion { .. })).count(), 1);

        let second = s.handle(PracticeInput::Complete { item_id: id }).unwrap();
        assert!(second.is_empty());
        assert_eq!(s.log().len(), 1);

        s.handle(PracticeInput::Next).unwrap();
        let late = s.handle(PracticeInput::Complete { item_id: id }).unwrap();
        assert!(late.is_empty());
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn writing_verdict_is_mistake_free_drawing() {
        let mut s = seeded(PracticeMode::Writing, vec![glyph(1, "的"), glyph(2, "一")]);
        assert_eq!(s.target_glyph(), Some("的"));
        s.handle(PracticeInput::Mistake).unwrap();
        s.handle(PracticeInput::Complete { item_id: ItemId::from_u128(1) }).unwrap();
        s.handle(PracticeInput::Next).unwrap();
        s.handle(PracticeInput::Complete { item_id: ItemId::from_u128(2) }).unwrap();
        s.handle(PracticeInput::Next).unwrap();

        let verdicts: Vec<bool> = s.log().results().iter().map(|r| r.correct).collect();
        assert_eq!(verdicts, vec![false, true]);
        assert_eq!(s.score().band(), ScoreBand::KeepStudying);
    }

    #[test]
    fn completion_for_a_future_item_is_stale() {
        let mut s = seeded(PracticeMode::Writing, vec![glyph(1, "的"), glyph(2, "一")]);
        assert_eq!(
            s.handle(PracticeInput::Complete { item_id: ItemId::from_u128(2) }),
            Err(Rejected::StaleItem)
        );
        assert_eq!(
            s.handle(PracticeInput::Complete { item_id: ItemId::from_u128(9) }),
            Err(Rejected::StaleItem)
        );
    }

    #[test]
    fn restart_clears_counters_but_not_completion() {
        let mut s = seeded(PracticeMode::Writing, vec![glyph(1, "的")]);
        s.handle(PracticeInput::Mistake).unwrap();
        s.handle(PracticeInput::CorrectStroke).unwrap();
        assert_eq!(s.handle(PracticeInput::Restart).unwrap(), vec![Effect::ResetCanvas]);
        assert_eq!((s.snapshot().strokes, s.snapshot().mistakes), (0, 0));

        s.handle(PracticeInput::Complete { item_id: ItemId::from_u128(1) }).unwrap();
        s.handle(PracticeInput::Restart).unwrap();
        assert_eq!(s.phase(), Phase::Completed);
        assert!(s.snapshot().can_advance);
    }

    #[test]
    fn custom_items_emit_no_remote_effects() {
        let item = PracticeItem::new(ItemId::from_u128(5), "水", "shuǐ", SourceKind::Custom);
        let mut s = seeded(PracticeMode::Writing, vec![item]);
        let effects = s.handle(PracticeInput::Complete { item_id: ItemId::from_u128(5) }).unwrap();
        assert!(effects.is_empty());
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn wrong_mode_inputs_are_rejected() {
        let mut s = seeded(PracticeMode::Flashcards, three_cards());
        assert!(matches!(
            s.handle(PracticeInput::SubmitAnswer("x".into())),
            Err(Rejected::WrongMode { .. })
        ));
        assert!(matches!(
            s.handle(PracticeInput::Mistake),
            Err(Rejected::WrongMode { .. })
        ));
    }

    #[test]
    fn finished_session_rejects_everything() {
        let mut s = seeded(PracticeMode::Flashcards, vec![card(1, "a", "b")]);
        s.handle(PracticeInput::Reveal).unwrap();
        s.handle(PracticeInput::Next).unwrap();
        assert!(s.is_finished());
        assert_eq!(s.handle(PracticeInput::Next), Err(Rejected::Finished));
        assert_eq!(s.handle(PracticeInput::Reveal), Err(Rejected::Finished));
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!(PracticeMode::parse("mc"), Some(PracticeMode::MultipleChoice));
        assert_eq!(PracticeMode::parse(" Written "), Some(PracticeMode::Written));
        assert_eq!(PracticeMode::parse("quiz"), None);
    }
}
