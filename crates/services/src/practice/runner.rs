use std::sync::Arc;

use hanzi_core::model::UserId;
use storage::repository::StudySetRepository;
use tracing::{info, warn};

use super::machine::{Effect, PracticeInput, PracticeSession, PracticeSnapshot, Rejected};
use crate::reconciler::{CompletionReconciler, ReconcileOutcome};

/// Result of feeding one input through the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerStep {
    /// Effects the session emitted, including ones the runner handled.
    pub effects: Vec<Effect>,
    /// One outcome per `RecordCompletion` effect.
    pub reconciled: Vec<ReconcileOutcome>,
    /// Answer-recording failures, as user-facing messages.
    pub warnings: Vec<String>,
}

impl RunnerStep {
    /// Whether the front end should clear its drawing surface.
    #[must_use]
    pub fn reset_canvas(&self) -> bool {
        self.effects.contains(&Effect::ResetCanvas)
    }
}

fn is_remote(effect: &Effect) -> bool {
    matches!(
        effect,
        Effect::RecordCompletion { .. } | Effect::RecordAnswer { .. }
    )
}

/// Drives a `PracticeSession` and executes its remote effects.
///
/// `apply` is synchronous: it moves the session and queues backend calls, so a
/// front end can render the new snapshot straight away and `flush` afterwards.
/// `dispatch` does both for callers that are happy to wait.
pub struct PracticeRunner {
    session: PracticeSession,
    user: Option<UserId>,
    reconciler: CompletionReconciler,
    answers: Arc<dyn StudySetRepository>,
    pending: Vec<Effect>,
}

impl PracticeRunner {
    #[must_use]
    pub fn new(
        session: PracticeSession,
        user: Option<UserId>,
        reconciler: CompletionReconciler,
        answers: Arc<dyn StudySetRepository>,
    ) -> Self {
        Self {
            session,
            user,
            reconciler,
            answers,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &PracticeSession {
        &self.session
    }

    #[must_use]
    pub fn snapshot(&self) -> PracticeSnapshot {
        self.session.snapshot()
    }

    /// Backend calls queued by `apply` and not yet flushed.
    #[must_use]
    pub fn pending(&self) -> &[Effect] {
        &self.pending
    }

    /// Apply `input` locally and queue its backend calls for `flush`.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the session refuses the input; nothing is queued.
    pub fn apply(&mut self, input: PracticeInput) -> Result<Vec<Effect>, Rejected> {
        let effects = self.session.handle(input)?;
        for effect in &effects {
            if let Effect::Finished { score } = effect {
                info!(mode = %self.session.mode(), %score, "practice session complete");
            }
        }
        self.pending.extend(effects.iter().filter(|e| is_remote(e)).cloned());
        Ok(effects)
    }

    /// Run every queued backend call, oldest first.
    ///
    /// Failures never touch the session; they come back as outcomes and warnings.
    pub async fn flush(&mut self) -> RunnerStep {
        let mut step = RunnerStep::default();
        for effect in std::mem::take(&mut self.pending) {
            match effect {
                Effect::RecordCompletion { item_id } => match self.user {
                    Some(user) => {
                        let outcome = self.reconciler.on_item_completed(user, item_id).await;
                        step.reconciled.push(outcome);
                    }
                    None => warn!(item_id = %item_id, "completion not synced: signed out"),
                },
                Effect::RecordAnswer { item_id, correct } => {
                    if let Err(err) = self.answers.record_answer(item_id, correct).await {
                        warn!(item_id = %item_id, error = %err, "failed to record answer");
                        step.warnings.push(format!("answer not saved: {err}"));
                    }
                }
                Effect::ResetCanvas | Effect::Finished { .. } => {}
            }
            step.effects.push(effect);
        }
        step
    }

    /// Apply `input` and wait for whatever it asks of the backend.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the session refuses the input; no remote call
    /// is made in that case.
    pub async fn dispatch(&mut self, input: PracticeInput) -> Result<RunnerStep, Rejected> {
        let effects = self.apply(input)?;
        let mut step = self.flush().await;
        step.effects = effects;
        Ok(step)
    }
}
