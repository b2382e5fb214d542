use hanzi_core::model::{ItemId, PracticeItem};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Per-item lifecycle inside one session. Never moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompletionState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moved to the next item.
    Next,
    /// The last item was passed; the queue is now terminal.
    Finished,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdvanceError {
    #[error("current item is not completed")]
    NotCompleted,
    #[error("session already finished")]
    Finished,
}

/// Ordered items plus a cursor. Once the cursor reaches `len` the queue is
/// finished and only a `reset` revives it.
#[derive(Debug, Clone, Default)]
pub struct SessionQueue {
    items: Vec<PracticeItem>,
    states: Vec<CompletionState>,
    cursor: usize,
}

impl SessionQueue {
    #[must_use]
    pub fn new<R: Rng + ?Sized>(items: Vec<PracticeItem>, shuffle: bool, rng: &mut R) -> Self {
        let mut queue = Self::default();
        queue.reset(items, shuffle, rng);
        queue
    }

    /// Replace the items and rewind. The shuffle happens here and nowhere else.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        mut items: Vec<PracticeItem>,
        shuffle: bool,
        rng: &mut R,
    ) {
        if shuffle {
            items.shuffle(rng);
        }
        self.states = vec![CompletionState::NotStarted; items.len()];
        self.items = items;
        self.cursor = 0;
    }

    #[must_use]
    pub fn current(&self) -> Option<&PracticeItem> {
        self.items.get(self.cursor)
    }

    #[must_use]
    pub fn current_state(&self) -> Option<CompletionState> {
        self.states.get(self.cursor).copied()
    }

    #[must_use]
    pub fn state_at(&self, index: usize) -> Option<CompletionState> {
        self.states.get(index).copied()
    }

    #[must_use]
    pub fn position_of(&self, item: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id() == item)
    }

    #[must_use]
    pub fn items(&self) -> &[PracticeItem] {
        &self.items
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.items.len()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        !self.items.is_empty() && self.cursor + 1 == self.items.len()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == CompletionState::Completed)
            .count()
    }

    /// Move past the current item, which must be completed.
    ///
    /// # Errors
    ///
    /// Returns `AdvanceError::NotCompleted` (and leaves the cursor alone) when
    /// the current item is not completed, and `AdvanceError::Finished` once the
    /// queue is terminal.
    pub fn advance(&mut self) -> Result<Advance, AdvanceError> {
        match self.current_state() {
            None => Err(AdvanceError::Finished),
            Some(CompletionState::Completed) => {
                self.cursor += 1;
                if self.is_finished() {
                    Ok(Advance::Finished)
                } else {
                    Ok(Advance::Next)
                }
            }
            Some(_) => Err(AdvanceError::NotCompleted),
        }
    }

    /// Step back one item, keeping every completion state.
    ///
    /// Returns `false` at the first item or once finished.
    pub fn retreat(&mut self) -> bool {
        if self.cursor == 0 || self.is_finished() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Mark the current item as started unless it already progressed further.
    pub fn mark_in_progress(&mut self) {
        if let Some(state) = self.states.get_mut(self.cursor) {
            if *state == CompletionState::NotStarted {
                *state = CompletionState::InProgress;
            }
        }
    }

    /// Mark the current item as completed.
    ///
    /// Returns `true` only on the first completion.
    pub fn mark_completed(&mut self) -> bool {
        match self.states.get_mut(self.cursor) {
            Some(state) if *state != CompletionState::Completed => {
                *state = CompletionState::Completed;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanzi_core::model::SourceKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn items(n: u128) -> Vec<PracticeItem> {
        (1..=n)
            .map(|i| {
                PracticeItem::new(
                    ItemId::from_u128(i),
                    format!("t{i}"),
                    format!("d{i}"),
                    SourceKind::Custom,
                )
            })
            .collect()
    }

    fn queue(n: u128) -> SessionQueue {
        SessionQueue::new(items(n), false, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn advance_requires_completion() {
        let mut q = queue(2);
        assert_eq!(q.advance(), Err(AdvanceError::NotCompleted));
        assert_eq!(q.cursor(), 0);

        q.mark_in_progress();
        assert_eq!(q.advance(), Err(AdvanceError::NotCompleted));

        assert!(q.mark_completed());
        assert_eq!(q.advance(), Ok(Advance::Next));
        assert_eq!(q.cursor(), 1);
        assert!(q.is_last());
    }

    #[test]
    fn passing_the_last_item_finishes() {
        let mut q = queue(1);
        q.mark_completed();
        assert_eq!(q.advance(), Ok(Advance::Finished));
        assert!(q.is_finished());
        assert!(q.current().is_none());
        assert_eq!(q.advance(), Err(AdvanceError::Finished));
        assert_eq!(q.cursor(), q.len());
    }

    #[test]
    fn cursor_never_exceeds_len() {
        let mut q = queue(3);
        for step in 0..20 {
            if step % 3 == 0 {
                q.mark_completed();
            }
            let _ = q.advance();
            assert!(q.cursor() <= q.len());
        }
    }

    #[test]
    fn completion_is_one_way() {
        let mut q = queue(1);
        assert!(q.mark_completed());
        assert!(!q.mark_completed());
        q.mark_in_progress();
        assert_eq!(q.current_state(), Some(CompletionState::Completed));
    }

    #[test]
    fn retreat_keeps_states() {
        let mut q = queue(2);
        q.mark_completed();
        q.advance().unwrap();
        assert!(q.retreat());
        assert_eq!(q.current_state(), Some(CompletionState::Completed));
        assert!(!q.retreat());
    }

    #[test]
    fn shuffle_happens_once_per_reset() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut q = SessionQueue::new(items(20), true, &mut rng);
        let order: Vec<ItemId> = q.items().iter().map(PracticeItem::id).collect();
        let original: Vec<ItemId> = items(20).iter().map(PracticeItem::id).collect();
        assert_ne!(order, original);

        q.mark_completed();
        q.advance().unwrap();
        let after: Vec<ItemId> = q.items().iter().map(PracticeItem::id).collect();
        assert_eq!(order, after);

        q.reset(items(3), false, &mut rng);
        assert_eq!(q.cursor(), 0);
        assert_eq!(q.completed_count(), 0);
    }
}
