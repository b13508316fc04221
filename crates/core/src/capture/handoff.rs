use crate::emotion::EmotionLabel;
use std::sync::{Arc, Mutex, MutexGuard};

/// Single-slot handoff of a captured emotion to the next turn.
///
/// `offer` replaces whatever is pending; `take` empties the slot, so each
/// offered label is consumed by at most one turn. Clones share the slot.
#[derive(Clone, Debug, Default)]
pub struct EmotionHandoff {
    slot: Arc<Mutex<Option<EmotionLabel>>>,
}

impl EmotionHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<EmotionLabel>> {
        match self.slot.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("emotion handoff lock was poisoned; recovering and continuing");
                poisoned.into_inner()
            }
        }
    }

    /// Returns the label it displaced, if any.
    pub fn offer(&self, emotion: EmotionLabel) -> Option<EmotionLabel> {
        self.lock().replace(emotion)
    }

    pub fn take(&self) -> Option<EmotionLabel> {
        self.lock().take()
    }

    pub fn peek(&self) -> Option<EmotionLabel> {
        *self.lock()
    }

    pub fn clear(&self) {
        self.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_exactly_once() {
        let handoff = EmotionHandoff::new();
        assert_eq!(handoff.offer(EmotionLabel::Sad), None);
        assert_eq!(handoff.take(), Some(EmotionLabel::Sad));
        assert_eq!(handoff.take(), None);
    }

    #[test]
    fn newer_offer_replaces_pending_one() {
        let handoff = EmotionHandoff::new();
        handoff.offer(EmotionLabel::Sad);
        assert_eq!(handoff.offer(EmotionLabel::Happy), Some(EmotionLabel::Sad));
        assert_eq!(handoff.peek(), Some(EmotionLabel::Happy));
    }

    #[test]
    fn clones_share_the_slot() {
        let a = EmotionHandoff::new();
        let b = a.clone();
        a.offer(EmotionLabel::Angry);
        assert_eq!(b.take(), Some(EmotionLabel::Angry));
        assert_eq!(a.peek(), None);
    }

    #[test]
    fn clear_discards_pending_label() {
        let handoff = EmotionHandoff::new();
        handoff.offer(EmotionLabel::Love);
        handoff.clear();
        assert_eq!(handoff.take(), None);
    }
}
