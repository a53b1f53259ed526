//! Buffered intake of chat events between drain ticks.

use std::sync::{Arc, Mutex, PoisonError};

use minecraft_types::ChatEvent;

/// Append-only between drains; [`IntakeBuffer::drain`] takes everything at once.
/// Cheap to clone; clones share the same buffer.
#[derive(Clone, Default)]
pub struct IntakeBuffer {
    events: Arc<Mutex<Vec<ChatEvent>>>,
}

impl IntakeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ChatEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Swap the contents for an empty buffer and return them in arrival order.
    pub fn drain(&self) -> Vec<ChatEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_everything_in_order_and_empties() {
        let buf = IntakeBuffer::new();
        buf.push(ChatEvent::public("a", "1"));
        buf.push(ChatEvent::private("b", "2"));
        buf.push(ChatEvent::public("c", "3"));

        let drained = buf.drain();
        let bodies: Vec<_> = drained.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, vec!["1", "2", "3"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_of_empty_buffer_is_empty() {
        let buf = IntakeBuffer::new();
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let buf = IntakeBuffer::new();
        let producer = buf.clone();
        producer.push(ChatEvent::public("a", "hi"));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.drain().len(), 1);
        assert!(producer.is_empty());
    }

    #[test]
    fn events_pushed_after_drain_land_in_next_drain() {
        let buf = IntakeBuffer::new();
        buf.push(ChatEvent::public("a", "first"));
        let first = buf.drain();
        buf.push(ChatEvent::public("a", "second"));
        let second = buf.drain();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "second");
    }
}
