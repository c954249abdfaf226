use std::time::Instant;

/// Single-shot deferred actions, polled by the event loop.
///
/// Nothing is ever cancelled. Two entries may target the same visual element;
/// they fire in deadline order, so the later one wins.
#[derive(Clone, Debug)]
pub struct Scheduler<A> {
    pending: Vec<(Instant, A)>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<A> Scheduler<A> {
    pub fn schedule(&mut self, at: Instant, action: A) {
        // stable insert keeps equal deadlines in scheduling order
        let idx = self.pending.partition_point(|(t, _)| *t <= at);
        self.pending.insert(idx, (at, action));
    }

    /// Remove and return every action due at `now`, earliest first.
    pub fn due(&mut self, now: Instant) -> Vec<A> {
        let split = self.pending.partition_point(|(t, _)| *t <= now);
        self.pending.drain(..split).map(|(_, a)| a).collect()
    }

    /// When the event loop next needs to wake up.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|(t, _)| *t)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
