//! Drain scheduler: empties the intake buffer on a fixed interval and runs
//! one independent task per event.
//!
//! The loop never waits on a task. A slow backend only holds up its own
//! event; finished tasks are reaped on the next tick.

use std::sync::Arc;
use std::time::Duration;

use minecraft_bot::IntakeBuffer;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error};

use crate::processor::MessageProcessor;
use crate::provider::BackendTransport;

pub struct DrainScheduler<T: BackendTransport> {
    intake: IntakeBuffer,
    processor: Arc<MessageProcessor<T>>,
    interval: Duration,
    tasks: JoinSet<()>,
}

impl<T: BackendTransport> DrainScheduler<T> {
    pub fn new(
        intake: IntakeBuffer,
        processor: Arc<MessageProcessor<T>>,
        interval: Duration,
    ) -> Self {
        Self {
            intake,
            processor,
            interval,
            tasks: JoinSet::new(),
        }
    }

    /// Tasks spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Swap the buffer for an empty one and spawn a task per captured event.
    /// Returns how many were spawned.
    pub fn drain_once(&mut self) -> usize {
        self.reap();

        let events = self.intake.drain();
        if events.is_empty() {
            return 0;
        }
        debug!(count = events.len(), "Draining chat events");

        let count = events.len();
        for event in events {
            let processor = Arc::clone(&self.processor);
            self.tasks.spawn(async move { processor.process(event).await });
        }
        count
    }

    /// Tick forever. The first drain happens one interval after start.
    pub async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.drain_once();
        }
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result
                && e.is_panic()
            {
                error!(error = %e, "Processing task panicked");
            }
        }
    }
}
