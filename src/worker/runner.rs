//! Supervised poll loop around the [`Orchestrator`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::WorkerConfig;
use crate::queue::JobQueue;

use super::orchestrator::{JobOutcome, JobReport, Orchestrator};

/// What one poll of the queue did.
#[derive(Debug)]
pub enum Poll {
    /// The queue was empty.
    Idle,
    /// A message was processed to a terminal state and acked.
    Processed(JobReport),
    /// A message could not be parsed and was acked without processing.
    Discarded,
}

/// Counters for a worker run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub completed: u64,
    pub dropped: u64,
    pub failed: u64,
    pub discarded: u64,
    pub queue_errors: u64,
    pub panics: u64,
}

impl RunStats {
    fn record(&mut self, report: &JobReport) {
        match report.outcome {
            JobOutcome::Completed { .. } => self.completed += 1,
            JobOutcome::Dropped(_) => self.dropped += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn processed(&self) -> u64 {
        self.completed + self.dropped + self.failed
    }
}

/// Exponential backoff between consecutive queue errors.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: None,
        }
    }

    /// The next delay: `initial`, then doubling up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.initial,
            Some(d) => d.saturating_mul(2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

pub struct Worker {
    queue: Arc<dyn JobQueue>,
    orchestrator: Arc<Orchestrator>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(queue: Arc<dyn JobQueue>, orchestrator: Arc<Orchestrator>, config: WorkerConfig) -> Self {
        Self {
            queue,
            orchestrator,
            config,
        }
    }

    /// Claim one message, run it to completion, and ack it.
    ///
    /// Every terminal outcome is acked, including drops and failures; failed
    /// IDPs are already marked in the store. Malformed payloads are acked and
    /// discarded. A message claimed more than `max_attempts` times is failed
    /// without running the pipeline again.
    pub fn process_next(&self) -> Result<Poll> {
        let Some(delivery) = self.queue.try_pop()? else {
            return Ok(Poll::Idle);
        };

        let message = match delivery.parse() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    queue = %self.queue.name(),
                    receipt = delivery.receipt,
                    error = %e,
                    "discarding malformed queue message"
                );
                self.queue.ack(&delivery)?;
                return Ok(Poll::Discarded);
            }
        };

        let job_id = message
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

        let report = if delivery.attempts > self.config.max_attempts.max(1) {
            self.orchestrator.abandon(&job_id, &message.data, delivery.attempts - 1)
        } else {
            if delivery.attempts > 1 {
                tracing::info!(receipt = delivery.receipt, attempts = delivery.attempts, "redelivered message");
            }
            self.orchestrator.handle(&job_id, &message.data)
        };

        self.queue
            .ack(&delivery)
            .with_context(|| format!("failed to ack job {job_id}"))?;
        Ok(Poll::Processed(report))
    }

    /// Poll until `shutdown` resolves. Jobs are never interrupted mid-flight.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) -> RunStats {
        tokio::pin!(shutdown);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.backoff_initial_ms),
            Duration::from_millis(self.config.backoff_max_ms),
        );
        let mut stats = RunStats::default();

        tracing::info!(queue = %self.queue.name(), "worker listening");

        loop {
            let worker = Arc::clone(&self);
            let step = tokio::task::spawn_blocking(move || worker.process_next()).await;

            let pause = match step {
                Ok(Ok(Poll::Idle)) => {
                    backoff.reset();
                    poll_interval
                }
                Ok(Ok(Poll::Processed(report))) => {
                    backoff.reset();
                    stats.record(&report);
                    Duration::ZERO
                }
                Ok(Ok(Poll::Discarded)) => {
                    backoff.reset();
                    stats.discarded += 1;
                    Duration::ZERO
                }
                Ok(Err(e)) => {
                    stats.queue_errors += 1;
                    let delay = backoff.next_delay();
                    tracing::warn!(error = %format!("{e:#}"), retry_in_ms = delay.as_millis() as u64, "queue error");
                    delay
                }
                Err(e) => {
                    // The claim stays un-acked and is redelivered after the visibility timeout
                    stats.panics += 1;
                    tracing::error!(error = %e, "job task panicked");
                    Duration::ZERO
                }
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!(
            completed = stats.completed,
            dropped = stats.dropped,
            failed = stats.failed,
            "worker stopped"
        );
        stats
    }

    /// Process messages until the queue is empty, then return.
    pub async fn drain(self: Arc<Self>) -> Result<RunStats> {
        let mut stats = RunStats::default();
        loop {
            let worker = Arc::clone(&self);
            let poll = tokio::task::spawn_blocking(move || worker.process_next())
                .await
                .context("job task panicked")??;
            match poll {
                Poll::Idle => return Ok(stats),
                Poll::Processed(report) => stats.record(&report),
                Poll::Discarded => stats.discarded += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_max_and_resets() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(5));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_max_never_below_initial() {
        let mut backoff = Backoff::new(Duration::from_secs(3), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
    }
}
