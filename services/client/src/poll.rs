//! services/client/src/poll.rs
//!
//! Waits for a submission's evaluation to finish.
//!
//! The loop is independent of any view: it polls at a fixed interval, gives up
//! after a bounded number of attempts, and stops as soon as its
//! `CancellationToken` fires (e.g. when the view that started it is closed).

use std::sync::Arc;
use std::time::Duration;

use biro_core::{NamedReport, SubmissionId, SubmissionStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::BiroClient;
use crate::config::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS};
use crate::error::ClientResult;

#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Evaluation finished; reports are present when the status names an evaluation.
    Finished {
        status: Arc<SubmissionStatus>,
        reports: Option<Arc<Vec<NamedReport>>>,
    },
    /// Still pending after the last allowed attempt.
    TimedOut {
        last: Option<Arc<SubmissionStatus>>,
    },
    Cancelled,
}

pub struct SubmissionPoller<'a> {
    client: &'a BiroClient,
    interval: Duration,
    max_attempts: u32,
}

impl<'a> SubmissionPoller<'a> {
    pub fn new(client: &'a BiroClient) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub async fn poll(
        &self,
        submission_id: SubmissionId,
        cancel: &CancellationToken,
    ) -> ClientResult<PollOutcome> {
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled);
            }

            let status = self.client.fetch_submission_status(submission_id).await?;
            if status.finished {
                info!(
                    "Submission {} finished after {} poll(s)",
                    submission_id, attempt
                );
                let reports = match status.evaluation_id {
                    Some(evaluation_id) => Some(self.client.fetch_reports(evaluation_id).await?),
                    None => None,
                };
                return Ok(PollOutcome::Finished { status, reports });
            }

            debug!(
                "Submission {} still pending (attempt {}/{})",
                submission_id, attempt, self.max_attempts
            );
            // Pending snapshots must not be served from cache.
            self.client.invalidate_submission_status(submission_id);
            if let Some(evaluation_id) = status.evaluation_id {
                self.client.invalidate_reports(evaluation_id);
            }
            last = Some(status);

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        Ok(PollOutcome::TimedOut { last })
    }
}
