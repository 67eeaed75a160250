//! Upload session controller.
//!
//! One session = one collection pushed to one endpoint. Batches go out strictly
//! one at a time in partition order; the first carries `reset=true`. A batch
//! that is abandoned ends the session, and nothing after it is sent.

use batchsync_core::{batch_count, normalize_records, partition, Batch, Record};
use tracing::{error, info, instrument, warn};

use crate::classify::classify;
use crate::error::Result;
use crate::pause::{Pause, TokioPause};
use crate::policy::UploadPolicy;
use crate::retry::{BatchOutcome, Next, RetryController};
use crate::transport::{BatchTransport, HttpTransport};

/// Final state of one batch within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub index: usize,
    pub records: usize,
    pub reset: bool,
    pub outcome: BatchOutcome,
}

/// Summary of a whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub endpoint: String,
    pub total_records: usize,
    pub total_batches: usize,
    /// Batches that reached a terminal state, in send order. Shorter than
    /// `total_batches` when the session was abandoned.
    pub batches: Vec<BatchReport>,
}

impl UploadReport {
    /// True iff every batch was accepted. Vacuously true for an empty collection.
    pub fn succeeded(&self) -> bool {
        self.batches.len() == self.total_batches
            && self.batches.iter().all(|b| b.outcome.is_accepted())
    }

    /// Total HTTP requests issued across all batches.
    pub fn requests_sent(&self) -> u32 {
        self.batches.iter().map(|b| b.outcome.attempts()).sum()
    }

    pub fn accepted_records(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.outcome.is_accepted())
            .map(|b| b.records)
            .sum()
    }

    /// The batch that ended the session, if any.
    pub fn failure(&self) -> Option<&BatchReport> {
        self.batches.iter().find(|b| !b.outcome.is_accepted())
    }
}

pub struct Uploader<T = HttpTransport, P = TokioPause> {
    policy: UploadPolicy,
    transport: T,
    pause: P,
}

impl Uploader {
    /// HTTP uploader sleeping on the tokio timer.
    pub fn new(policy: UploadPolicy) -> Result<Self> {
        let transport = HttpTransport::new(policy.connect_timeout, policy.response_timeout)?;
        Ok(Self::with_parts(policy, transport, TokioPause))
    }
}

impl<T: BatchTransport, P: Pause> Uploader<T, P> {
    pub fn with_parts(policy: UploadPolicy, transport: T, pause: P) -> Self {
        Self {
            policy,
            transport,
            pause,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Run one session. Never fails: problems are reported per batch.
    #[instrument(skip_all, fields(endpoint = %self.policy.endpoint, records = records.len()))]
    pub async fn upload(&self, records: Vec<Record>) -> UploadReport {
        let total_records = records.len();
        let total_batches = batch_count(total_records, self.policy.batch_size);
        let mut report = UploadReport {
            endpoint: self.policy.endpoint.to_string(),
            total_records,
            total_batches,
            batches: Vec::with_capacity(total_batches),
        };

        if total_records == 0 {
            info!("Nothing to upload");
            return report;
        }

        let records = normalize_records(records, &self.policy.field_defaults);
        let batches = partition(records, self.policy.batch_size);

        info!(
            batches = total_batches,
            batch_size = self.policy.batch_size.get(),
            "Starting upload session"
        );

        let mut batches = batches.into_iter().peekable();
        while let Some(batch) = batches.next() {
            let outcome = self.send_batch(&batch, total_batches).await;
            let accepted = outcome.is_accepted();

            report.batches.push(BatchReport {
                index: batch.index,
                records: batch.len(),
                reset: batch.reset,
                outcome,
            });

            if !accepted {
                error!(
                    batch = batch.number(),
                    of = total_batches,
                    skipped = total_batches - batch.number(),
                    "Abandoning upload session"
                );
                return report;
            }

            if batches.peek().is_some() {
                self.pause.pause(self.policy.pacing).await;
            }
        }

        info!(
            batches = total_batches,
            requests = report.requests_sent(),
            "Upload session complete"
        );
        report
    }

    async fn send_batch(&self, batch: &Batch, total_batches: usize) -> BatchOutcome {
        let url = self.policy.batch_url(batch.reset);
        let mut retry = RetryController::new(self.policy.max_attempts, self.policy.base_wait);

        info!(
            batch = batch.number(),
            of = total_batches,
            records = batch.len(),
            reset = batch.reset,
            "Sending batch"
        );

        loop {
            let result = self.transport.deliver(&url, batch).await;
            let classification = classify(&result, &self.policy);

            match retry.record(classification) {
                Next::Done(outcome) => {
                    match &outcome {
                        BatchOutcome::Accepted { attempts } => {
                            info!(batch = batch.number(), attempts, "Batch accepted");
                        }
                        BatchOutcome::Fatal { attempts, reason } => {
                            error!(batch = batch.number(), attempts, %reason, "Batch rejected");
                        }
                        BatchOutcome::BudgetExhausted {
                            attempts,
                            last_reason,
                        } => {
                            error!(
                                batch = batch.number(),
                                attempts,
                                reason = %last_reason,
                                "Giving up on batch after {} attempts",
                                attempts
                            );
                        }
                    }
                    return outcome;
                }
                Next::Retry(wait) => {
                    warn!(
                        batch = batch.number(),
                        attempt = retry.attempt(),
                        max_attempts = retry.max_attempts(),
                        wait_secs = wait.as_secs_f64(),
                        "Transient failure, retrying"
                    );
                    self.pause.pause(wait).await;
                    retry.resume();
                }
            }
        }
    }
}
