// Per-batch retry state machine
//
//   Attempting(n) --accepted--------------------> Accepted
//   Attempting(n) --transient, n < max----------> RetryWait(n) --resume--> Attempting(n+1)
//   Attempting(n) --transient, n == max---------> Abandoned (budget exhausted)
//   Attempting(n) --fatal-----------------------> Abandoned
//
// Backoff before attempt n+1 is base_wait * n. No jitter; saturates instead of overflowing.

use std::num::NonZeroU32;
use std::time::Duration;

use crate::classify::Classification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    RetryWait { attempt: u32, wait: Duration },
    Accepted { attempts: u32 },
    Abandoned { attempts: u32 },
}

/// Terminal result of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Accepted { attempts: u32 },
    /// Rejected in a way retrying cannot fix
    Fatal { attempts: u32, reason: String },
    /// Every allowed attempt failed transiently
    BudgetExhausted { attempts: u32, last_reason: String },
}

impl BatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BatchOutcome::Accepted { .. })
    }

    /// Requests sent for this batch.
    pub fn attempts(&self) -> u32 {
        match self {
            BatchOutcome::Accepted { attempts }
            | BatchOutcome::Fatal { attempts, .. }
            | BatchOutcome::BudgetExhausted { attempts, .. } => *attempts,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            BatchOutcome::Accepted { .. } => None,
            BatchOutcome::Fatal { reason, .. } => Some(reason),
            BatchOutcome::BudgetExhausted { last_reason, .. } => Some(last_reason),
        }
    }
}

/// What the session should do after recording an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Sleep, call [`RetryController::resume`], send again.
    Retry(Duration),
    Done(BatchOutcome),
}

#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: NonZeroU32,
    base_wait: Duration,
    state: RetryState,
}

impl RetryController {
    pub fn new(max_attempts: NonZeroU32, base_wait: Duration) -> Self {
        Self {
            max_attempts,
            base_wait,
            state: RetryState::Attempting { attempt: 1 },
        }
    }

    pub fn state(&self) -> &RetryState {
        &self.state
    }

    /// Attempt number currently in flight (or last made, once terminal).
    pub fn attempt(&self) -> u32 {
        match self.state {
            RetryState::Attempting { attempt } | RetryState::RetryWait { attempt, .. } => attempt,
            RetryState::Accepted { attempts } | RetryState::Abandoned { attempts } => attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    /// Record the classification of the attempt in flight.
    pub fn record(&mut self, classification: Classification) -> Next {
        debug_assert!(
            matches!(self.state, RetryState::Attempting { .. }),
            "record() called outside of an attempt: {:?}",
            self.state
        );
        let attempt = self.attempt();

        match classification {
            Classification::Accepted => {
                self.state = RetryState::Accepted { attempts: attempt };
                Next::Done(BatchOutcome::Accepted { attempts: attempt })
            }
            Classification::Fatal(reason) => {
                self.state = RetryState::Abandoned { attempts: attempt };
                Next::Done(BatchOutcome::Fatal {
                    attempts: attempt,
                    reason,
                })
            }
            Classification::Transient(reason) => {
                if attempt >= self.max_attempts.get() {
                    self.state = RetryState::Abandoned { attempts: attempt };
                    Next::Done(BatchOutcome::BudgetExhausted {
                        attempts: attempt,
                        last_reason: reason,
                    })
                } else {
                    let wait = self.backoff(attempt);
                    self.state = RetryState::RetryWait { attempt, wait };
                    Next::Retry(wait)
                }
            }
        }
    }

    /// Wait after failed attempt `attempt`, saturating at `Duration::MAX`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_wait.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    /// Leave `RetryWait` once the backoff has elapsed.
    pub fn resume(&mut self) {
        if let RetryState::RetryWait { attempt, .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: attempt + 1,
            };
        }
    }
}
