//! Bounded-retry execution of a single transformer call.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use cvtailor_shared::{SourceProfile, TailorError, TargetSpec};

use crate::transformer::Transformer;

/// Pipeline stages, in the order a run enters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parse,
    Analyze,
    Generate,
    Review,
    Audit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Analyze => "analyze",
            Self::Generate => "generate",
            Self::Review => "review",
            Self::Audit => "audit",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that used up its attempt budget.
///
/// Whether this ends the run is the caller's decision: parse and analyze
/// convert it into [`TailorError::StageExhausted`], the write cycle absorbs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub attempts: u32,
    /// Reason the final attempt was not accepted.
    pub reason: String,
}

impl From<StageFailure> for TailorError {
    fn from(failure: StageFailure) -> Self {
        TailorError::StageExhausted {
            stage: failure.stage.to_string(),
            attempts: failure.attempts,
            reason: failure.reason,
        }
    }
}

/// Decides whether a result is complete enough to proceed.
/// `Err` carries the rejection reason for the log.
pub type Acceptance<T> = fn(&T) -> std::result::Result<(), String>;

/// Parse acceptance: a name and at least one position.
pub fn accept_profile(profile: &SourceProfile) -> std::result::Result<(), String> {
    match profile.missing_field() {
        Some(field) => Err(format!("profile has no {field}")),
        None => Ok(()),
    }
}

/// Analyze acceptance: a title and an organization.
pub fn accept_target(target: &TargetSpec) -> std::result::Result<(), String> {
    match target.missing_field() {
        Some(field) => Err(format!("target has no {field}")),
        None => Ok(()),
    }
}

/// Accept any result the transformer returns.
pub fn accept_any<T>(_: &T) -> std::result::Result<(), String> {
    Ok(())
}

/// Runs one transformer call with an attempt budget and an acceptance check.
#[derive(Debug, Clone, Copy)]
pub struct StageExecutor {
    max_attempts: u32,
    retry_delay: Duration,
}

impl StageExecutor {
    /// `max_attempts` below one is treated as one.
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// A single attempt, no retry.
    pub fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Invoke `transformer` with the same request until `accept` passes or the
    /// budget runs out. Returns the first accepted result.
    #[instrument(skip_all, fields(stage = %stage, max_attempts = self.max_attempts))]
    pub async fn execute<Req, Out>(
        &self,
        stage: Stage,
        transformer: &dyn Transformer<Req, Out>,
        request: &Req,
        accept: Acceptance<Out>,
    ) -> std::result::Result<Out, StageFailure>
    where
        Req: Sync,
        Out: Send,
    {
        let mut reason = String::new();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && !self.retry_delay.is_zero() {
                debug!(delay_ms = self.retry_delay.as_millis(), "waiting before retry");
                tokio::time::sleep(self.retry_delay).await;
            }

            reason = match transformer.transform(request).await {
                Ok(output) => match accept(&output) {
                    Ok(()) => {
                        info!(attempt, "stage accepted result");
                        return Ok(output);
                    }
                    Err(rejection) => format!("incomplete result: {rejection}"),
                },
                Err(e) => e.to_string(),
            };

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                reason = %reason,
                "stage attempt failed"
            );
        }

        Err(StageFailure {
            stage,
            attempts: self.max_attempts,
            reason,
        })
    }
}
