use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;

use super::*;

/// Result of the diagnostic `read` query issued after a failure or timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    Details(String),
    /// The read itself failed; carries the transport error text.
    Unavailable(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Details(details) => write!(f, "Details:\n{details}"),
            Self::Unavailable(error) => write!(f, "Error reading details: {error}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// A resource could not be created, nothing was probed.
    Creation { resource: ResourceRef, error: String },
    /// The workload reported `fail` on the given attempt.
    Reported { attempt: u32, diagnostic: Diagnostic },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creation { resource, error } => {
                write!(f, "unable to create {resource}: {error}")
            }
            Self::Reported {
                attempt,
                diagnostic,
            } => write!(f, "Failed on attempt {attempt}. {diagnostic}"),
        }
    }
}

/// Terminal classification of a run, produced exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(Failure),
    TimedOut(Diagnostic),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("Passed"),
            Self::Failed(failure) => write!(f, "{failure}"),
            Self::TimedOut(diagnostic) => write!(f, "Timed out. {diagnostic}"),
        }
    }
}

/// What a single status probe returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    Status(Status),
    /// Transient probe error, counted as an inconclusive attempt.
    ProbeError(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PollAttempt {
    /// 0-based
    pub index: u32,
    pub observation: Observation,
    pub timestamp: OffsetDateTime,
}

impl PollAttempt {
    pub(crate) fn now(index: u32, observation: Observation) -> Self {
        Self {
            index,
            observation,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownAction {
    ScaleDown,
    Delete,
}

impl fmt::Display for TeardownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScaleDown => f.write_str("modify replica count for"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// A teardown step that did not succeed. Never replaces the run's outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeardownFailure {
    pub resource: ResourceRef,
    pub action: TeardownAction,
    pub error: String,
}

impl TeardownFailure {
    pub fn new(resource: ResourceRef, action: TeardownAction, error: impl ToString) -> Self {
        let error = error.to_string();
        Self {
            resource,
            action,
            error,
        }
    }
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to {} {}: {}", self.action, self.resource, self.error)
    }
}

/// Everything a convergence run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub outcome: Outcome,
    pub attempts: Vec<PollAttempt>,
    pub diagnostic_probes: u32,
    pub teardown_failures: Vec<TeardownFailure>,
}

impl RunReport {
    pub fn status_probes(&self) -> usize {
        self.attempts.len()
    }

    /// `Passed` maps to `Ok(())`, everything else to an error carrying the
    /// details and any teardown failures.
    pub fn into_result(self) -> Result<(), ConvergenceFailure> {
        if self.outcome.is_passed() {
            Ok(())
        } else {
            Err(ConvergenceFailure {
                outcome: self.outcome,
                teardown: self.teardown_failures,
            })
        }
    }
}

#[derive(Debug, Error)]
#[error("{}{}", .outcome, TeardownNotes(.teardown))]
pub struct ConvergenceFailure {
    pub outcome: Outcome,
    pub teardown: Vec<TeardownFailure>,
}

struct TeardownNotes<'a>(&'a [TeardownFailure]);

impl fmt::Display for TeardownNotes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in self.0 {
            write!(f, "\nteardown: {failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: Outcome, teardown_failures: Vec<TeardownFailure>) -> RunReport {
        RunReport {
            outcome,
            attempts: Vec::new(),
            diagnostic_probes: 0,
            teardown_failures,
        }
    }

    #[test]
    fn failure_messages() {
        let reported = Outcome::Failed(Failure::Reported {
            attempt: 3,
            diagnostic: Diagnostic::Details("dns lookup failed".to_string()),
        });
        assert_eq!(
            reported.to_string(),
            "Failed on attempt 3. Details:\ndns lookup failed"
        );

        let timed_out = Outcome::TimedOut(Diagnostic::Unavailable("503".to_string()));
        assert_eq!(
            timed_out.to_string(),
            "Timed out. Error reading details: 503"
        );
    }

    #[test]
    fn passed_report_is_ok_even_with_teardown_failures() {
        let failure = TeardownFailure::new(
            ResourceRef::new(ResourceKind::Service, "nettest-1"),
            TeardownAction::Delete,
            "forbidden",
        );
        assert!(report(Outcome::Passed, vec![failure]).into_result().is_ok());
    }

    #[test]
    fn failed_report_carries_teardown_notes() {
        let failure = TeardownFailure::new(
            ResourceRef::new(ResourceKind::ReplicationController, "nettest-1"),
            TeardownAction::ScaleDown,
            "conflict",
        );
        let outcome = Outcome::TimedOut(Diagnostic::Details("still waiting".to_string()));

        let err = report(outcome.clone(), vec![failure])
            .into_result()
            .unwrap_err();

        assert_eq!(err.outcome, outcome);
        assert_eq!(
            err.to_string(),
            "Timed out. Details:\nstill waiting\nteardown: unable to modify replica count for ReplicationController/nettest-1: conflict"
        );
    }
}
