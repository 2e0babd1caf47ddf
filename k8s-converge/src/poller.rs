use std::panic;
use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::*;

/// Drives a single convergence run: create, poll, classify, tear down.
#[derive(Debug)]
pub struct ConvergencePoller<C, P> {
    context: TestContext,
    client: C,
    probe: P,
    config: PollConfig,
}

#[derive(Debug)]
enum Phase {
    Polling { attempt: u32 },
    Diagnosing(Verdict),
    Terminated(Outcome),
}

#[derive(Debug)]
enum Verdict {
    Failed { attempt: u32 },
    TimedOut,
}

impl Verdict {
    fn into_outcome(self, diagnostic: Diagnostic) -> Outcome {
        match self {
            Self::Failed { attempt } => Outcome::Failed(Failure::Reported {
                attempt,
                diagnostic,
            }),
            Self::TimedOut => Outcome::TimedOut(diagnostic),
        }
    }
}

#[derive(Debug, Default)]
struct Trace {
    attempts: Vec<PollAttempt>,
    diagnostic_probes: u32,
}

impl<C, P> ConvergencePoller<C, P>
where
    C: ResourceClient,
    P: StatusProbe,
{
    pub fn new(context: TestContext, client: C, probe: P) -> Self {
        Self {
            context,
            client,
            probe,
            config: PollConfig::default(),
        }
    }

    pub fn with_config(self, config: PollConfig) -> Self {
        Self { config, ..self }
    }

    /// Create `resources` in order, poll `target` until it converges, then
    /// tear down whatever was created.
    ///
    /// Teardown runs on every exit path, including a panic raised by a
    /// collaborator, which is resumed once teardown is done.
    pub async fn run(&self, resources: Vec<C::Resource>, target: &str) -> RunReport {
        let mut cleanup = CleanupStack::new();

        let converged = AssertUnwindSafe(self.converge(&mut cleanup, resources, target))
            .catch_unwind()
            .await;

        let created = cleanup.len();
        let teardown_failures = cleanup.unwind(&self.client).await;
        if teardown_failures.is_empty() {
            debug!(created, namespace = %self.context.namespace, "teardown complete");
        } else {
            warn!(
                created,
                failed = teardown_failures.len(),
                namespace = %self.context.namespace,
                "teardown incomplete"
            );
        }

        match converged {
            Ok((outcome, trace)) => RunReport {
                outcome,
                attempts: trace.attempts,
                diagnostic_probes: trace.diagnostic_probes,
                teardown_failures,
            },
            Err(payload) => {
                error!(resource = %target, "convergence run panicked, resuming after teardown");
                panic::resume_unwind(payload)
            }
        }
    }

    async fn converge(
        &self,
        cleanup: &mut CleanupStack<C::Resource>,
        resources: Vec<C::Resource>,
        target: &str,
    ) -> (Outcome, Trace) {
        let mut trace = Trace::default();

        for resource in resources {
            let wanted = resource.resource_ref();
            match self.client.create(&resource).await {
                Ok(created) => {
                    info!(resource = %wanted, "created");
                    cleanup.push(created);
                }
                Err(err) => {
                    error!(resource = %wanted, %err, "unable to create");
                    let failure = Failure::Creation {
                        resource: wanted,
                        error: err.to_string(),
                    };
                    return (Outcome::Failed(failure), trace);
                }
            }
        }

        let max_attempts = self.config.max_attempts;
        let mut phase = Phase::Polling { attempt: 0 };

        loop {
            phase = match phase {
                Phase::Polling { attempt } if attempt >= max_attempts => {
                    Phase::Diagnosing(Verdict::TimedOut)
                }
                Phase::Polling { attempt } => {
                    if attempt > 0 {
                        tokio::time::sleep(self.config.attempt_delay).await;
                    }

                    let observation = match self.fetch(target, ProbeQuery::Status).await {
                        Ok(body) => Observation::Status(Status::parse(&body)),
                        Err(err) => Observation::ProbeError(err),
                    };

                    let next = match &observation {
                        Observation::Status(Status::Pass) => {
                            info!(attempt, "passed");
                            Phase::Terminated(Outcome::Passed)
                        }
                        Observation::Status(Status::Fail) => {
                            warn!(attempt, "workload reported failure");
                            Phase::Diagnosing(Verdict::Failed { attempt })
                        }
                        Observation::Status(Status::Running) => {
                            info!(attempt, max_attempts, "test still running");
                            Phase::Polling {
                                attempt: attempt + 1,
                            }
                        }
                        Observation::Status(Status::Unrecognized(raw)) => {
                            info!(attempt, max_attempts, %raw, "unrecognized status");
                            Phase::Polling {
                                attempt: attempt + 1,
                            }
                        }
                        Observation::ProbeError(err) => {
                            info!(attempt, max_attempts, %err, "service/pod still starting");
                            Phase::Polling {
                                attempt: attempt + 1,
                            }
                        }
                    };

                    trace.attempts.push(PollAttempt::now(attempt, observation));
                    next
                }
                Phase::Diagnosing(verdict) => {
                    trace.diagnostic_probes += 1;
                    let diagnostic = match self.fetch(target, ProbeQuery::Read).await {
                        Ok(details) => Diagnostic::Details(details),
                        Err(err) => Diagnostic::Unavailable(err),
                    };
                    Phase::Terminated(verdict.into_outcome(diagnostic))
                }
                Phase::Terminated(outcome) => return (outcome, trace),
            };
        }
    }

    async fn fetch(&self, target: &str, query: ProbeQuery) -> Result<String, String> {
        let probe = self.probe.probe(target, query);
        match self.config.probe_timeout {
            Some(limit) => match tokio::time::timeout(limit, probe).await {
                Ok(result) => result.map_err(|err| err.to_string()),
                Err(_) => Err(format!("{query} probe timed out after {limit:?}")),
            },
            None => probe.await.map_err(|err| err.to_string()),
        }
    }
}
