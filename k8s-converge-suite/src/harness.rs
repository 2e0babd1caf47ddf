use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt as _;
use thiserror::Error;
use tokio::time::Instant;
use tracing::error;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(String),
    Skipped(String),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASS"),
            Self::Failed(_) => f.write_str("FAIL"),
            Self::Skipped(_) => f.write_str("SKIP"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub verdict: Verdict,
    pub duration: Duration,
}

#[derive(Debug, Error)]
#[error("{} of {total} scenarios failed in {suite}: {}", .failed.len(), .failed.join(", "))]
pub struct SuiteError {
    pub suite: String,
    pub total: usize,
    pub failed: Vec<String>,
}

/// Runs named scenarios one after another and reports them all at the end.
///
/// A failing or panicking scenario is recorded and the suite moves on.
#[derive(Debug)]
pub struct Suite {
    name: String,
    results: Vec<ScenarioResult>,
}

impl Suite {
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            results: Vec::new(),
        }
    }

    pub async fn run<Fut, E>(&mut self, name: &str, scenario: Fut)
    where
        Fut: Future<Output = Result<(), E>>,
        E: fmt::Display,
    {
        info!(scenario = name, "running");
        let start = Instant::now();
        let verdict = match AssertUnwindSafe(scenario).catch_unwind().await {
            Ok(Ok(())) => Verdict::Passed,
            Ok(Err(err)) => Verdict::Failed(err.to_string()),
            Err(payload) => Verdict::Failed(format!("PANIC: {}", panic_message(&*payload))),
        };
        let duration = start.elapsed();

        if let Verdict::Failed(err) = &verdict {
            error!(scenario = name, %err, "failed");
        } else {
            info!(scenario = name, ?duration, "passed");
        }

        self.results.push(ScenarioResult {
            name: name.to_string(),
            verdict,
            duration,
        });
    }

    pub fn skip(&mut self, name: &str, reason: impl ToString) {
        let reason = reason.to_string();
        info!(scenario = name, %reason, "skipped");
        self.results.push(ScenarioResult {
            name: name.to_string(),
            verdict: Verdict::Skipped(reason),
            duration: Duration::ZERO,
        });
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    /// Log the summary; fails when any scenario failed.
    pub fn finish(self) -> Result<(), SuiteError> {
        let total_duration: Duration = self.results.iter().map(|result| result.duration).sum();
        let count = |wanted: fn(&Verdict) -> bool| {
            self.results
                .iter()
                .filter(|result| wanted(&result.verdict))
                .count()
        };
        let passed = count(|verdict| matches!(verdict, Verdict::Passed));
        let skipped = count(|verdict| matches!(verdict, Verdict::Skipped(_)));

        info!("{}", self.name);
        for result in &self.results {
            info!(
                "  {}  {:50} {:.1}s",
                result.verdict,
                result.name,
                result.duration.as_secs_f64()
            );
            match &result.verdict {
                Verdict::Failed(reason) | Verdict::Skipped(reason) => info!("        -> {reason}"),
                Verdict::Passed => {}
            }
        }

        let failed = self
            .results
            .iter()
            .filter(|result| matches!(result.verdict, Verdict::Failed(_)))
            .map(|result| result.name.clone())
            .collect::<Vec<_>>();
        info!(
            "  {passed} passed, {} failed, {skipped} skipped ({:.1}s total)",
            failed.len(),
            total_duration.as_secs_f64()
        );

        if failed.is_empty() {
            Ok(())
        } else {
            Err(SuiteError {
                suite: self.name,
                total: self.results.len(),
                failed,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> Result<(), String> {
        Ok(())
    }

    async fn broken() -> Result<(), String> {
        Err("pod never became ready".to_string())
    }

    #[tokio::test]
    async fn records_each_verdict() {
        let mut suite = Suite::new("e2e");

        suite.run("first", ok()).await;
        suite.run("second", broken()).await;
        suite.skip("third", "not on this provider");

        let verdicts: Vec<_> = suite
            .results()
            .iter()
            .map(|result| (result.name.as_str(), result.verdict.clone()))
            .collect();
        assert_eq!(
            verdicts,
            [
                ("first", Verdict::Passed),
                ("second", Verdict::Failed("pod never became ready".to_string())),
                ("third", Verdict::Skipped("not on this provider".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn panics_are_recorded_as_failures() {
        let mut suite = Suite::new("e2e");

        suite
            .run("panics", async {
                if suite_should_panic() {
                    panic!("boom");
                }
                Ok::<_, String>(())
            })
            .await;

        assert_eq!(
            suite.results()[0].verdict,
            Verdict::Failed("PANIC: boom".to_string())
        );
    }

    fn suite_should_panic() -> bool {
        true
    }

    #[tokio::test(start_paused = true)]
    async fn measures_duration() {
        let mut suite = Suite::new("e2e");

        suite
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok::<_, String>(())
            })
            .await;

        assert_eq!(suite.results()[0].duration, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn finish_lists_failed_scenarios() {
        let mut suite = Suite::new("e2e");
        suite.run("first", broken()).await;
        suite.run("second", ok()).await;
        suite.run("third", broken()).await;

        let err = suite.finish().unwrap_err();

        assert_eq!(err.failed, ["first", "third"]);
        assert_eq!(err.to_string(), "2 of 3 scenarios failed in e2e: first, third");
    }

    #[tokio::test]
    async fn skipped_scenarios_do_not_fail_the_suite() {
        let mut suite = Suite::new("e2e");
        suite.run("first", ok()).await;
        suite.skip("second", "no fixture");

        assert!(suite.finish().is_ok());
    }
}
