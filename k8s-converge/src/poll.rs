use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::debug;
use tracing::trace;

use super::*;

#[derive(Debug, Error)]
#[error("{what} not satisfied after {attempts} attempts")]
pub struct PollTimeout {
    pub what: String,
    pub attempts: u32,
}

/// Call `check` until it returns `Ok(true)`, at most `config.max_attempts`
/// times with `config.attempt_delay` between calls.
///
/// Errors from `check` are inconclusive, just like `Ok(false)`. Returns the
/// 0-based attempt that succeeded.
pub async fn poll_until<F, Fut, E>(
    config: &PollConfig,
    what: &str,
    mut check: F,
) -> Result<u32, PollTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    for attempt in 0..config.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(config.attempt_delay).await;
        }

        match check().await {
            Ok(true) => return Ok(attempt),
            Ok(false) => trace!(what, attempt, "condition not yet met"),
            Err(err) => debug!(what, attempt, %err, "check failed, retrying"),
        }
    }

    Err(PollTimeout {
        what: what.to_string(),
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;

    fn quick(max_attempts: u32) -> PollConfig {
        PollConfig::default()
            .with_max_attempts(max_attempts)
            .with_attempt_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn returns_first_satisfied_attempt() {
        let calls = Cell::new(0);
        let attempt = poll_until(&quick(5), "third call", || {
            calls.set(calls.get() + 1);
            let done = calls.get() == 3;
            async move { Ok::<_, String>(done) }
        })
        .await
        .unwrap();

        assert_eq!(attempt, 2);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn errors_are_inconclusive() {
        let calls = Cell::new(0);
        let attempt = poll_until(&quick(3), "after an error", || {
            calls.set(calls.get() + 1);
            let result = if calls.get() == 1 {
                Err("connection refused".to_string())
            } else {
                Ok(true)
            };
            async move { result }
        })
        .await
        .unwrap();

        assert_eq!(attempt, 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let err = poll_until(&quick(4), "never", || {
            calls.set(calls.get() + 1);
            async { Ok::<_, String>(false) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.get(), 4);
        assert_eq!(err.attempts, 4);
        assert_eq!(err.to_string(), "never not satisfied after 4 attempts");
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_only() {
        let config = PollConfig::default()
            .with_max_attempts(3)
            .with_attempt_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();

        let _ = poll_until(&config, "never", || async { Ok::<_, String>(false) }).await;

        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }
}
