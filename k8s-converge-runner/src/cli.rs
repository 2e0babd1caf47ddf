use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use k8s_converge::DEFAULT_NAMESPACE;
use k8s_converge::PollConfig;
use k8s_converge::TestContext;

#[derive(Debug, Parser)]
#[command(name = "k8s-converge", version, about = "Kubernetes end-to-end convergence suite")]
pub(crate) struct Cli {
    /// Kubernetes API endpoint, e.g. http://localhost:8080 (default: inferred kubeconfig)
    #[arg(long, env = "KUBE_CONVERGE_HOST")]
    pub(crate) host: Option<String>,

    /// Namespace the scenarios create their resources in
    #[arg(short, long, env = "KUBE_CONVERGE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub(crate) namespace: String,

    /// Cluster provider, some scenarios are skipped on some providers
    #[arg(long, env = "KUBE_CONVERGE_PROVIDER")]
    pub(crate) provider: Option<String>,

    /// Status probes before a convergence run times out
    #[arg(long, default_value_t = 60)]
    pub(crate) max_attempts: u32,

    /// Delay between status probes (Go duration syntax)
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    pub(crate) attempt_delay: Duration,

    /// Upper bound for a single probe (Go duration syntax)
    #[arg(long, value_parser = parse_duration)]
    pub(crate) probe_timeout: Option<Duration>,

    /// JSON Pod manifest used by the pod scenarios, which are skipped without one
    #[arg(long)]
    pub(crate) pod_fixture: Option<PathBuf>,

    /// Only run scenarios whose name contains this text (repeatable)
    #[arg(long = "scenario")]
    pub(crate) scenarios: Vec<String>,
}

impl Cli {
    pub(crate) fn context(&self) -> TestContext {
        TestContext::new(&self.namespace)
            .with_host(self.host.clone())
            .with_provider(self.provider.clone())
    }

    pub(crate) fn poll_config(&self) -> PollConfig {
        PollConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_attempt_delay(self.attempt_delay)
            .with_probe_timeout(self.probe_timeout)
    }
}

fn parse_duration(text: &str) -> Result<Duration, String> {
    let nanos = go_parse_duration::parse_duration(text)
        .map_err(|err| format!("invalid duration {text:?}: {err:?}"))?;
    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .map_err(|_| format!("negative duration {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["k8s-converge"]).unwrap();

        assert_eq!(cli.context(), TestContext::default());
        assert_eq!(cli.poll_config(), PollConfig::default());
        assert!(cli.pod_fixture.is_none());
        assert!(cli.scenarios.is_empty());
    }

    #[test]
    fn go_durations() {
        let cli = Cli::try_parse_from([
            "k8s-converge",
            "--attempt-delay",
            "1m30s",
            "--probe-timeout",
            "500ms",
        ])
        .unwrap();

        let config = cli.poll_config();
        assert_eq!(config.attempt_delay, Duration::from_secs(90));
        assert_eq!(config.probe_timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(Cli::try_parse_from(["k8s-converge", "--attempt-delay", "soon"]).is_err());
        assert!(Cli::try_parse_from(["k8s-converge", "--attempt-delay", "-2s"]).is_err());
    }

    #[test]
    fn context_from_flags() {
        let cli = Cli::try_parse_from([
            "k8s-converge",
            "--host",
            "http://localhost:8080",
            "-n",
            "e2e",
            "--provider",
            "vagrant",
            "--scenario",
            "Pods",
            "--scenario",
            "Networking",
        ])
        .unwrap();

        let context = cli.context();
        assert_eq!(context.host.as_deref(), Some("http://localhost:8080"));
        assert_eq!(context.namespace, "e2e");
        assert!(context.is_provider("vagrant"));
        assert_eq!(cli.scenarios, ["Pods", "Networking"]);
    }

    #[test]
    fn zero_attempts_still_probe_once() {
        let cli = Cli::try_parse_from(["k8s-converge", "--max-attempts", "0"]).unwrap();
        assert_eq!(cli.poll_config().max_attempts, 1);
    }
}
