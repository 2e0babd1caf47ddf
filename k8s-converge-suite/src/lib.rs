use std::path::PathBuf;

use k8s_converge::ConvergenceFailure;
use k8s_converge::PollConfig;
use k8s_converge::PollTimeout;
use k8s_converge::TestContext;
use k8s_converge_ext::FixtureError;
use k8s_converge_kubeapi::KubeApi;
use thiserror::Error;

pub use harness::ScenarioResult;
pub use harness::Suite;
pub use harness::SuiteError;
pub use harness::Verdict;
pub use network::nettest_controller;
pub use network::nettest_name;
pub use network::nettest_service;
pub use network::verify_network_functions;
pub use pods::submit_and_remove;
pub use pods::update;
pub use pods::wait_for_pod_running;

mod harness;
mod network;
mod pods;

pub const SUITE_NAME: &str = "Kubernetes Suite";
pub const NETWORK_SCENARIO: &str = "Networking should verify network functions";
pub const SUBMIT_AND_REMOVE_SCENARIO: &str = "Pods should submit and remove a pod";
pub const UPDATE_SCENARIO: &str = "Pods should update a pod";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Convergence(#[from] ConvergenceFailure),

    #[error(transparent)]
    Timeout(#[from] PollTimeout),

    #[error("expected {expected} pods matching {selector}, found {found}")]
    PodCount {
        selector: String,
        expected: usize,
        found: usize,
    },
}

/// Narrate a scenario step.
pub fn step(text: &str) {
    tracing::info!("STEP: {text}");
}

/// The scenarios of one suite run, sharing a client and the run settings.
#[derive(Debug)]
pub struct Scenarios {
    kubeapi: KubeApi,
    context: TestContext,
    poll: PollConfig,
    pod_fixture: Option<PathBuf>,
}

impl Scenarios {
    pub fn new(kubeapi: KubeApi, context: TestContext, poll: PollConfig) -> Self {
        Self {
            kubeapi,
            context,
            poll,
            pod_fixture: None,
        }
    }

    pub fn with_pod_fixture(self, pod_fixture: impl Into<Option<PathBuf>>) -> Self {
        Self {
            pod_fixture: pod_fixture.into(),
            ..self
        }
    }

    /// Run every scenario whose name contains one of `filter`, or all of
    /// them when `filter` is empty.
    pub async fn run(&self, filter: &[String]) -> Result<(), SuiteError> {
        let mut suite = Suite::new(SUITE_NAME);

        if is_selected(filter, NETWORK_SCENARIO) {
            if network::applies(&self.context) {
                let scenario = verify_network_functions(&self.kubeapi, &self.context, &self.poll);
                suite.run(NETWORK_SCENARIO, scenario).await;
            } else {
                // https://github.com/GoogleCloudPlatform/kubernetes/issues/3580
                suite.skip(NETWORK_SCENARIO, "broken for vagrant");
            }
        }

        for name in [SUBMIT_AND_REMOVE_SCENARIO, UPDATE_SCENARIO] {
            if !is_selected(filter, name) {
                continue;
            }
            let Some(fixture) = self.pod_fixture.as_deref() else {
                suite.skip(name, "no pod fixture configured");
                continue;
            };
            if name == UPDATE_SCENARIO {
                suite.run(name, update(&self.kubeapi, fixture)).await;
            } else {
                suite.run(name, submit_and_remove(&self.kubeapi, fixture)).await;
            }
        }

        suite.finish()
    }
}

fn is_selected(filter: &[String], name: &str) -> bool {
    filter.is_empty() || filter.iter().any(|pattern| name.contains(pattern.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_selects_everything() {
        assert!(is_selected(&[], NETWORK_SCENARIO));
        assert!(is_selected(&[], UPDATE_SCENARIO));
    }

    #[test]
    fn filter_matches_substrings() {
        let filter = ["Pods".to_string()];
        assert!(!is_selected(&filter, NETWORK_SCENARIO));
        assert!(is_selected(&filter, SUBMIT_AND_REMOVE_SCENARIO));
        assert!(is_selected(&filter, UPDATE_SCENARIO));

        let filter = ["update".to_string(), "network".to_string()];
        assert!(is_selected(&filter, NETWORK_SCENARIO));
        assert!(!is_selected(&filter, SUBMIT_AND_REMOVE_SCENARIO));
    }

    #[test]
    fn pod_count_message() {
        let err = ScenarioError::PodCount {
            selector: "e2esuite=42".to_string(),
            expected: 1,
            found: 0,
        };
        assert_eq!(
            err.to_string(),
            "expected 1 pods matching e2esuite=42, found 0"
        );
    }
}
