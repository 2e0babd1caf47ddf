use std::path::Path;
use std::time::Duration;

use k8s_converge::CleanupStack;
use k8s_converge::LabelSelector;
use k8s_converge::ManagedResource as _;
use k8s_converge::ResourceClient as _;
use k8s_converge::ResourceKind;
use k8s_converge::poll_until;
use k8s_converge::with_cleanup;
use k8s_converge_ext::KubeObject;
use k8s_converge_ext::ObjectMetaExt as _;
use k8s_converge_ext::corev1;
use k8s_converge_ext::load_pod;
use time::OffsetDateTime;

use super::*;

const SUITE_LABEL: &str = "e2esuite";
const TIME_LABEL: &str = "time";
const POD_RUNNING_TIMEOUT: Duration = Duration::from_secs(60);
const POD_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls every five seconds for `timeout`, counting the immediate first poll.
fn pod_poll_budget(timeout: Duration) -> PollConfig {
    let delays = timeout.as_secs() / POD_POLL_INTERVAL.as_secs();
    PollConfig::default()
        .with_max_attempts(u32::try_from(delays + 1).unwrap_or(u32::MAX))
        .with_attempt_delay(POD_POLL_INTERVAL)
}

/// Poll the Pod every five seconds until its phase is `Running`.
///
/// Fails once it was not seen running for the whole of `timeout`.
pub async fn wait_for_pod_running(
    kubeapi: &KubeApi,
    name: &str,
    timeout: Duration,
) -> Result<u32, PollTimeout> {
    let config = pod_poll_budget(timeout);
    let what = format!("pod {name} running");
    poll_until(&config, &what, move || kubeapi.is_pod_running(name)).await
}

/// Create the fixture Pod, find it by label, delete it and wait until it is
/// gone from the listing.
pub async fn submit_and_remove(kubeapi: &KubeApi, fixture: &Path) -> Result<(), ScenarioError> {
    step("loading the pod json");
    let mut pod = load_pod(fixture)?;
    let value = unique_value();
    pod.metadata.insert_label(SUITE_LABEL, &value);

    with_cleanup(kubeapi, async move |cleanup| {
        submit_and_remove_pod(kubeapi, cleanup, pod, &value).await
    })
    .await
}

async fn submit_and_remove_pod(
    kubeapi: &KubeApi,
    cleanup: &mut CleanupStack<KubeObject>,
    pod: corev1::Pod,
    value: &str,
) -> Result<(), ScenarioError> {
    step("submitting the pod to kubernetes");
    let created = kubeapi.create(&pod.into()).await?;
    let name = created.name().to_string();
    cleanup.push(created);

    step("verifying the pod is in kubernetes");
    let selector = LabelSelector::new().with(SUITE_LABEL, value);
    expect_pods(kubeapi, &selector, 1).await?;

    step("deleting the pod");
    kubeapi.delete(ResourceKind::Pod, &name).await?;
    cleanup.release(ResourceKind::Pod, &name);

    let selector = &selector;
    let config = pod_poll_budget(POD_RUNNING_TIMEOUT);
    poll_until(&config, "pod removed", move || async move {
        let pods = kubeapi.list(ResourceKind::Pod, selector).await?;
        Ok::<_, kube::Error>(pods.is_empty())
    })
    .await?;
    Ok(())
}

/// Create the fixture Pod, wait for it to run, relabel it and check the
/// new label is visible once it runs again.
pub async fn update(kubeapi: &KubeApi, fixture: &Path) -> Result<(), ScenarioError> {
    step("loading the pod json");
    let mut pod = load_pod(fixture)?;
    let value = unique_value();
    pod.metadata.insert_label(SUITE_LABEL, &value);

    with_cleanup(kubeapi, async move |cleanup| {
        update_pod(kubeapi, cleanup, pod, &value).await
    })
    .await
}

async fn update_pod(
    kubeapi: &KubeApi,
    cleanup: &mut CleanupStack<KubeObject>,
    pod: corev1::Pod,
    value: &str,
) -> Result<(), ScenarioError> {
    step("submitting the pod to kubernetes");
    let created = kubeapi.create(&pod.into()).await?;
    let name = created.name().to_string();
    cleanup.push(created);

    step("verifying the pod is in kubernetes");
    wait_for_pod_running(kubeapi, &name, POD_RUNNING_TIMEOUT).await?;
    let selector = LabelSelector::new().with(SUITE_LABEL, value);
    expect_pods(kubeapi, &selector, 1).await?;

    step("retrieving the pod");
    let mut pod = kubeapi.get_pod(&name).await?;

    step("updating the pod");
    let value = format!("time{value}");
    // The fetched Pod carries the current resourceVersion and UID.
    pod.metadata.insert_label(TIME_LABEL, &value);
    let updated = kubeapi.update(&pod.into()).await?;
    wait_for_pod_running(kubeapi, updated.name(), POD_RUNNING_TIMEOUT).await?;

    step("verifying the updated pod");
    let selector = LabelSelector::new().with(TIME_LABEL, value);
    expect_pods(kubeapi, &selector, 1).await
}

async fn expect_pods(
    kubeapi: &KubeApi,
    selector: &LabelSelector,
    expected: usize,
) -> Result<(), ScenarioError> {
    let found = kubeapi.list(ResourceKind::Pod, selector).await?.len();
    if found == expected {
        Ok(())
    } else {
        Err(ScenarioError::PodCount {
            selector: selector.to_string(),
            expected,
            found,
        })
    }
}

fn unique_value() -> String {
    OffsetDateTime::now_utc().nanosecond().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_values_are_numeric() {
        let value = unique_value();
        assert!(value.parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[test]
    fn running_budget_covers_the_whole_timeout() {
        let config = pod_poll_budget(POD_RUNNING_TIMEOUT);
        let waited = config.attempt_delay * (config.max_attempts - 1);

        assert_eq!(config.max_attempts, 13);
        assert_eq!(waited, POD_RUNNING_TIMEOUT);
    }

    #[test]
    fn short_timeout_still_polls_once() {
        assert_eq!(pod_poll_budget(Duration::from_secs(3)).max_attempts, 1);
    }
}
