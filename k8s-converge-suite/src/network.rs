use std::collections::BTreeMap;

use k8s_converge::ConvergencePoller;
use k8s_converge_ext::IntOrString;
use k8s_converge_ext::ObjectMetaExt as _;
use k8s_converge_ext::corev1;
use k8s_converge_ext::default;
use k8s_converge_ext::metav1;
use rand::Rng as _;

use super::*;

const NETTEST_IMAGE: &str = "kubernetes/nettest:latest";
const NETTEST_CONTAINER: &str = "webserver";
const NETTEST_PORT: i32 = 8080;
const NETTEST_REPLICAS: i32 = 8;

/// The network scenario does not work on vagrant clusters.
pub(crate) fn applies(context: &TestContext) -> bool {
    !context.is_provider("vagrant")
}

/// `nettest-NNNN`; service names cannot take the generated-name form yet.
pub fn nettest_name() -> String {
    let suffix = rand::thread_rng().gen_range(0..10000);
    format!("nettest-{suffix}")
}

fn selector(name: &str) -> BTreeMap<String, String> {
    [("name".to_string(), name.to_string())].into()
}

pub fn nettest_service(name: &str) -> corev1::Service {
    let port = corev1::ServicePort {
        port: NETTEST_PORT,
        target_port: Some(IntOrString::Int(NETTEST_PORT)),
        ..default()
    };
    corev1::Service {
        metadata: metav1::ObjectMeta::new(name).labeled("name", name),
        spec: Some(corev1::ServiceSpec {
            ports: Some(vec![port]),
            selector: Some(selector(name)),
            ..default()
        }),
        ..default()
    }
}

pub fn nettest_controller(name: &str) -> corev1::ReplicationController {
    let container = corev1::Container {
        name: NETTEST_CONTAINER.to_string(),
        image: Some(NETTEST_IMAGE.to_string()),
        args: Some(vec![format!("-service={name}")]),
        ports: Some(vec![corev1::ContainerPort {
            container_port: NETTEST_PORT,
            ..default()
        }]),
        ..default()
    };
    let template = corev1::PodTemplateSpec {
        metadata: Some(metav1::ObjectMeta::default().labeled("name", name)),
        spec: Some(corev1::PodSpec {
            containers: vec![container],
            ..default()
        }),
    };
    corev1::ReplicationController {
        metadata: metav1::ObjectMeta::new(name).labeled("name", name),
        spec: Some(corev1::ReplicationControllerSpec {
            replicas: Some(NETTEST_REPLICAS),
            selector: Some(selector(name)),
            template: Some(template),
            ..default()
        }),
        ..default()
    }
}

/// Start the nettest webserver behind a service and wait for its peers to
/// report that they can all reach each other.
pub async fn verify_network_functions(
    kubeapi: &KubeApi,
    context: &TestContext,
    poll: &PollConfig,
) -> Result<(), ScenarioError> {
    let name = nettest_name();
    step(&format!("Creating service and replication controller {name}"));

    let resources = vec![nettest_service(&name).into(), nettest_controller(&name).into()];
    let report = ConvergencePoller::new(context.clone(), kubeapi, kubeapi)
        .with_config(poll.clone())
        .run(resources, &name)
        .await;

    tracing::info!(
        service = %name,
        outcome = %report.outcome,
        probes = report.status_probes(),
        "network convergence finished"
    );
    report.into_result()?;
    Ok(())
}
