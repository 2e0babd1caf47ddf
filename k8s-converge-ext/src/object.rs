use k8s_converge::ManagedResource;
use k8s_converge::ResourceKind;

use super::*;

/// The Kubernetes objects a run can own.
#[derive(Clone, Debug, PartialEq)]
pub enum KubeObject {
    Service(corev1::Service),
    ReplicationController(corev1::ReplicationController),
    Pod(corev1::Pod),
}

impl KubeObject {
    pub fn metadata(&self) -> &metav1::ObjectMeta {
        match self {
            Self::Service(service) => &service.metadata,
            Self::ReplicationController(rc) => &rc.metadata,
            Self::Pod(pod) => &pod.metadata,
        }
    }

    pub fn into_pod(self) -> Option<corev1::Pod> {
        match self {
            Self::Pod(pod) => Some(pod),
            _ => None,
        }
    }
}

impl ManagedResource for KubeObject {
    fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    fn kind(&self) -> ResourceKind {
        match self {
            Self::Service(_) => ResourceKind::Service,
            Self::ReplicationController(_) => ResourceKind::ReplicationController,
            Self::Pod(_) => ResourceKind::Pod,
        }
    }

    fn desired_replicas(&self) -> Option<i32> {
        match self {
            Self::ReplicationController(rc) => rc.spec.as_ref().and_then(|spec| spec.replicas),
            Self::Service(_) | Self::Pod(_) => None,
        }
    }

    fn set_desired_replicas(&mut self, replicas: i32) {
        if let Self::ReplicationController(rc) = self {
            rc.spec.get_or_insert_with(default).replicas = Some(replicas);
        }
    }
}

impl From<corev1::Service> for KubeObject {
    fn from(service: corev1::Service) -> Self {
        Self::Service(service)
    }
}

impl From<corev1::ReplicationController> for KubeObject {
    fn from(rc: corev1::ReplicationController) -> Self {
        Self::ReplicationController(rc)
    }
}

impl From<corev1::Pod> for KubeObject {
    fn from(pod: corev1::Pod) -> Self {
        Self::Pod(pod)
    }
}
