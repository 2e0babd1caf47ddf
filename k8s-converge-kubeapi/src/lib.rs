use std::fmt;

use constcat::concat;
use k8s_converge::LabelSelector;
use k8s_converge::ProbeQuery;
use k8s_converge::ResourceClient;
use k8s_converge::ResourceKind;
use k8s_converge::StatusProbe;
use k8s_converge::TestContext;
use k8s_converge_ext as k8s;
use kube::api;
use serde_json::json;
use thiserror::Error;

use k8s::KubeObject;
use k8s::corev1;

const CORE_API_ROOT: &str = "/api/v1";
const NAMESPACES_ROOT: &str = concat!(CORE_API_ROOT, "/namespaces");

pub const POD_RUNNING: &str = "Running";

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid API host {host:?}: {source}")]
    InvalidHost {
        host: String,
        source: http::uri::InvalidUri,
    },

    #[error("failed to infer kubernetes config: {0}")]
    Infer(#[from] kube::config::InferConfigError),

    #[error("failed to create kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// Namespace-scoped access to the Kubernetes API for a test run.
///
/// Implements [`ResourceClient`] for Services, ReplicationControllers and Pods,
/// and [`StatusProbe`] through the service proxy subresource.
#[derive(Clone)]
pub struct KubeApi {
    namespace: String,
    get_params: api::GetParams,
    list_params: api::ListParams,
    post_params: api::PostParams,
    patch_params: api::PatchParams,
    delete_params: api::DeleteParams,
    client: kube::Client,
}

impl KubeApi {
    /// Create a KubeApi for the namespace and host of `context`.
    ///
    /// With a host the client talks to that endpoint directly, without
    /// credentials. Without one the configuration is inferred from the
    /// environment (in-cluster service account or kubeconfig).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), k8s_converge_kubeapi::ConnectError> {
    /// let context = k8s_converge::TestContext::new("default");
    /// let api = k8s_converge_kubeapi::KubeApi::new(&context).await?;
    /// assert_eq!(api.namespace(), "default");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(context: &TestContext) -> Result<Self, ConnectError> {
        let config = match context.host.as_deref() {
            Some(host) => {
                let cluster_url =
                    host.parse::<http::Uri>()
                        .map_err(|source| ConnectError::InvalidHost {
                            host: host.to_string(),
                            source,
                        })?;
                kube::Config::new(cluster_url)
            }
            None => kube::Config::infer().await?,
        };
        let client = kube::Client::try_from(config)?;
        Ok(Self::with_client(client, &context.namespace))
    }

    /// Create a KubeApi backed by the provided Kubernetes client.
    ///
    /// All requests are scoped to `namespace` and use default request parameters.
    pub fn with_client(client: kube::Client, namespace: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            get_params: api::GetParams::default(),
            list_params: api::ListParams::default(),
            post_params: api::PostParams::default(),
            patch_params: api::PatchParams::default(),
            delete_params: api::DeleteParams::default(),
            client,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fetch the current state of a Pod.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi) -> kube::Result<()> {
    /// let pod = api.get_pod("nginx").await?;
    /// println!("resourceVersion {:?}", pod.metadata.resource_version);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_pod(&self, name: &str) -> kube::Result<corev1::Pod> {
        self.pods().get(name).await
    }

    /// Returns the Pod's `status.phase`, `None` while the Pod has no status yet.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi) -> kube::Result<()> {
    /// if let Some(phase) = api.pod_phase("nginx").await? {
    ///     println!("nginx is {phase}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn pod_phase(&self, name: &str) -> kube::Result<Option<String>> {
        let pod = self.get_pod(name).await?;
        Ok(pod.status.and_then(|status| status.phase))
    }

    /// Whether the Pod has reached the `Running` phase.
    ///
    /// # Returns
    ///
    /// `Ok(false)` for a Pod in any other phase or without status; the `Err`
    /// variant indicates the Pod could not be fetched, including when it does not exist.
    pub async fn is_pod_running(&self, name: &str) -> kube::Result<bool> {
        let phase = self.pod_phase(name).await?;
        Ok(phase.as_deref() == Some(POD_RUNNING))
    }

    /// Fetches the raw response body of `{path}/{name}` from the Kubernetes API.
    ///
    /// # Parameters
    ///
    /// - `path`: API path without the last segment, e.g.
    ///   `"/api/v1/namespaces/default/services/nettest/proxy"`.
    /// - `name`: last path segment, e.g. `"status"`.
    ///
    /// # Returns
    ///
    /// A `String` containing the response body.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let proxy = api.service_proxy("nettest-12");
    /// let body = api.raw_get(proxy, "status").await?;
    /// ```
    async fn raw_get(&self, path: String, name: &str) -> kube::Result<String> {
        let gp = self.get_params();
        tracing::trace!(path, name, "GET");
        let request = api::Request::new(path)
            .get(name, gp)
            .map_err(kube::Error::BuildRequest)?;
        self.client.request_text(request).await
    }

    /// Path of the proxy subresource of a Service in this namespace.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let api = KubeApi::with_client(client, "e2e");
    /// assert_eq!(
    ///     api.service_proxy("nettest-12"),
    ///     "/api/v1/namespaces/e2e/services/nettest-12/proxy"
    /// );
    /// ```
    fn service_proxy(&self, service: &str) -> String {
        format!("{NAMESPACES_ROOT}/{}/services/{service}/proxy", self.namespace)
    }

    /// Returns an Api handle for Services in this namespace.
    fn services(&self) -> api::Api<corev1::Service> {
        api::Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn replication_controllers(&self) -> api::Api<corev1::ReplicationController> {
        api::Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> api::Api<corev1::Pod> {
        api::Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// # Returns
    ///
    /// A reference to the stored `api::GetParams`.
    fn get_params(&self) -> &api::GetParams {
        &self.get_params
    }

    /// List parameters restricted to `selector`; an empty selector lists everything.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let selector = LabelSelector::new().with("name", "nginx");
    /// assert_eq!(api.list_params(&selector).label_selector.as_deref(), Some("name=nginx"));
    /// ```
    fn list_params(&self, selector: &LabelSelector) -> api::ListParams {
        if selector.is_empty() {
            self.list_params.clone()
        } else {
            self.list_params.clone().labels(&selector.to_string())
        }
    }
}

impl ResourceClient for KubeApi {
    type Resource = KubeObject;
    type Error = kube::Error;

    /// Creates `resource` in this namespace.
    ///
    /// # Returns
    ///
    /// A `kube::Result` containing the object as stored by the API server, with its
    /// `resourceVersion` and `uid` set; the `Err` variant indicates a request or API error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use k8s_converge::ManagedResource as _;
    /// # use k8s_converge::ResourceClient as _;
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi, pod: k8s_converge_ext::corev1::Pod) -> kube::Result<()> {
    /// let created = api.create(&pod.into()).await?;
    /// println!("created {}", created.resource_ref());
    /// # Ok(())
    /// # }
    /// ```
    async fn create(&self, resource: &KubeObject) -> kube::Result<KubeObject> {
        let pp = &self.post_params;
        match resource {
            KubeObject::Service(service) => self
                .services()
                .create(pp, service)
                .await
                .map(KubeObject::Service),
            KubeObject::ReplicationController(rc) => self
                .replication_controllers()
                .create(pp, rc)
                .await
                .map(KubeObject::ReplicationController),
            KubeObject::Pod(pod) => self.pods().create(pp, pod).await.map(KubeObject::Pod),
        }
    }

    /// Replaces the stored object with `resource`.
    ///
    /// `resource` must carry the current `resourceVersion`, otherwise the API
    /// server rejects the write with a conflict.
    ///
    /// # Returns
    ///
    /// A `kube::Result` containing the object as stored after the write; the `Err`
    /// variant indicates a request or API error, including 409 Conflict.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use k8s_converge::ResourceClient as _;
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi) -> kube::Result<()> {
    /// let mut pod = api.get_pod("nginx").await?;
    /// pod.metadata.labels.get_or_insert_default().insert("time".into(), "42".into());
    /// api.update(&pod.into()).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn update(&self, resource: &KubeObject) -> kube::Result<KubeObject> {
        let pp = &self.post_params;
        let name = resource.metadata().name.as_deref().unwrap_or_default();
        match resource {
            KubeObject::Service(service) => self
                .services()
                .replace(name, pp, service)
                .await
                .map(KubeObject::Service),
            KubeObject::ReplicationController(rc) => self
                .replication_controllers()
                .replace(name, pp, rc)
                .await
                .map(KubeObject::ReplicationController),
            KubeObject::Pod(pod) => self
                .pods()
                .replace(name, pp, pod)
                .await
                .map(KubeObject::Pod),
        }
    }

    /// Scales a ReplicationController with a merge patch of `spec.replicas`.
    ///
    /// The patch carries no `resourceVersion`, so it applies on top of whatever
    /// the replication manager wrote since `resource` was read. Kinds without
    /// replicas are returned unchanged without a request.
    ///
    /// # Returns
    ///
    /// A `kube::Result` containing the patched object; the `Err` variant indicates
    /// a request or API error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use k8s_converge::ManagedResource as _;
    /// # use k8s_converge::ResourceClient as _;
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi, rc: k8s_converge_ext::KubeObject) -> kube::Result<()> {
    /// let scaled = api.scale(&rc, 0).await?;
    /// assert_eq!(scaled.desired_replicas(), Some(0));
    /// # Ok(())
    /// # }
    /// ```
    async fn scale(&self, resource: &KubeObject, replicas: i32) -> kube::Result<KubeObject> {
        let KubeObject::ReplicationController(_) = resource else {
            return Ok(resource.clone());
        };
        let name = resource.metadata().name.as_deref().unwrap_or_default();
        let patch = api::Patch::Merge(json!({ "spec": { "replicas": replicas } }));
        tracing::trace!(name, replicas, "PATCH");
        self.replication_controllers()
            .patch(name, &self.patch_params, &patch)
            .await
            .map(KubeObject::ReplicationController)
    }

    /// Deletes the object of `kind` called `name` from this namespace.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the API server accepted the deletion; the `Err` variant indicates
    /// a request or API error, including 404 for an object that is already gone.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use k8s_converge::ResourceClient as _;
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi) -> kube::Result<()> {
    /// api.delete(k8s_converge::ResourceKind::Pod, "nginx").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn delete(&self, kind: ResourceKind, name: &str) -> kube::Result<()> {
        let dp = &self.delete_params;
        match kind {
            ResourceKind::Service => {
                self.services().delete(name, dp).await?;
            }
            ResourceKind::ReplicationController => {
                self.replication_controllers().delete(name, dp).await?;
            }
            ResourceKind::Pod => {
                self.pods().delete(name, dp).await?;
            }
        }
        Ok(())
    }

    /// Lists the objects of `kind` in this namespace that match `selector`.
    ///
    /// # Returns
    ///
    /// A `kube::Result` containing one `KubeObject` per matching object; the `Err`
    /// variant indicates a request or API error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use k8s_converge::ResourceClient as _;
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi) -> kube::Result<()> {
    /// let selector = k8s_converge::LabelSelector::new().with("name", "nginx");
    /// let pods = api.list(k8s_converge::ResourceKind::Pod, &selector).await?;
    /// println!("{} pods match {selector}", pods.len());
    /// # Ok(())
    /// # }
    /// ```
    async fn list(
        &self,
        kind: ResourceKind,
        selector: &LabelSelector,
    ) -> kube::Result<Vec<KubeObject>> {
        let lp = self.list_params(selector);
        let items = match kind {
            ResourceKind::Service => self
                .services()
                .list(&lp)
                .await?
                .items
                .into_iter()
                .map(KubeObject::Service)
                .collect(),
            ResourceKind::ReplicationController => self
                .replication_controllers()
                .list(&lp)
                .await?
                .items
                .into_iter()
                .map(KubeObject::ReplicationController)
                .collect(),
            ResourceKind::Pod => self
                .pods()
                .list(&lp)
                .await?
                .items
                .into_iter()
                .map(KubeObject::Pod)
                .collect(),
        };
        Ok(items)
    }
}

impl StatusProbe for KubeApi {
    type Error = kube::Error;

    /// Query `target`'s service proxy; the answer comes from whichever
    /// backing pod the proxy picks, never from a pod address directly.
    ///
    /// # Returns
    ///
    /// A `kube::Result` containing the raw response body, e.g. `"pass"` or `"running"`
    /// for a status query; the `Err` variant indicates the proxy or the backend failed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use k8s_converge::StatusProbe as _;
    /// # async fn example(api: &k8s_converge_kubeapi::KubeApi) -> kube::Result<()> {
    /// let status = api.probe("nettest-12", k8s_converge::ProbeQuery::Status).await?;
    /// println!("nettest-12 reports {status}");
    /// # Ok(())
    /// # }
    /// ```
    async fn probe(&self, target: &str, query: ProbeQuery) -> kube::Result<String> {
        let proxy = self.service_proxy(target);
        self.raw_get(proxy, query.suffix()).await
    }
}

impl fmt::Debug for KubeApi {
    /// Formats the `KubeApi` for debugging, redacting the `client`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeApi")
            .field("namespace", &self.namespace)
            .field("get_params", &self.get_params)
            .field("list_params", &self.list_params)
            .field("client", &"<kube::Client>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_root() {
        assert_eq!(NAMESPACES_ROOT, "/api/v1/namespaces");
    }

    #[test]
    fn invalid_host_is_reported() {
        let err = "http://exa mple.com".parse::<http::Uri>().unwrap_err();
        let err = ConnectError::InvalidHost {
            host: "http://exa mple.com".to_string(),
            source: err,
        };
        assert!(err.to_string().starts_with(r#"invalid API host "http://exa mple.com""#));
    }
}
