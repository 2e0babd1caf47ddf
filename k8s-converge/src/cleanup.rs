use std::panic;
use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use tracing::debug;
use tracing::warn;

use super::*;

/// Resources created by a run, unwound in reverse creation order.
#[derive(Debug)]
pub struct CleanupStack<R> {
    created: Vec<R>,
}

impl<R> Default for CleanupStack<R> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
        }
    }
}

impl<R: ManagedResource> CleanupStack<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: R) {
        self.created.push(resource);
    }

    /// Forget a resource the caller already deleted itself.
    pub fn release(&mut self, kind: ResourceKind, name: &str) -> Option<R> {
        let index = self
            .created
            .iter()
            .rposition(|resource| resource.kind() == kind && resource.name() == name)?;
        Some(self.created.remove(index))
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Tear everything down, newest first.
    ///
    /// Replica-bearing resources are scaled to zero before they are deleted.
    /// Each resource gets exactly one delete attempt, even when the scale-down
    /// failed. Failures are collected, never returned early.
    pub async fn unwind<C>(self, client: &C) -> Vec<TeardownFailure>
    where
        C: ResourceClient<Resource = R>,
    {
        let mut failures = Vec::new();

        for resource in self.created.into_iter().rev() {
            let target = resource.resource_ref();

            if target.kind.is_replica_bearing() {
                match client.scale(&resource, 0).await {
                    Ok(_) => debug!(resource = %target, "scaled down"),
                    Err(err) => {
                        warn!(resource = %target, %err, "unable to modify replica count");
                        failures.push(TeardownFailure::new(
                            target.clone(),
                            TeardownAction::ScaleDown,
                            err,
                        ));
                    }
                }
            }

            match client.delete(target.kind, &target.name).await {
                Ok(()) => debug!(resource = %target, "deleted"),
                Err(err) => {
                    warn!(resource = %target, %err, "unable to delete");
                    failures.push(TeardownFailure::new(target, TeardownAction::Delete, err));
                }
            }
        }

        failures
    }
}

/// Run `scenario` against a fresh stack and unwind the stack afterwards,
/// also when the scenario panics. The panic is resumed once teardown is done.
pub async fn with_cleanup<C, T>(
    client: &C,
    scenario: impl AsyncFnOnce(&mut CleanupStack<C::Resource>) -> T,
) -> T
where
    C: ResourceClient,
{
    let mut cleanup = CleanupStack::new();
    let result = AssertUnwindSafe(scenario(&mut cleanup))
        .catch_unwind()
        .await;

    let created = cleanup.len();
    let failures = cleanup.unwind(client).await;
    if !failures.is_empty() {
        warn!(created, failed = failures.len(), "teardown incomplete");
    }

    result.unwrap_or_else(|payload| panic::resume_unwind(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Debug)]
    struct Object(ResourceKind, &'static str, Option<i32>);

    impl ManagedResource for Object {
        fn name(&self) -> &str {
            self.1
        }

        fn kind(&self) -> ResourceKind {
            self.0
        }

        fn desired_replicas(&self) -> Option<i32> {
            self.2
        }

        fn set_desired_replicas(&mut self, replicas: i32) {
            self.2 = Some(replicas);
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("server unavailable")]
    struct Unavailable;

    /// Records calls; fails every update when `broken` is set.
    #[derive(Debug, Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        broken: bool,
    }

    impl ResourceClient for Recorder {
        type Resource = Object;
        type Error = Unavailable;

        async fn create(&self, resource: &Object) -> Result<Object, Unavailable> {
            Ok(resource.clone())
        }

        async fn update(&self, resource: &Object) -> Result<Object, Unavailable> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("update {} {:?}", resource.1, resource.2));
            if self.broken {
                Err(Unavailable)
            } else {
                Ok(resource.clone())
            }
        }

        async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), Unavailable> {
            self.calls.lock().unwrap().push(format!("delete {kind}/{name}"));
            Ok(())
        }

        async fn list(
            &self,
            _kind: ResourceKind,
            _selector: &LabelSelector,
        ) -> Result<Vec<Object>, Unavailable> {
            Ok(Vec::new())
        }
    }

    fn stack() -> CleanupStack<Object> {
        let mut stack = CleanupStack::new();
        stack.push(Object(ResourceKind::Service, "web", None));
        stack.push(Object(ResourceKind::ReplicationController, "web", Some(3)));
        stack.push(Object(ResourceKind::Pod, "nginx", None));
        stack
    }

    #[tokio::test]
    async fn unwinds_newest_first() {
        let client = Recorder::default();

        let failures = stack().unwind(&client).await;

        assert!(failures.is_empty());
        assert_eq!(
            *client.calls.lock().unwrap(),
            [
                "delete Pod/nginx",
                "update web Some(0)",
                "delete ReplicationController/web",
                "delete Service/web",
            ]
        );
    }

    #[tokio::test]
    async fn failed_scale_down_still_deletes() {
        let client = Recorder {
            broken: true,
            ..Recorder::default()
        };

        let failures = stack().unwind(&client).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].to_string(),
            "unable to modify replica count for ReplicationController/web: server unavailable"
        );
        assert!(
            client
                .calls
                .lock()
                .unwrap()
                .contains(&"delete ReplicationController/web".to_string())
        );
    }

    #[tokio::test]
    async fn released_resources_are_not_deleted() {
        let client = Recorder::default();
        let mut stack = stack();

        let released = stack.release(ResourceKind::Pod, "nginx");

        assert_eq!(released.map(|object| object.1), Some("nginx"));
        assert_eq!(stack.len(), 2);
        assert!(stack.release(ResourceKind::Pod, "nginx").is_none());
        stack.unwind(&client).await;
        assert!(
            !client
                .calls
                .lock()
                .unwrap()
                .contains(&"delete Pod/nginx".to_string())
        );
    }

    #[test]
    fn release_matches_kind_and_name() {
        let mut stack = stack();
        assert!(stack.release(ResourceKind::Service, "nginx").is_none());
        assert!(stack.release(ResourceKind::Service, "web").is_some());
        assert!(!stack.is_empty());
    }

    fn explode() {
        panic!("scenario exploded");
    }

    #[tokio::test]
    async fn with_cleanup_returns_the_scenario_result() {
        let client = Recorder::default();

        let answer = with_cleanup(&client, async |cleanup| {
            cleanup.push(Object(ResourceKind::Pod, "nginx", None));
            42
        })
        .await;

        assert_eq!(answer, 42);
        assert_eq!(*client.calls.lock().unwrap(), ["delete Pod/nginx"]);
    }

    #[tokio::test]
    async fn with_cleanup_tears_down_before_resuming_a_panic() {
        let client = Recorder::default();

        let scenario = with_cleanup(&client, async |cleanup| {
            cleanup.push(Object(ResourceKind::ReplicationController, "web", Some(3)));
            cleanup.push(Object(ResourceKind::Pod, "nginx", None));
            explode();
        });
        let panicked = AssertUnwindSafe(scenario).catch_unwind().await;

        let payload = panicked.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"scenario exploded"));
        assert_eq!(
            *client.calls.lock().unwrap(),
            [
                "delete Pod/nginx",
                "update web Some(0)",
                "delete ReplicationController/web",
            ]
        );
    }
}
