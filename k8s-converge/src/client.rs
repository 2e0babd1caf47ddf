use std::error::Error as StdError;
use std::future::Future;

use super::*;

/// Namespace-scoped create/update/delete/list access to the target system.
pub trait ResourceClient: Send + Sync {
    type Resource: ManagedResource;
    type Error: StdError + Send + Sync + 'static;

    /// Returns the object as stored by the server.
    fn create(
        &self,
        resource: &Self::Resource,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    fn update(
        &self,
        resource: &Self::Resource,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    /// Set the desired replica count of a replica-bearing resource.
    ///
    /// The default replaces the whole object through [`update`](Self::update),
    /// which only succeeds while `resource` is still the stored version.
    /// Clients whose server supports partial updates should override it.
    fn scale(
        &self,
        resource: &Self::Resource,
        replicas: i32,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send {
        async move {
            let mut resource = resource.clone();
            resource.set_desired_replicas(replicas);
            self.update(&resource).await
        }
    }

    fn delete(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn list(
        &self,
        kind: ResourceKind,
        selector: &LabelSelector,
    ) -> impl Future<Output = Result<Vec<Self::Resource>, Self::Error>> + Send;
}

/// Indirect status query against a named target, e.g. through a service proxy.
pub trait StatusProbe: Send + Sync {
    type Error: StdError + Send + Sync + 'static;

    /// Returns the raw response body.
    fn probe(
        &self,
        target: &str,
        query: ProbeQuery,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

impl<T: ResourceClient> ResourceClient for &T {
    type Resource = T::Resource;
    type Error = T::Error;

    fn create(
        &self,
        resource: &Self::Resource,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send {
        (**self).create(resource)
    }

    fn update(
        &self,
        resource: &Self::Resource,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send {
        (**self).update(resource)
    }

    fn scale(
        &self,
        resource: &Self::Resource,
        replicas: i32,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send {
        (**self).scale(resource, replicas)
    }

    fn delete(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).delete(kind, name)
    }

    fn list(
        &self,
        kind: ResourceKind,
        selector: &LabelSelector,
    ) -> impl Future<Output = Result<Vec<Self::Resource>, Self::Error>> + Send {
        (**self).list(kind, selector)
    }
}

impl<T: StatusProbe> StatusProbe for &T {
    type Error = T::Error;

    fn probe(
        &self,
        target: &str,
        query: ProbeQuery,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send {
        (**self).probe(target, query)
    }
}
