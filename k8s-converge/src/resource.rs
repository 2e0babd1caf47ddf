use std::collections::BTreeMap;
use std::fmt;

/// Kinds of objects the harness knows how to create and tear down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Service,
    ReplicationController,
    Pod,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::ReplicationController => "ReplicationController",
            Self::Pod => "Pod",
        }
    }

    /// Replica-bearing kinds are scaled to zero before they are deleted.
    pub fn is_replica_bearing(self) -> bool {
        matches!(self, Self::ReplicationController)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object owned by a single test run.
pub trait ManagedResource: Clone + fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ResourceKind;

    /// Desired replica count, `None` for kinds without replicas.
    fn desired_replicas(&self) -> Option<i32>;

    /// No-op for kinds without replicas.
    fn set_desired_replicas(&mut self, replicas: i32);

    fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(self.kind(), self.name())
    }
}

/// Kind and name of a resource, used in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl ToString) -> Self {
        let name = name.to_string();
        Self { kind, name }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Equality-based label selector, rendered as `key=value,key=value`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.requirements.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        for (key, value) in &self.requirements {
            write!(f, "{separator}{key}={value}")?;
            separator = ",";
        }
        Ok(())
    }
}
