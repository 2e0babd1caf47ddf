pub use k8s_openapi as openapi;
pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
pub use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub use fixture::FixtureError;
pub use fixture::decode_object;
pub use fixture::load_object;
pub use fixture::load_pod;
pub use object::KubeObject;

mod fixture;
mod object;

pub trait ObjectMetaExt {
    fn new(name: impl ToString) -> Self;
    fn labeled(self, key: impl ToString, value: impl ToString) -> Self;
    fn insert_label(&mut self, key: impl ToString, value: impl ToString);
    fn label(&self, key: &str) -> Option<&str>;
}

impl ObjectMetaExt for metav1::ObjectMeta {
    fn new(name: impl ToString) -> Self {
        let name = Some(name.to_string());
        Self { name, ..default() }
    }

    fn labeled(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.insert_label(key, value);
        self
    }

    fn insert_label(&mut self, key: impl ToString, value: impl ToString) {
        self.labels
            .get_or_insert_with(default)
            .insert(key.to_string(), value.to_string());
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.labels.as_ref()?.get(key).map(String::as_str)
    }
}

pub trait StatusExt {
    fn success() -> Self;
}

impl StatusExt for metav1::Status {
    fn success() -> Self {
        Self {
            code: Some(200),
            status: Some("Success".to_string()),
            ..default()
        }
    }
}

pub fn default<T: Default>() -> T {
    T::default()
}
