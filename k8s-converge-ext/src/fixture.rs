use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use k8s_converge::ManagedResource as _;
use k8s_converge::ResourceKind;
use serde::Deserialize;
use thiserror::Error;

use super::*;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported kind {kind:?} in {}", .path.display())]
    UnsupportedKind { path: PathBuf, kind: Option<String> },

    #[error("expected a {expected} in {}, found a {found}", .path.display())]
    WrongKind {
        path: PathBuf,
        expected: ResourceKind,
        found: ResourceKind,
    },
}

#[derive(Debug, Deserialize)]
struct TypeMeta {
    kind: Option<String>,
}

/// Read and decode a JSON manifest.
pub fn load_object(path: impl AsRef<Path>) -> Result<KubeObject, FixtureError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_object(path, &data)
}

/// Like [`load_object`], but the manifest must describe a Pod.
pub fn load_pod(path: impl AsRef<Path>) -> Result<corev1::Pod, FixtureError> {
    let path = path.as_ref();
    let object = load_object(path)?;
    let found = object.kind();
    object.into_pod().ok_or_else(|| FixtureError::WrongKind {
        path: path.to_path_buf(),
        expected: ResourceKind::Pod,
        found,
    })
}

/// Decode a JSON manifest, dispatching on its `kind`. `path` is only used
/// for error reporting.
pub fn decode_object(path: &Path, data: &[u8]) -> Result<KubeObject, FixtureError> {
    let decode_error = |source| FixtureError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let meta: TypeMeta = serde_json::from_slice(data).map_err(decode_error)?;
    match meta.kind.as_deref() {
        Some("Service") => serde_json::from_slice(data)
            .map(KubeObject::Service)
            .map_err(decode_error),
        Some("ReplicationController") => serde_json::from_slice(data)
            .map(KubeObject::ReplicationController)
            .map_err(decode_error),
        Some("Pod") => serde_json::from_slice(data)
            .map(KubeObject::Pod)
            .map_err(decode_error),
        _ => Err(FixtureError::UnsupportedKind {
            path: path.to_path_buf(),
            kind: meta.kind,
        }),
    }
}
