//! Tunnel API resources.
//!
//! These types describe upstreams and secrets as data, independent of the
//! proxy configuration they eventually turn into. An [Upstream] that sets an
//! HTTP proxy hostname asks for its traffic to be tunneled over HTTP CONNECT.
//!
//! Use the `tunnel-xds` crate to translate these resources into Envoy
//! configuration.

mod error;
pub use error::{Error, ErrorContext};

pub mod secret;
pub mod upstream;

pub use secret::{Secret, SecretKind, SecretList, TlsSecret};
pub use upstream::{HeaderValue, SslFiles, Upstream, UpstreamList, UpstreamSslConfig};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A reference to a namespaced resource.
///
/// `ResourceRef`s are cheap to `clone` and compare by namespace first and
/// name second.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    /// The namespace of the resource. May be empty.
    #[serde(default, skip_serializing_if = "SmolStr::is_empty")]
    pub namespace: SmolStr,

    /// The name of the resource.
    pub name: SmolStr,
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl ResourceRef {
    pub fn new(namespace: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The name of the cluster generated for the upstream this reference
    /// points at.
    ///
    /// Cluster names are `{name}_{namespace}`, or just `{name}` for a
    /// resource with no namespace.
    pub fn cluster_name(&self) -> String {
        if self.namespace.is_empty() {
            return self.name.to_string();
        }
        format!("{}_{}", self.name, self.namespace)
    }

    /// Parse a cluster name back into a reference to the upstream that
    /// generated it. This is the inverse of [ResourceRef::cluster_name].
    pub fn from_cluster_name(cluster: &str) -> Result<Self, Error> {
        if cluster.is_empty() {
            return Err(Error::new_static("cluster name is empty"));
        }

        let mut parts = cluster.split('_');
        // split always yields at least one element
        let name = parts.next().unwrap_or_default();
        let namespace = parts.next().unwrap_or_default();

        if parts.next().is_some() {
            return Err(Error::new(format!(
                "unable to convert cluster {cluster} back to an upstream reference"
            )));
        }
        if name.is_empty() {
            return Err(Error::new(format!("cluster {cluster} has an empty name")));
        }

        Ok(Self::new(namespace, name))
    }
}

/// The declarative resources visible to a single translation pass.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ApiSnapshot {
    #[serde(default)]
    pub upstreams: UpstreamList,

    #[serde(default)]
    pub secrets: SecretList,
}
