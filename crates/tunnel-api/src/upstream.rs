//! Upstreams are the logical targets of traffic. See [Upstream] to get
//! started.

use serde::{Deserialize, Serialize};

use crate::{Error, ResourceRef};

/// An Upstream is a logical backend target.
///
/// Setting `http_proxy_hostname` marks the upstream as tunneled: traffic
/// routed to it is sent through an HTTP CONNECT proxy, and the hostname is
/// what the proxy is asked to connect to.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Upstream {
    #[serde(flatten)]
    pub metadata: ResourceRef,

    /// The hostname sent in the CONNECT request. Empty or missing means this
    /// upstream is not tunneled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy_hostname: Option<String>,

    /// Headers sent along with the CONNECT request, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_connect_headers: Vec<HeaderValue>,

    /// TLS settings for the connection to the CONNECT proxy itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_connect_ssl_config: Option<UpstreamSslConfig>,
}

impl Upstream {
    /// The tunneling hostname for this upstream, if it has a non-empty one.
    pub fn tunneling_hostname(&self) -> Option<&str> {
        self.http_proxy_hostname
            .as_deref()
            .filter(|hostname| !hostname.is_empty())
    }
}

/// A single header key and value.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HeaderValue {
    pub key: String,
    pub value: String,
}

impl HeaderValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// TLS origination settings for an upstream connection.
///
/// Certificates come either from a TLS [Secret][crate::Secret] referenced by
/// `secret_ref` or from files on the proxy's filesystem listed in
/// `ssl_files`. Setting both is an error.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpstreamSslConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<ResourceRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_files: Option<SslFiles>,

    /// The SNI value to present when connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    /// Subject alternative names the peer certificate must match. Requires a
    /// root CA.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_subject_alt_name: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn_protocols: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_renegotiation: bool,
}

/// Paths to TLS material on the proxy's filesystem.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SslFiles {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_cert: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root_ca: String,
}

/// The upstreams in a snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct UpstreamList(Vec<Upstream>);

impl UpstreamList {
    /// Look up an upstream by namespace and name.
    pub fn find(&self, namespace: &str, name: &str) -> Result<&Upstream, Error> {
        self.0
            .iter()
            .find(|u| u.metadata.namespace == namespace && u.metadata.name == name)
            .ok_or_else(|| Error::new(format!("upstream {namespace}/{name} not found")))
    }
}

impl std::ops::Deref for UpstreamList {
    type Target = [Upstream];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Upstream>> for UpstreamList {
    fn from(upstreams: Vec<Upstream>) -> Self {
        Self(upstreams)
    }
}

impl FromIterator<Upstream> for UpstreamList {
    fn from_iter<T: IntoIterator<Item = Upstream>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
