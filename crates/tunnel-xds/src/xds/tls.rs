//! `envoy.extensions.transport_sockets.tls.v3`

use xds_api::pb::envoy::{config::core::v3 as xds_core, r#type::matcher::v3 as xds_matcher};

/// The well-known name of Envoy's TLS transport socket.
pub const TRANSPORT_SOCKET_TLS: &str = "envoy.transport_sockets.tls";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpstreamTlsContext {
    #[prost(message, optional, tag = "1")]
    pub common_tls_context: Option<CommonTlsContext>,

    #[prost(string, tag = "2")]
    pub sni: String,

    #[prost(bool, tag = "3")]
    pub allow_renegotiation: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommonTlsContext {
    #[prost(message, repeated, tag = "2")]
    pub tls_certificates: Vec<TlsCertificate>,

    #[prost(oneof = "common_tls_context::ValidationContextType", tags = "3")]
    pub validation_context_type: Option<common_tls_context::ValidationContextType>,

    #[prost(string, repeated, tag = "4")]
    pub alpn_protocols: Vec<String>,
}

pub mod common_tls_context {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ValidationContextType {
        #[prost(message, tag = "3")]
        ValidationContext(super::CertificateValidationContext),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TlsCertificate {
    #[prost(message, optional, tag = "1")]
    pub certificate_chain: Option<xds_core::DataSource>,

    #[prost(message, optional, tag = "2")]
    pub private_key: Option<xds_core::DataSource>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CertificateValidationContext {
    #[prost(message, optional, tag = "1")]
    pub trusted_ca: Option<xds_core::DataSource>,

    #[prost(message, repeated, tag = "9")]
    pub match_subject_alt_names: Vec<xds_matcher::StringMatcher>,
}

crate::xds::impl_name!(
    UpstreamTlsContext,
    "envoy.extensions.transport_sockets.tls.v3",
    "UpstreamTlsContext"
);
