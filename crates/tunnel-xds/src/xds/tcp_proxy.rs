//! `envoy.extensions.filters.network.tcp_proxy.v3`

use xds_api::pb::envoy::config::core::v3 as xds_core;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TcpProxy {
    #[prost(string, tag = "1")]
    pub stat_prefix: String,

    #[prost(oneof = "tcp_proxy::ClusterSpecifier", tags = "2")]
    pub cluster_specifier: Option<tcp_proxy::ClusterSpecifier>,

    #[prost(message, optional, tag = "12")]
    pub tunneling_config: Option<tcp_proxy::TunnelingConfig>,
}

#[allow(clippy::module_inception)]
pub mod tcp_proxy {
    use super::xds_core;

    /// Configuration for tunneling TCP over another transport or protocol.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TunnelingConfig {
        /// The hostname to send in the synthesized CONNECT request.
        #[prost(string, tag = "1")]
        pub hostname: String,

        #[prost(bool, tag = "2")]
        pub use_post: bool,

        #[prost(message, repeated, tag = "3")]
        pub headers_to_add: Vec<xds_core::HeaderValueOption>,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ClusterSpecifier {
        /// The upstream cluster to connect to.
        #[prost(string, tag = "2")]
        Cluster(String),
    }
}

crate::xds::impl_name!(
    TcpProxy,
    "envoy.extensions.filters.network.tcp_proxy.v3",
    "TcpProxy"
);
