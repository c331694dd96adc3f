//! The self-referential cluster and listener pair.
//!
//! A tunneled route is rewritten to target a generated self-cluster, which
//! sends traffic back into the proxy over a loopback channel. The generated
//! self-listener on the other end runs a TCP proxy filter that opens an HTTP
//! CONNECT tunnel to the original cluster.
//!
//! This lets the HTTP connection manager do route-level matching on things
//! like the request path while the bytes are still forwarded as raw TCP,
//! which can only happen on a TCP listener.

use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, core::v3 as xds_core, endpoint::v3 as xds_endpoint,
    listener::v3 as xds_listener,
};
use xds_api::pb::google::protobuf;

use tunnel_api::HeaderValue;

use crate::encode::ConfigEncoder;
use crate::xds::tcp_proxy::{tcp_proxy, TcpProxy};

const SELF_CLUSTER_PREFIX: &str = "solo_io_generated_self_cluster_";
const SELF_LISTENER_PREFIX: &str = "solo_io_generated_self_listener_";
const TCP_STAT_PREFIX: &str = "soloioTcpStats";

/// The name of the filter on a generated self-listener.
pub const TCP_FILTER_NAME: &str = "tcp";

/// Connect timeout for generated self-clusters. The endpoint is the proxy
/// itself, so this only bounds a local connect.
pub const SELF_CLUSTER_CONNECT_TIMEOUT: protobuf::Duration = protobuf::Duration {
    seconds: 5,
    nanos: 0,
};

/// The name of the self-cluster generated for `cluster`.
pub fn self_cluster_name(cluster: &str) -> String {
    format!("{SELF_CLUSTER_PREFIX}{cluster}")
}

/// The original cluster name a self-cluster was generated for, or `None` if
/// `name` wasn't generated by [self_cluster_name].
pub fn original_cluster_name(name: &str) -> Option<&str> {
    name.strip_prefix(SELF_CLUSTER_PREFIX)
}

/// The name of the self-listener generated for `cluster`.
pub fn self_listener_name(cluster: &str) -> String {
    format!("{SELF_LISTENER_PREFIX}{cluster}")
}

/// The TCP proxy stats prefix for the self-listener generated for `cluster`.
pub fn tcp_stat_prefix(cluster: &str) -> String {
    format!("{TCP_STAT_PREFIX}{cluster}")
}

/// Build the cluster that routes to the self-listener at `loopback_address`.
///
/// `transport_socket` is used verbatim. It's normally the original cluster's
/// transport socket, so TLS to the final destination is originated here and
/// the tunnel carries already-encrypted bytes.
pub fn self_cluster(
    name: &str,
    loopback_address: &str,
    transport_socket: Option<xds_core::TransportSocket>,
) -> xds_cluster::Cluster {
    use xds_cluster::cluster::{ClusterDiscoveryType, DiscoveryType};

    let lb_endpoint = xds_endpoint::LbEndpoint {
        host_identifier: Some(xds_endpoint::lb_endpoint::HostIdentifier::Endpoint(
            xds_endpoint::Endpoint {
                address: Some(pipe_address(loopback_address)),
                ..Default::default()
            },
        )),
        ..Default::default()
    };

    let load_assignment = xds_endpoint::ClusterLoadAssignment {
        cluster_name: name.to_string(),
        endpoints: vec![xds_endpoint::LocalityLbEndpoints {
            lb_endpoints: vec![lb_endpoint],
            ..Default::default()
        }],
        ..Default::default()
    };

    xds_cluster::Cluster {
        name: name.to_string(),
        cluster_discovery_type: Some(ClusterDiscoveryType::Type(DiscoveryType::Static.into())),
        connect_timeout: Some(SELF_CLUSTER_CONNECT_TIMEOUT),
        load_assignment: Some(load_assignment),
        transport_socket,
        ..Default::default()
    }
}

/// Build the listener that accepts looped-back traffic for `cluster` and
/// tunnels it to `cluster` with an HTTP CONNECT to `tunnel_hostname`.
///
/// Fails only if the TCP proxy config can't be encoded.
pub fn forwarding_listener<E: ConfigEncoder>(
    encoder: &E,
    cluster: &str,
    loopback_address: &str,
    tunnel_hostname: &str,
    connect_headers: &[HeaderValue],
) -> crate::Result<xds_listener::Listener> {
    let config = TcpProxy {
        stat_prefix: tcp_stat_prefix(cluster),
        cluster_specifier: Some(tcp_proxy::ClusterSpecifier::Cluster(cluster.to_string())),
        tunneling_config: Some(tcp_proxy::TunnelingConfig {
            hostname: tunnel_hostname.to_string(),
            headers_to_add: connect_headers.iter().map(header_value_option).collect(),
            ..Default::default()
        }),
    };
    let typed_config = encoder.encode(&config)?;

    let filter = xds_listener::Filter {
        name: TCP_FILTER_NAME.to_string(),
        config_type: Some(xds_listener::filter::ConfigType::TypedConfig(typed_config)),
    };

    Ok(xds_listener::Listener {
        name: self_listener_name(cluster),
        address: Some(pipe_address(loopback_address)),
        filter_chains: vec![xds_listener::FilterChain {
            filters: vec![filter],
            ..Default::default()
        }],
        ..Default::default()
    })
}

fn pipe_address(path: &str) -> xds_core::Address {
    xds_core::Address {
        address: Some(xds_core::address::Address::Pipe(xds_core::Pipe {
            path: path.to_string(),
            ..Default::default()
        })),
    }
}

// CONNECT headers replace anything already on the request instead of being
// appended to it.
fn header_value_option(header: &HeaderValue) -> xds_core::HeaderValueOption {
    use xds_core::header_value_option::HeaderAppendAction;

    xds_core::HeaderValueOption {
        header: Some(xds_core::HeaderValue {
            key: header.key.clone(),
            value: header.value.clone(),
            ..Default::default()
        }),
        append_action: HeaderAppendAction::OverwriteIfExistsOrAdd.into(),
        ..Default::default()
    }
}
