//! Test helpers for xDS resources.
//!
//! Use these macros as a shorthand for writing out full xDS resource structs.

use tunnel_api::{HeaderValue, ResourceRef, Upstream};
use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, core::v3 as xds_core, endpoint::v3 as xds_endpoint,
    route::v3 as xds_route,
};
use xds_api::pb::google::protobuf;

use crate::{encode::ConfigEncoder, Error};

macro_rules! route_config {
    ($name:expr, [$($vhost:expr),*$(,)*]$(,)?) => {{
        xds_api::pb::envoy::config::route::v3::RouteConfiguration {
            name: $name.to_string(),
            virtual_hosts: vec![$($vhost,)*],
            ..Default::default()
        }
    }};
}

pub(crate) use route_config;

macro_rules! vhost {
    ($name:expr, [$($route:expr),*$(,)*]$(,)?) => {{
        crate::test::virtual_host($name, vec![$($route,)*])
    }};
}

pub(crate) use vhost;

macro_rules! route {
    (header $header_name:expr) => {{
        crate::test::route_to(
            xds_api::pb::envoy::config::route::v3::route_action::ClusterSpecifier::ClusterHeader(
                $header_name.to_string(),
            ),
        )
    }};
    (weighted [$($cluster:expr),*$(,)*]) => {{
        crate::test::weighted_route(vec![$($cluster,)*])
    }};
    ($cluster:expr) => {{
        crate::test::route_to(
            xds_api::pb::envoy::config::route::v3::route_action::ClusterSpecifier::Cluster(
                $cluster.to_string(),
            ),
        )
    }};
}

pub(crate) use route;

pub fn virtual_host(
    name: &'static str,
    routes: impl IntoIterator<Item = xds_route::Route>,
) -> xds_route::VirtualHost {
    xds_route::VirtualHost {
        name: name.to_string(),
        domains: vec!["*".to_string()],
        routes: routes.into_iter().collect(),
        ..Default::default()
    }
}

pub fn route_to(cluster_specifier: xds_route::route_action::ClusterSpecifier) -> xds_route::Route {
    let route_match = xds_route::RouteMatch {
        path_specifier: Some(xds_route::route_match::PathSpecifier::Prefix(
            "/".to_string(),
        )),
        ..Default::default()
    };

    xds_route::Route {
        r#match: Some(route_match),
        action: Some(xds_route::route::Action::Route(xds_route::RouteAction {
            cluster_specifier: Some(cluster_specifier),
            ..Default::default()
        })),
        ..Default::default()
    }
}

pub fn weighted_route(clusters: Vec<&'static str>) -> xds_route::Route {
    use xds_route::weighted_cluster::ClusterWeight;

    let clusters = clusters
        .into_iter()
        .map(|name| ClusterWeight {
            name: name.to_string(),
            ..Default::default()
        })
        .collect();

    route_to(
        xds_route::route_action::ClusterSpecifier::WeightedClusters(xds_route::WeightedCluster {
            clusters,
            ..Default::default()
        }),
    )
}

/// The cluster a route targets, if it targets a single cluster.
pub fn route_cluster(route: &xds_route::Route) -> Option<&str> {
    match &route.action {
        Some(xds_route::route::Action::Route(action)) => match &action.cluster_specifier {
            Some(xds_route::route_action::ClusterSpecifier::Cluster(name)) => Some(name.as_str()),
            _ => None,
        },
        _ => None,
    }
}

pub fn cluster(
    name: &'static str,
    transport_socket: Option<xds_core::TransportSocket>,
) -> xds_cluster::Cluster {
    xds_cluster::Cluster {
        name: name.to_string(),
        transport_socket,
        ..Default::default()
    }
}

/// A transport socket that's only distinguishable by name.
pub fn transport_socket(name: &'static str) -> xds_core::TransportSocket {
    xds_core::TransportSocket {
        name: name.to_string(),
        config_type: None,
    }
}

pub fn upstream(
    name: &'static str,
    hostname: Option<&'static str>,
    headers: Vec<(&'static str, &'static str)>,
) -> Upstream {
    Upstream {
        metadata: ResourceRef::new("", name),
        http_proxy_hostname: hostname.map(|h| h.to_string()),
        http_connect_headers: headers
            .into_iter()
            .map(|(k, v)| HeaderValue::new(k, v))
            .collect(),
        http_connect_ssl_config: None,
    }
}

/// The pipe path an address points at, if it's a pipe.
pub fn pipe_path(address: Option<&xds_core::Address>) -> Option<&str> {
    match address?.address.as_ref()? {
        xds_core::address::Address::Pipe(pipe) => Some(pipe.path.as_str()),
        _ => None,
    }
}

/// The pipe path of the first endpoint in a cluster's load assignment.
pub fn cluster_pipe_path(cluster: &xds_cluster::Cluster) -> Option<&str> {
    let cla = cluster.load_assignment.as_ref()?;
    let lb_endpoint = cla.endpoints.first()?.lb_endpoints.first()?;
    match lb_endpoint.host_identifier.as_ref()? {
        xds_endpoint::lb_endpoint::HostIdentifier::Endpoint(endpoint) => {
            pipe_path(endpoint.address.as_ref())
        }
        _ => None,
    }
}

/// A [ConfigEncoder] that always fails.
pub struct FailingEncoder;

impl ConfigEncoder for FailingEncoder {
    fn encode<M: prost::Name>(&self, _: &M) -> Result<protobuf::Any, Error> {
        Err(Error::Encode {
            type_url: M::type_url(),
            message: "encoding is broken".to_string(),
        })
    }
}

pub fn failing_encoder() -> FailingEncoder {
    FailingEncoder
}
