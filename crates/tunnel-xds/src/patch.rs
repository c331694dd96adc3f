//! Changes a translation pass wants to make to resources it doesn't own.
//!
//! Planning reads the existing clusters and route configurations without
//! touching them and records every change in a [TunnelingPatch]. The host
//! decides when to [apply][TunnelingPatch::apply] it.

use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, core::v3 as xds_core, listener::v3 as xds_listener,
    route::v3 as xds_route,
};

use crate::GeneratedResources;

/// The position of a route inside a list of route configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoutePath {
    pub route_config: usize,
    pub virtual_host: usize,
    pub route: usize,
}

/// Point the route at `path` at `cluster`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOverride {
    pub path: RoutePath,
    pub cluster: String,
}

/// Replace the transport socket of the cluster named `cluster`. Any
/// transport socket matches on the cluster are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportSocketOverride {
    pub cluster: String,
    pub transport_socket: Option<xds_core::TransportSocket>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunnelingPatch {
    /// Newly generated clusters, in generation order.
    pub clusters: Vec<xds_cluster::Cluster>,

    /// Newly generated listeners, in generation order.
    pub listeners: Vec<xds_listener::Listener>,

    /// Routes to rewrite, in scan order.
    pub route_overrides: Vec<RouteOverride>,

    /// Existing clusters to modify, in scan order.
    pub transport_socket_overrides: Vec<TransportSocketOverride>,
}

impl TunnelingPatch {
    /// Returns `true` if applying this patch would change nothing and
    /// generate nothing.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
            && self.listeners.is_empty()
            && self.route_overrides.is_empty()
            && self.transport_socket_overrides.is_empty()
    }

    /// Apply route and cluster changes in place and hand back the generated
    /// resources.
    ///
    /// Overrides that no longer point at anything are skipped. A transport
    /// socket override only applies to the first cluster with a matching
    /// name.
    pub fn apply(
        self,
        clusters: &mut [xds_cluster::Cluster],
        route_configs: &mut [xds_route::RouteConfiguration],
    ) -> GeneratedResources {
        for route_override in self.route_overrides {
            match route_mut(route_configs, route_override.path) {
                Some(route) => set_cluster(route, route_override.cluster),
                None => tracing::warn!(
                    path = ?route_override.path,
                    "route override does not match any route",
                ),
            }
        }

        for socket_override in self.transport_socket_overrides {
            let Some(cluster) = clusters.iter_mut().find(|c| c.name == socket_override.cluster)
            else {
                tracing::warn!(
                    cluster = %socket_override.cluster,
                    "transport socket override does not match any cluster",
                );
                continue;
            };

            cluster.transport_socket = socket_override.transport_socket;
            cluster.transport_socket_matches.clear();
        }

        GeneratedResources {
            clusters: self.clusters,
            listeners: self.listeners,
            ..Default::default()
        }
    }
}

fn route_mut(
    route_configs: &mut [xds_route::RouteConfiguration],
    path: RoutePath,
) -> Option<&mut xds_route::Route> {
    route_configs
        .get_mut(path.route_config)?
        .virtual_hosts
        .get_mut(path.virtual_host)?
        .routes
        .get_mut(path.route)
}

fn set_cluster(route: &mut xds_route::Route, cluster: String) {
    use xds_route::route::Action;
    use xds_route::route_action::ClusterSpecifier;

    match &mut route.action {
        Some(Action::Route(action)) => {
            action.cluster_specifier = Some(ClusterSpecifier::Cluster(cluster));
        }
        _ => tracing::warn!(%cluster, "route override targets a route with no route action"),
    }
}
