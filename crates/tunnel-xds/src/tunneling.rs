//! HTTP CONNECT tunneling for upstreams with an HTTP proxy hostname.
//!
//! Envoy matches routes in the HTTP connection manager, but can only tunnel
//! over HTTP CONNECT from a TCP proxy filter, and the two can't run in the
//! same filter chain. Every route to a tunneled upstream is rewritten to a
//! generated self-cluster that loops back into the proxy at a generated
//! self-listener, which runs the TCP proxy that opens the tunnel to the
//! original cluster. See [crate::generate] for the generated resources.

use std::collections::BTreeSet;

use tracing::{debug, trace, warn};
use tunnel_api::{ResourceRef, Upstream};
use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, core::v3 as xds_core, endpoint::v3 as xds_endpoint,
    listener::v3 as xds_listener, route::v3 as xds_route,
};

use crate::encode::{AnyEncoder, ConfigEncoder};
use crate::generate::{
    forwarding_listener, original_cluster_name, self_cluster, self_cluster_name,
    self_listener_name,
};
use crate::loopback::LoopbackChannel;
use crate::patch::{RouteOverride, RoutePath, TransportSocketOverride, TunnelingPatch};
use crate::tls::{tls_transport_socket, SslConfigResolver, TlsResolver};
use crate::{Error, GeneratedResources, InitParams, Params, Plugin, ResourceGenerator, Result};

pub const EXTENSION_NAME: &str = "tunneling";

/// The cluster a route sends traffic to, as far as tunneling cares.
///
/// Only routes to a single, named cluster can be tunneled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterTarget<'a> {
    Cluster(&'a str),
    WeightedClusters,
    ClusterHeader,
    /// Redirects, direct responses, cluster specifier plugins, or a route
    /// with no cluster at all.
    Other,
}

impl<'a> ClusterTarget<'a> {
    pub fn from_route(route: &'a xds_route::Route) -> Self {
        use xds_route::route::Action;
        use xds_route::route_action::ClusterSpecifier;

        let Some(Action::Route(action)) = &route.action else {
            return Self::Other;
        };

        match &action.cluster_specifier {
            Some(ClusterSpecifier::Cluster(name)) if !name.is_empty() => Self::Cluster(name),
            Some(ClusterSpecifier::WeightedClusters(_)) => Self::WeightedClusters,
            Some(ClusterSpecifier::ClusterHeader(_)) => Self::ClusterHeader,
            _ => Self::Other,
        }
    }
}

/// Generates self-cluster and self-listener pairs for tunneled upstreams.
///
/// `T` resolves tunnel SSL config and `E` encodes typed config. The defaults
/// are fine outside of tests.
#[derive(Debug, Clone, Default)]
pub struct TunnelingPlugin<T = SslConfigResolver, E = AnyEncoder> {
    loopback: LoopbackChannel,
    tls: T,
    encoder: E,
}

impl TunnelingPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: TlsResolver, E: ConfigEncoder> TunnelingPlugin<T, E> {
    /// Create a plugin with a custom TLS resolver and encoder.
    pub fn with_parts(loopback: LoopbackChannel, tls: T, encoder: E) -> Self {
        Self {
            loopback,
            tls,
            encoder,
        }
    }

    pub fn loopback(&self) -> &LoopbackChannel {
        &self.loopback
    }

    /// Plan the changes for a translation pass without modifying anything.
    ///
    /// Bad upstream data (an unparseable cluster name, a missing upstream, or
    /// unresolvable tunnel SSL config) stops the scan. Everything planned up
    /// to that point is still returned as a success so that routes that were
    /// already rewritten keep pointing at generated resources.
    ///
    /// Failing to encode generated config is an internal error and is
    /// returned as-is.
    pub fn plan(
        &self,
        params: &Params<'_>,
        clusters: &[xds_cluster::Cluster],
        route_configs: &[xds_route::RouteConfiguration],
        listeners: &[xds_listener::Listener],
    ) -> Result<TunnelingPatch> {
        let mut patch = TunnelingPatch::default();
        let mut scan = ScanState {
            existing: already_generated(clusters, listeners),
            processed: BTreeSet::new(),
        };

        for (rc_idx, route_config) in route_configs.iter().enumerate() {
            for (vh_idx, vhost) in route_config.virtual_hosts.iter().enumerate() {
                for (route_idx, route) in vhost.routes.iter().enumerate() {
                    let path = RoutePath {
                        route_config: rc_idx,
                        virtual_host: vh_idx,
                        route: route_idx,
                    };

                    let res = self.plan_route(params, clusters, route, path, &mut scan, &mut patch);

                    match res {
                        Ok(()) => (),
                        // FIXME: this skips every route after the bad one, including
                        // tunneled routes that are fine. confirm whether a bad
                        // reference should only skip its own route.
                        Err(e) if e.is_soft() => {
                            warn!(
                                err = %e,
                                route_config = %route_config.name,
                                "stopped generating tunneling resources",
                            );
                            return Ok(patch);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        Ok(patch)
    }

    fn plan_route(
        &self,
        params: &Params<'_>,
        clusters: &[xds_cluster::Cluster],
        route: &xds_route::Route,
        path: RoutePath,
        scan: &mut ScanState,
        patch: &mut TunnelingPatch,
    ) -> Result<()> {
        let cluster = match ClusterTarget::from_route(route) {
            ClusterTarget::Cluster(cluster) => cluster,
            target => {
                trace!(?path, ?target, "skipping route");
                return Ok(());
            }
        };

        if original_cluster_name(cluster).is_some() {
            trace!(?path, %cluster, "route already targets a self-cluster");
            return Ok(());
        }

        let upstream = find_upstream(params, cluster)?;

        let Some(hostname) = upstream.tunneling_hostname() else {
            return Ok(());
        };

        let self_cluster_name = self_cluster_name(cluster);
        let loopback_address = self.loopback.address(cluster);

        // every route to a tunneled cluster gets rewritten, even when the
        // cluster was already handled.
        patch.route_overrides.push(RouteOverride {
            path,
            cluster: self_cluster_name.clone(),
        });

        if scan.processed.contains(cluster) {
            return Ok(());
        }

        // the original cluster is moved off its transport socket on every
        // pass, even if its self-cluster and self-listener already exist.
        // hosts that rebuild base clusters hand it back with its destination
        // TLS still attached.
        let original_transport_socket =
            self.relocate_transport_socket(params, clusters, cluster, upstream, patch)?;

        if scan.existing.contains(cluster) {
            trace!(%cluster, "self-cluster and self-listener already exist");
            scan.processed.insert(cluster.to_string());
            return Ok(());
        }

        patch.clusters.push(self_cluster(
            &self_cluster_name,
            &loopback_address,
            original_transport_socket,
        ));
        patch.listeners.push(forwarding_listener(
            &self.encoder,
            cluster,
            &loopback_address,
            hostname,
            &upstream.http_connect_headers,
        )?);
        scan.processed.insert(cluster.to_string());

        debug!(
            %cluster,
            upstream = %upstream.metadata,
            %hostname,
            %loopback_address,
            "generated tunneling resources",
        );
        Ok(())
    }

    /// Record the transport socket change for the original cluster and
    /// return the transport socket it had before.
    ///
    /// The self-cluster takes over the original transport socket and
    /// originates TLS to the destination, so the bytes that go through the
    /// tunnel are already encrypted. The original cluster only keeps TLS if
    /// the CONNECT proxy itself needs it.
    fn relocate_transport_socket(
        &self,
        params: &Params<'_>,
        clusters: &[xds_cluster::Cluster],
        cluster: &str,
        upstream: &Upstream,
        patch: &mut TunnelingPatch,
    ) -> Result<Option<xds_core::TransportSocket>> {
        let Some(original) = clusters.iter().find(|c| c.name == cluster) else {
            return Ok(None);
        };

        patch.transport_socket_overrides.push(TransportSocketOverride {
            cluster: cluster.to_string(),
            transport_socket: None,
        });

        if let Some(ssl) = &upstream.http_connect_ssl_config {
            let context = self
                .tls
                .resolve(&params.snapshot.secrets, ssl)
                .map_err(|source| Error::TlsConfig {
                    upstream: upstream.metadata.clone(),
                    source,
                })?;
            let transport_socket = tls_transport_socket(&self.encoder, &context)?;

            if let Some(socket_override) = patch.transport_socket_overrides.last_mut() {
                socket_override.transport_socket = Some(transport_socket);
            }
        }

        Ok(original.transport_socket.clone())
    }
}

/// Per-pass bookkeeping for [TunnelingPlugin::plan].
struct ScanState {
    /// Original clusters whose self-cluster and self-listener were passed in.
    existing: BTreeSet<String>,

    /// Original clusters already handled in this pass.
    processed: BTreeSet<String>,
}

fn find_upstream<'a>(params: &Params<'a>, cluster: &str) -> Result<&'a Upstream> {
    let upstream_ref =
        ResourceRef::from_cluster_name(cluster).map_err(|source| Error::InvalidReference {
            cluster: cluster.to_string(),
            source,
        })?;

    params
        .snapshot
        .upstreams
        .find(&upstream_ref.namespace, &upstream_ref.name)
        .map_err(|source| Error::UpstreamNotFound {
            cluster: cluster.to_string(),
            source,
        })
}

/// The original cluster names that already have both a self-cluster and a
/// self-listener in the existing resources.
fn already_generated(
    clusters: &[xds_cluster::Cluster],
    listeners: &[xds_listener::Listener],
) -> BTreeSet<String> {
    let listener_names: BTreeSet<&str> = listeners.iter().map(|l| l.name.as_str()).collect();

    clusters
        .iter()
        .filter_map(|c| original_cluster_name(&c.name))
        .filter(|original| listener_names.contains(self_listener_name(original).as_str()))
        .map(|original| original.to_string())
        .collect()
}

impl<T, E> Plugin for TunnelingPlugin<T, E> {
    fn name(&self) -> &'static str {
        EXTENSION_NAME
    }

    fn init(&mut self, params: InitParams<'_>) {
        self.loopback = params.settings.loopback.clone();

        if !self.loopback.is_supported() {
            warn!(
                loopback = ?self.loopback,
                "loopback channel is not supported on this platform",
            );
        }
    }
}

impl<T: TlsResolver, E: ConfigEncoder> ResourceGenerator for TunnelingPlugin<T, E> {
    fn generated_resources(
        &self,
        params: &Params<'_>,
        clusters: &mut [xds_cluster::Cluster],
        _endpoints: &[xds_endpoint::ClusterLoadAssignment],
        route_configs: &mut [xds_route::RouteConfiguration],
        listeners: &[xds_listener::Listener],
    ) -> Result<GeneratedResources> {
        let patch = self.plan(params, clusters, route_configs, listeners)?;
        Ok(patch.apply(clusters, route_configs))
    }
}
