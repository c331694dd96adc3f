//! Translate tunneled upstreams into Envoy configuration.
//!
//! An [Upstream][tunnel_api::Upstream] with an HTTP proxy hostname wants its
//! traffic carried to its cluster through an HTTP CONNECT tunnel. Envoy can
//! only open a CONNECT tunnel from a TCP proxy filter, so the
//! [TunnelingPlugin] rewrites every route to a tunneled cluster to target a
//! generated self-cluster. That cluster sends traffic back into the proxy
//! over a [loopback channel][LoopbackChannel], where a generated
//! self-listener runs the TCP proxy that opens the tunnel.
//!
//! Plugins run inside a larger translation pass. The host owns the clusters,
//! endpoints, route configurations, and listeners produced so far and hands
//! them to each [ResourceGenerator] in turn. Generators may edit clusters
//! and routes in place and return any resources they generate as
//! [GeneratedResources].

use tunnel_api::ApiSnapshot;
use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, endpoint::v3 as xds_endpoint, listener::v3 as xds_listener,
    route::v3 as xds_route,
};

mod error;
pub use error::{Error, Result};

mod encode;
pub use encode::{AnyEncoder, ConfigEncoder};

pub mod generate;

mod loopback;
pub use loopback::LoopbackChannel;

pub mod patch;
pub use patch::TunnelingPatch;

mod settings;
pub use settings::Settings;

mod tls;
pub use tls::{SslConfigResolver, TlsResolver};

mod tunneling;
pub use tunneling::{ClusterTarget, TunnelingPlugin, EXTENSION_NAME};

pub mod xds;

#[cfg(test)]
mod test;

/// Per-pass inputs shared by every plugin.
#[derive(Clone, Copy, Debug)]
pub struct Params<'a> {
    pub snapshot: &'a ApiSnapshot,
}

/// Inputs for one-time plugin setup.
#[derive(Clone, Copy, Debug)]
pub struct InitParams<'a> {
    pub settings: &'a Settings,
}

pub trait Plugin {
    /// A stable, unique name for this plugin.
    fn name(&self) -> &'static str;

    /// Configure the plugin before the first translation pass. Called again
    /// whenever settings change.
    fn init(&mut self, _params: InitParams<'_>) {}
}

/// A plugin that contributes resources to a translation pass.
pub trait ResourceGenerator: Plugin {
    /// Generate resources for a single translation pass.
    ///
    /// Clusters and route configurations may be modified in place. On error,
    /// nothing has been modified.
    fn generated_resources(
        &self,
        params: &Params<'_>,
        clusters: &mut [xds_cluster::Cluster],
        endpoints: &[xds_endpoint::ClusterLoadAssignment],
        route_configs: &mut [xds_route::RouteConfiguration],
        listeners: &[xds_listener::Listener],
    ) -> Result<GeneratedResources>;
}

/// New resources a [ResourceGenerator] wants added to a translation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedResources {
    pub clusters: Vec<xds_cluster::Cluster>,
    pub endpoints: Vec<xds_endpoint::ClusterLoadAssignment>,
    pub route_configurations: Vec<xds_route::RouteConfiguration>,
    pub listeners: Vec<xds_listener::Listener>,
}

impl GeneratedResources {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
            && self.endpoints.is_empty()
            && self.route_configurations.is_empty()
            && self.listeners.is_empty()
    }
}
