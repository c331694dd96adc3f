//! Envoy extension messages that aren't part of the core xDS resource set.
//!
//! Only the fields this crate writes are declared. Field tags match the
//! upstream `.proto` definitions so encoded messages decode cleanly on the
//! proxy side, where unknown fields are ignored.

/// The type URL domain Envoy expects for `Any` payloads.
const TYPE_URL_DOMAIN: &str = "type.googleapis.com";

macro_rules! impl_name {
    ($ty:ty, $package:literal, $name:literal) => {
        impl ::prost::Name for $ty {
            const NAME: &'static str = $name;
            const PACKAGE: &'static str = $package;

            fn type_url() -> String {
                format!("{}/{}.{}", crate::xds::TYPE_URL_DOMAIN, $package, $name)
            }
        }
    };
}

pub(crate) use impl_name;

pub mod tcp_proxy;
pub mod tls;
