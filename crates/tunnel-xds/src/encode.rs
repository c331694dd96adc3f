use xds_api::pb::google::protobuf;

use crate::Error;

/// Packs strongly typed configuration into the `Any` envelope that typed
/// config fields in the xDS schema require.
pub trait ConfigEncoder {
    fn encode<M: prost::Name>(&self, message: &M) -> Result<protobuf::Any, Error>;
}

/// The default [ConfigEncoder]. Encodes messages with their protobuf wire
/// format and canonical type URL.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyEncoder;

impl ConfigEncoder for AnyEncoder {
    fn encode<M: prost::Name>(&self, message: &M) -> Result<protobuf::Any, Error> {
        protobuf::Any::from_msg(message).map_err(|e| Error::Encode {
            type_url: M::type_url(),
            message: e.to_string(),
        })
    }
}
