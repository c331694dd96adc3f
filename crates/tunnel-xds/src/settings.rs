use serde::{Deserialize, Serialize};

use crate::loopback::LoopbackChannel;

/// Translator settings shared by every plugin in a pass.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// How generated self-clusters reach their self-listeners.
    #[serde(default)]
    pub loopback: LoopbackChannel,
}
