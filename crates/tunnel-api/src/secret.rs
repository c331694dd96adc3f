//! Secrets hold key material referenced by other resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, ResourceRef};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Secret {
    #[serde(flatten)]
    pub metadata: ResourceRef,

    pub kind: SecretKind,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SecretKind {
    /// PEM encoded TLS material.
    Tls(TlsSecret),

    /// Arbitrary key-value data. Opaque secrets can't be used for TLS.
    Opaque {
        #[serde(default)]
        data: BTreeMap<String, String>,
    },
}

impl Default for SecretKind {
    fn default() -> Self {
        SecretKind::Opaque {
            data: BTreeMap::new(),
        }
    }
}

/// PEM encoded TLS material. Any of the fields may be empty.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsSecret {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_chain: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root_ca: String,
}

/// The secrets in a snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct SecretList(Vec<Secret>);

impl SecretList {
    /// Look up a secret by namespace and name.
    pub fn find(&self, namespace: &str, name: &str) -> Result<&Secret, Error> {
        self.0
            .iter()
            .find(|s| s.metadata.namespace == namespace && s.metadata.name == name)
            .ok_or_else(|| Error::new(format!("secret {namespace}/{name} not found")))
    }
}

impl std::ops::Deref for SecretList {
    type Target = [Secret];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Secret>> for SecretList {
    fn from(secrets: Vec<Secret>) -> Self {
        Self(secrets)
    }
}

impl FromIterator<Secret> for SecretList {
    fn from_iter<T: IntoIterator<Item = Secret>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
