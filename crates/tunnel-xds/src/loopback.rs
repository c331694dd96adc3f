//! Local channels that connect a generated self-cluster back to its
//! generated self-listener without leaving the proxy process.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the proxy addresses itself when looping traffic from the HTTP chain
/// back into the TCP chain.
///
/// Every strategy derives the address from the original cluster name alone,
/// so a generated cluster and listener always agree on it.
///
/// Both strategies end up as a Unix socket address, which is limited to 108
/// bytes (`sun_path`) including the leading `@` of an abstract socket. Envoy
/// fails to bind a listener whose address is longer than that, so very long
/// cluster names or deeply nested socket directories won't work.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum LoopbackChannel {
    /// A Unix socket in the abstract namespace, addressed as `@/{cluster}`.
    /// Abstract sockets never touch the filesystem but only exist on Linux.
    #[default]
    AbstractSocket,

    /// A Unix socket file at `{path}/{cluster}.sock`. Works on any Unix
    /// host. `path` must be writable by the proxy.
    ///
    /// Path separators and `%` in the cluster name are percent-encoded, so
    /// every socket stays directly inside `path`.
    SocketDir { path: PathBuf },
}

impl LoopbackChannel {
    /// The pipe path the self-cluster connects to and the self-listener
    /// binds for `cluster`.
    pub fn address(&self, cluster: &str) -> String {
        match self {
            LoopbackChannel::AbstractSocket => format!("@/{cluster}"),
            LoopbackChannel::SocketDir { path } => {
                path.join(socket_file_name(cluster)).display().to_string()
            }
        }
    }

    /// Returns `true` if this channel can be used by a proxy running on the
    /// same platform this crate was built for.
    pub fn is_supported(&self) -> bool {
        match self {
            LoopbackChannel::AbstractSocket => {
                cfg!(any(target_os = "linux", target_os = "android"))
            }
            LoopbackChannel::SocketDir { .. } => cfg!(unix),
        }
    }
}

fn socket_file_name(cluster: &str) -> String {
    let mut name = String::with_capacity(cluster.len() + ".sock".len());
    for c in cluster.chars() {
        match c {
            '/' | '\\' | '%' | '\0' => {
                let _ = write!(name, "%{:02X}", c as u32);
            }
            c => name.push(c),
        }
    }
    name.push_str(".sock");
    name
}
