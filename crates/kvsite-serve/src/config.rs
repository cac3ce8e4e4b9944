use std::net::{Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Port the preview server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8787;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub bind_addr: SocketAddr,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
        }
    }
}
