use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use saturate_common::PAYLOAD;
use tokio::net::UdpSocket;

use crate::config::EmitterConfig;
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

// Sends between two looks at the stop flag.
const SHUTDOWN_CHECK_INTERVAL: u64 = 1024;

/// Floods one destination with one-byte datagrams.
#[derive(Debug, Clone, Copy)]
pub struct Emitter {
    dest: SocketAddr,
}

impl Emitter {
    pub fn new(dest: SocketAddr) -> Self {
        Self { dest }
    }

    /// Resolves the configured host. Nothing is sent if this fails.
    pub async fn resolve(config: &EmitterConfig) -> Result<Self> {
        let dest = config.resolve().await?;
        Ok(Self::new(dest))
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Sends `PAYLOAD` to the destination with no pause until `shutdown` fires
    /// or a send fails. Returns how many datagrams went out.
    pub async fn run(self, shutdown: Shutdown) -> Result<u64> {
        let local = match self.dest {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| Error::Bind {
                addr: local,
                source,
            })?;

        if let Ok(addr) = socket.local_addr() {
            log::info!("emitting from {} to {}", addr, self.dest);
        }

        let payload = PAYLOAD;
        let mut sent: u64 = 0;

        loop {
            if sent % SHUTDOWN_CHECK_INTERVAL == 0 && shutdown.is_triggered() {
                break;
            }

            socket
                .send_to(&payload, self.dest)
                .await
                .map_err(|source| Error::Send {
                    dest: self.dest,
                    source,
                })?;
            sent += 1;
        }

        log::info!("emitter stopped after {} datagrams", sent);
        Ok(sent)
    }
}
