use std::net::SocketAddr;
use std::sync::Arc;

use saturate_common::{PacketCounter, RECV_BUFFER_LEN};
use tokio::net::UdpSocket;

use crate::config::ListenerConfig;
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

/// Receive loop on one UDP port. Every datagram bumps the shared counter.
///
/// Several listeners may share one counter to measure aggregate throughput
/// across ports.
#[derive(Debug)]
pub struct Listener {
    socket: UdpSocket,
    addr: SocketAddr,
    counter: Arc<PacketCounter>,
}

impl Listener {
    pub async fn bind(config: ListenerConfig, counter: Arc<PacketCounter>) -> Result<Self> {
        let requested = config.addr();
        let socket = UdpSocket::bind(requested)
            .await
            .map_err(|source| Error::Bind {
                addr: requested,
                source,
            })?;
        // Port 0 binds an ephemeral port; report the real one.
        let addr = socket.local_addr().map_err(|source| Error::Bind {
            addr: requested,
            source,
        })?;

        Ok(Self {
            socket,
            addr,
            counter,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        log::info!("listening on {}", self.addr);

        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        let stop = shutdown.wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => {
                    log::info!("listener on {} stopped", self.addr);
                    return Ok(());
                }
                res = self.socket.recv(&mut buf) => {
                    // Content and length are irrelevant, arrival is the signal.
                    res.map_err(|source| Error::Recv {
                        addr: self.addr,
                        source,
                    })?;
                    self.counter.increment();
                }
            }
        }
    }
}
