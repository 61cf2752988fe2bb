use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use saturate_common::{DEFAULT_LISTEN_PORT, DEFAULT_POLLING_PERIOD};

use crate::error::{Error, Result};

/// Where the emitter sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterConfig {
    pub host: String,
    pub port: u16,
}

impl EmitterConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolves `host` and takes the first address it yields.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|source| Error::Resolve {
                host: self.host.clone(),
                source,
            })?;
        addrs.next().ok_or_else(|| Error::NoAddress {
            host: self.host.clone(),
        })
    }
}

/// Local address one listener binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl ListenerConfig {
    pub fn new(bind: IpAddr, port: u16) -> Self {
        Self { bind, port }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_LISTEN_PORT)
    }
}

/// What the reporter divides a period's delta by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RateBasis {
    /// The configured period, whatever the scheduler actually slept.
    #[default]
    Nominal,
    /// Wall-clock time measured between two wakes.
    Elapsed,
}

impl fmt::Display for RateBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateBasis::Nominal => f.write_str("nominal"),
            RateBasis::Elapsed => f.write_str("elapsed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterConfig {
    pub period: Duration,
    pub basis: RateBasis,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_POLLING_PERIOD,
            basis: RateBasis::Nominal,
        }
    }
}
