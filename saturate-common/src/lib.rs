//! Pieces shared by the `emit` and `listen` processes: the packet counter,
//! the wire payload and the throughput arithmetic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// The whole datagram body. Its value is never looked at on either side.
pub const PAYLOAD: [u8; 1] = [0];

pub const DEFAULT_LISTEN_PORT: u16 = 35610;

pub const DEFAULT_POLLING_PERIOD: Duration = Duration::from_secs(10);

/// Largest UDP payload, so a datagram of any length is accepted.
pub const RECV_BUFFER_LEN: usize = 65_535;

/// Count of datagrams received, shared by every receive loop and the
/// reporter of one process.
///
/// Only ever goes up by one. Never reset.
#[derive(Debug, Default)]
pub struct PacketCounter {
    count: AtomicU64,
}

impl PacketCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot; may race with concurrent increments.
    #[inline]
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Packets per second for `delta` packets observed over `secs` seconds.
pub fn packets_per_second(delta: u64, secs: f64) -> f64 {
    delta as f64 / secs
}

/// The line printed once per polling period, e.g. `20.0 packets per second`.
///
/// Rates in `[1e-3, 1e7)` and zero print in plain decimal with at least one
/// fractional digit. Anything else uses `<mantissa>E<exp>` with the same rule
/// for the mantissa, so `1e7` prints as `1.0E7`.
pub fn report_line(rate: f64) -> String {
    format!("{} packets per second", format_rate(rate))
}

fn format_rate(rate: f64) -> String {
    let magnitude = rate.abs();
    if rate == 0.0 || !rate.is_finite() || (1e-3..1e7).contains(&magnitude) {
        return format!("{rate:?}");
    }

    let sci = format!("{rate:e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) if mantissa.contains('.') => format!("{mantissa}E{exp}"),
        Some((mantissa, exp)) => format!("{mantissa}.0E{exp}"),
        None => sci,
    }
}
