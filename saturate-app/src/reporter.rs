use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use saturate_common::{packets_per_second, report_line, PacketCounter};
use tokio::time::Instant;

use crate::config::{RateBasis, ReporterConfig};
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

/// One polling period's measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Counter value read at the end of the period.
    pub current: u64,
    pub delta: u64,
    pub elapsed: Duration,
    pub rate: f64,
}

/// Turns the cumulative packet count into a rate once per period.
#[derive(Debug)]
pub struct Reporter {
    counter: Arc<PacketCounter>,
    config: ReporterConfig,
    previous: u64,
}

impl Reporter {
    pub fn new(counter: Arc<PacketCounter>, config: ReporterConfig) -> Self {
        Self {
            counter,
            config,
            previous: 0,
        }
    }

    pub fn previous(&self) -> u64 {
        self.previous
    }

    /// Reads the counter once and advances the baseline to that value.
    ///
    /// `elapsed` is the measured time since the last measurement; it is only
    /// the divisor under `RateBasis::Elapsed`.
    pub fn measure(&mut self, elapsed: Duration) -> Result<Sample> {
        let current = self.counter.get();
        let delta = current
            .checked_sub(self.previous)
            .ok_or(Error::Invariant("packet counter went backwards"))?;

        let secs = match self.config.basis {
            RateBasis::Nominal => self.config.period.as_secs_f64(),
            RateBasis::Elapsed => elapsed.as_secs_f64(),
        };
        if secs <= 0.0 {
            return Err(Error::Invariant("polling period measured as zero"));
        }

        self.previous = current;
        Ok(Sample {
            current,
            delta,
            elapsed,
            rate: packets_per_second(delta, secs),
        })
    }

    /// Sleeps one period, measures, writes one line to `out`, forever.
    ///
    /// Only returns `Ok` once `shutdown` fires.
    pub async fn run<W: Write>(&mut self, out: &mut W, shutdown: Shutdown) -> Result<()> {
        log::info!(
            "reporting every {}s ({} rate)",
            self.config.period.as_secs_f64(),
            self.config.basis
        );

        let stop = shutdown.wait();
        tokio::pin!(stop);
        let mut last = Instant::now();

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => {
                    log::info!("reporter stopped at {} packets", self.previous);
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.period) => {}
            }

            let now = Instant::now();
            let sample = self.measure(now.duration_since(last))?;
            last = now;

            log::debug!(
                "delta={} total={} elapsed={:?}",
                sample.delta,
                sample.current,
                sample.elapsed
            );
            writeln!(out, "{}", report_line(sample.rate)).map_err(Error::Output)?;
            out.flush().map_err(Error::Output)?;
        }
    }
}
