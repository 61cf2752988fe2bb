use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use saturate_app::{
    supervisor, Listener, ListenerConfig, RateBasis, Reporter, ReporterConfig, Shutdown,
    Supervisor,
};
use saturate_common::{PacketCounter, DEFAULT_LISTEN_PORT};

/// Counts UDP datagrams and prints the rate every polling period.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// UDP port to count on. Repeat it to run several listeners that share
    /// one counter
    #[arg(short, long = "port", default_values_t = [DEFAULT_LISTEN_PORT])]
    ports: Vec<u16>,

    /// Local address to bind
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Seconds between two throughput lines
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    period_secs: u64,

    /// Divide by the configured period or by the measured time between wakes
    #[arg(long, value_enum, default_value_t = RateBasis::Nominal)]
    rate_basis: RateBasis,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let counter = Arc::new(PacketCounter::new());
    let shutdown = Shutdown::new();

    let mut listeners = Vec::with_capacity(args.ports.len());
    for port in args.ports {
        let config = ListenerConfig::new(args.bind, port);
        let listener = Listener::bind(config, Arc::clone(&counter))
            .await
            .unwrap_or_else(|e| e.exit());
        listeners.push(listener);
    }

    let term = supervisor::register_signals().context("Failed to register signal handlers")?;
    let mut sup = Supervisor::new(shutdown.clone(), term);

    for listener in listeners {
        let name = format!("listener {}", listener.local_addr());
        sup.spawn(name, listener.run(shutdown.clone()));
    }

    let mut reporter = Reporter::new(
        counter,
        ReporterConfig {
            period: Duration::from_secs(args.period_secs),
            basis: args.rate_basis,
        },
    );
    let stop = shutdown.clone();
    sup.spawn("reporter", async move {
        let mut out = std::io::stdout();
        reporter.run(&mut out, stop).await
    });

    if let Err(e) = sup.run().await {
        e.exit();
    }

    Ok(())
}
