use anyhow::Context;
use clap::Parser;
use saturate_app::{supervisor, Emitter, EmitterConfig, Shutdown, Supervisor};

/// Floods a UDP destination with one-byte datagrams, as fast as the local
/// stack allows.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Destination host name or address
    host: String,

    /// Destination UDP port
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // An unresolvable host ends the process before a single datagram is sent.
    let config = EmitterConfig::new(args.host, args.port);
    let emitter = Emitter::resolve(&config).await.unwrap_or_else(|e| e.exit());

    let term = supervisor::register_signals().context("Failed to register signal handlers")?;
    let shutdown = Shutdown::new();
    let mut sup = Supervisor::new(shutdown.clone(), term);

    sup.spawn("emitter", async move {
        emitter.run(shutdown).await.map(|sent| {
            log::debug!("{} datagrams sent in total", sent);
        })
    });

    if let Err(e) = sup.run().await {
        e.exit();
    }

    Ok(())
}
