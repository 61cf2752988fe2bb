use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

pub const IDLE_TICK: Duration = Duration::from_secs(1);

/// Sets the returned flag on SIGINT or SIGTERM.
pub fn register_signals() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&term))?;
    Ok(term)
}

/// Keeps the process alive while the worker tasks run, and turns the first
/// failure of any of them into the process result.
pub struct Supervisor {
    tasks: JoinSet<(String, Result<()>)>,
    shutdown: Shutdown,
    term: Arc<AtomicBool>,
    tick: Duration,
}

impl Supervisor {
    pub fn new(shutdown: Shutdown, term: Arc<AtomicBool>) -> Self {
        Self {
            tasks: JoinSet::new(),
            shutdown,
            term,
            tick: IDLE_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Idles until a task stops or `term` is set.
    ///
    /// Workers never stop by themselves, so any task that finishes before a
    /// shutdown was requested ends the run with an error, the moment it does.
    pub async fn run(mut self) -> Result<()> {
        let mut idle = tokio::time::interval(self.tick);

        loop {
            let joined = tokio::select! {
                _ = idle.tick() => {
                    if !self.term.load(Ordering::Relaxed) {
                        continue;
                    }
                    None
                }
                Some(joined) = self.tasks.join_next() => Some(joined),
            };

            let Some(joined) = joined else {
                log::info!("shutdown requested");
                self.shutdown.trigger();
                return self.drain().await;
            };

            let err = match joined {
                Ok((name, Err(e))) => {
                    log::error!("{}: {}", name, e);
                    e
                }
                Ok((name, Ok(()))) => {
                    let e = Error::Invariant("task exited without a shutdown request");
                    log::error!("{}: {}", name, e);
                    e
                }
                Err(e) => {
                    log::error!("task died: {}", e);
                    Error::Invariant("task panicked or was cancelled")
                }
            };
            self.shutdown.trigger();
            return Err(err);
        }
    }

    async fn drain(mut self) -> Result<()> {
        let mut first = None;
        while let Some(joined) = self.tasks.join_next().await {
            let err = match joined {
                Ok((_, Ok(()))) => continue,
                Err(e) if e.is_cancelled() => continue,
                Ok((name, Err(e))) => {
                    log::error!("{}: {}", name, e);
                    e
                }
                Err(e) => {
                    log::error!("task died: {}", e);
                    Error::Invariant("task panicked during shutdown")
                }
            };
            first.get_or_insert(err);
        }
        first.map_or(Ok(()), Err)
    }
}
