//! UDP saturation pair: `emit` floods a destination with one-byte datagrams,
//! `listen` counts what arrives and prints packets per second.

pub mod config;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod reporter;
pub mod shutdown;
pub mod supervisor;

pub use config::{EmitterConfig, ListenerConfig, RateBasis, ReporterConfig};
pub use emitter::Emitter;
pub use error::{Error, Result};
pub use listener::Listener;
pub use reporter::{Reporter, Sample};
pub use shutdown::Shutdown;
pub use supervisor::Supervisor;
