use std::io;
use std::net::SocketAddr;

/// Every way a `saturate` process can stop. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("host {host} resolved to no address")]
    NoAddress { host: String },

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("send to {dest} failed: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("receive on {addr} failed: {source}")]
    Recv {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("could not write report: {0}")]
    Output(#[source] io::Error),

    #[error("something weird and wrong, this should never happen: {0}")]
    Invariant(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Resolve { .. } | Error::NoAddress { .. } | Error::Bind { .. }
        )
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_config() {
            2
        } else if self.is_invariant() {
            70
        } else {
            1
        }
    }

    /// Prints the error to stdout and ends the process with `exit_code`.
    pub fn exit(self) -> ! {
        println!("\n{}\n", self);
        std::process::exit(self.exit_code())
    }
}
