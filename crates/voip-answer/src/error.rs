//! Typed startup errors. Per-datagram and per-call failures are handled
//! inline (dropped or skipped, per `spec.md` §7) and never reach this type —
//! it exists for the fallible paths that precede the listener's main loop.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind SIP socket on {host}:{port}: {source}")]
    Bind {
        host: String,
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("playback directory {0} does not exist or is not a directory")]
    Directory(PathBuf),

    #[error("cannot parse {0:?} as a bind address")]
    BindHost(String),

    #[error("configured script {0} does not exist")]
    MissingScript(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
