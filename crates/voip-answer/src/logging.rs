//! Structured logging setup: `tracing` + `tracing-subscriber` with an
//! `EnvFilter` seeded from `RUST_LOG`, the `--debug` flag raising the
//! default level and `--dump` additionally enabling datagram-content traces.

use tracing_subscriber::EnvFilter;

pub fn init(debug: bool, dump: bool) {
    let default_directive = if dump {
        "voip_answer=trace,answer_engine=trace,answer_sip=trace"
    } else if debug {
        "voip_answer=debug,answer_engine=debug,answer_sip=info"
    } else {
        "voip_answer=info,answer_engine=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
