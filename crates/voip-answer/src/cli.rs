//! Command-line configuration. A 1:1 port of the original `poptOption`
//! table; no flags were added beyond what the source accepted.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "voip-answer", about = "Answers and records SIP/RTP calls")]
pub struct Cli {
    /// External script invoked once per X-Record recipient when a call ends.
    #[arg(long = "rec-script", value_name = "PATH")]
    pub rec_script: Option<PathBuf>,

    /// External script invoked with the recorded WAV path when a program's
    /// `=` suffix (rather than X-Record) triggered the recording.
    #[arg(long = "save-script", value_name = "PATH")]
    pub save_script: Option<PathBuf>,

    /// Address to bind the SIP listening socket to.
    #[arg(long = "bind-host", value_name = "HOST")]
    pub bind_host: Option<String>,

    /// Port or service name for the SIP listening socket.
    #[arg(long = "bind-port", value_name = "PORT", default_value = "sip")]
    pub bind_port: String,

    /// Directory containing playback `.wav` files and where recordings land.
    #[arg(long = "directory", value_name = "PATH", default_value = ".")]
    pub directory: PathBuf,

    /// Raise the default log level to DEBUG.
    #[arg(long)]
    pub debug: bool,

    /// Additionally log full datagram contents at TRACE.
    #[arg(long)]
    pub dump: bool,
}
