//! Entry point: parses CLI configuration, binds the SIP listener, and runs
//! the dispatch loop until killed. There is no normal shutdown path — the
//! process runs until terminated, per `spec.md` §6.

mod cli;
mod dispatcher;
mod error;
mod logging;
mod pktinfo;
mod reply;

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use clap::Parser;
use tokio::net::UdpSocket;
use tracing::info;

use cli::Cli;
use dispatcher::Config;
use error::Error;

fn resolve_port(spec: &str) -> anyhow::Result<u16> {
    if let Ok(port) = spec.parse::<u16>() {
        return Ok(port);
    }
    match spec {
        "sip" => Ok(5060),
        "sips" => Ok(5061),
        other => anyhow::bail!("unknown service name {other:?}; pass a numeric port"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug, cli.dump);

    if !cli.directory.is_dir() {
        return Err(Error::Directory(cli.directory.clone())).context("validating --directory");
    }
    for script in [&cli.rec_script, &cli.save_script].into_iter().flatten() {
        if !script.is_file() {
            return Err(Error::MissingScript(script.clone())).context("validating handler script path");
        }
    }

    let port = resolve_port(&cli.bind_port)?;
    let host = cli.bind_host.clone().unwrap_or_else(|| "::".to_string());
    let bind_addr: SocketAddr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => format!("{host}:{port}")
            .parse()
            .map_err(|_| Error::BindHost(host.clone()))
            .context("parsing --bind-host")?,
    };

    let listen_socket = UdpSocket::bind(bind_addr).await.map_err(|source| Error::Bind {
        host: host.clone(),
        port: cli.bind_port.clone(),
        source,
    })?;
    pktinfo::enable(&listen_socket, bind_addr.is_ipv6())
        .context("enabling PKTINFO destination-address recovery")?;

    info!(%bind_addr, directory = %cli.directory.display(), "voip-answer listening");

    let config = Config {
        directory: cli.directory,
        rec_script: cli.rec_script,
        save_script: cli.save_script,
    };

    let mut buf = vec![0u8; 2048];
    loop {
        let received = match pktinfo::recv(&listen_socket, &mut buf).await {
            Ok(received) => received,
            Err(error) => {
                tracing::warn!(%error, "recv error on SIP socket");
                continue;
            }
        };
        dispatcher::handle_datagram(
            &listen_socket,
            &buf[..received.len],
            received.peer,
            received.local_addr,
            &config,
        )
        .await;
    }
}
