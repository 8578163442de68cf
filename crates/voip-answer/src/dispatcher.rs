//! Classifies inbound datagrams and drives the new-INVITE path: allocating
//! an RTP socket, parsing the embedded playback program, spawning the call
//! task, and sending the provisional/final reply. Grounded on `spec.md`
//! §4.3; the process/task model follows §9's explicit allowance to move
//! from fork-per-call to task-per-call.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use answer_sip::{deescape, find_header, find_list, find_local, find_uri, OutBuf};
use answer_engine::{engine, env::Recipient};

use crate::reply::{self, Direction, RtpOffer};

/// What the dispatcher decided to do with one inbound datagram.
enum Classification<'a> {
    Garbage,
    Response,
    Ack,
    NewInvite,
    OtherRequest(&'a [u8]),
}

fn classify(datagram: &[u8]) -> Classification<'_> {
    let Some(&first) = datagram.first() else {
        return Classification::Garbage;
    };
    if !first.is_ascii_alphabetic() {
        return Classification::Garbage;
    }
    if datagram.starts_with(b"SIP/") {
        return Classification::Response;
    }
    let method_end = datagram.iter().position(|&b| b == b' ').unwrap_or(0);
    if method_end == 0 {
        return Classification::Garbage;
    }
    let method = &datagram[..method_end];
    if method.eq_ignore_ascii_case(b"ACK") {
        return Classification::Ack;
    }
    if method.eq_ignore_ascii_case(b"INVITE") && !reply::has_to_tag(datagram) {
        return Classification::NewInvite;
    }
    Classification::OtherRequest(method)
}

/// Static dispatcher configuration, shared (read-only) across every
/// datagram and call.
pub struct Config {
    pub directory: PathBuf,
    pub rec_script: Option<PathBuf>,
    pub save_script: Option<PathBuf>,
}

/// Handles one received datagram: classifies it and, for requests that
/// need one, sends a reply from `listen_socket`.
pub async fn handle_datagram(
    listen_socket: &UdpSocket,
    datagram: &[u8],
    peer: SocketAddr,
    local_addr: Option<IpAddr>,
    config: &Config,
) {
    match classify(datagram) {
        Classification::Garbage => debug!(?peer, "dropping malformed datagram"),
        Classification::Response | Classification::Ack => {}
        Classification::NewInvite => {
            handle_new_invite(listen_socket, datagram, peer, local_addr, config).await;
        }
        Classification::OtherRequest(method) => {
            send_simple_ok(listen_socket, datagram, peer).await;
            debug!(method = %String::from_utf8_lossy(method), ?peer, "replied 200 OK to in-dialog request");
        }
    }
}

async fn handle_new_invite(
    listen_socket: &UdpSocket,
    datagram: &[u8],
    peer: SocketAddr,
    local_addr: Option<IpAddr>,
    config: &Config,
) {
    let rtp_socket = match UdpSocket::bind(bind_any_like(peer)).await {
        Ok(socket) => socket,
        Err(error) => {
            warn!(%error, "failed to allocate RTP socket; dropping INVITE");
            return;
        }
    };
    let rtp_port = match rtp_socket.local_addr() {
        Ok(addr) => addr.port(),
        Err(error) => {
            warn!(%error, "failed to read back RTP port; dropping INVITE");
            return;
        }
    };

    let program_text = reply::request_local_part(datagram).unwrap_or(b"");
    let mut decoded = vec![0u8; program_text.len()];
    let decoded_len = deescape(program_text, &mut decoded);
    decoded.truncate(decoded_len);
    let program = answer_engine::parse_program(&decoded);
    let nonanswer = program.nonanswer;

    let call_id = find_header(datagram, Some("Call-ID"), Some("i"), None)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default();
    let from = find_header(datagram, Some("From"), Some("f"), None)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default();
    let to = find_header(datagram, Some("To"), Some("t"), None)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default();
    let from_local = find_local_str(from.as_bytes());
    let to_local = find_local_str(to.as_bytes());

    let (x_record_recipients, x_record_params) = find_header(datagram, Some("X-Record"), None, None)
        .map(parse_x_record)
        .unwrap_or_default();

    info!(call_id = %call_id, rtp_port, nonanswer = ?nonanswer, "new INVITE accepted");

    let request = engine::CallRequest {
        rtp_socket,
        program,
        nonanswer,
        call_id: call_id.clone(),
        from,
        to,
        from_local,
        to_local,
        x_record_recipients,
        x_record_params,
        directory: config.directory.clone(),
        rec_script: config.rec_script.clone(),
        save_script: config.save_script.clone(),
    };
    tokio::spawn(async move {
        engine::run(request).await;
    });

    let status_line = if nonanswer.is_some() { "SIP/2.0 183 Call progress" } else { "SIP/2.0 200 OK" };
    let rtp_offer = RtpOffer {
        local_addr: local_addr.unwrap_or_else(|| peer.ip()),
        port: rtp_port,
    };
    let mut storage = [0u8; 2048];
    let mut out = OutBuf::new(&mut storage);
    if let Err(error) = reply::make_reply(&mut out, datagram, Direction::Response { status_line }, Some(&rtp_offer))
    {
        warn!(?error, "reply buffer exhausted building INVITE response; dropping reply");
        return;
    }
    send(listen_socket, out.as_bytes(), peer).await;
}

async fn send_simple_ok(listen_socket: &UdpSocket, datagram: &[u8], peer: SocketAddr) {
    let mut storage = [0u8; 1024];
    let mut out = OutBuf::new(&mut storage);
    if let Err(error) = reply::make_reply(&mut out, datagram, Direction::Response { status_line: "SIP/2.0 200 OK" }, None)
    {
        warn!(?error, "reply buffer exhausted building 200 OK; dropping reply");
        return;
    }
    send(listen_socket, out.as_bytes(), peer).await;
}

async fn send(socket: &UdpSocket, bytes: &[u8], peer: SocketAddr) {
    if let Err(error) = socket.send_to(bytes, peer).await {
        warn!(%error, ?peer, "failed to send reply");
    }
}

fn find_local_str(header_value: &[u8]) -> String {
    let (uri, _) = find_uri(header_value);
    uri.and_then(find_local)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default()
}

/// Binds an ephemeral RTP socket on a wildcard address matching `peer`'s
/// family (v4 peers get a v4 socket, v6 peers a v6 one).
fn bind_any_like(peer: SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => "0.0.0.0:0".parse().unwrap(),
        SocketAddr::V6(_) => "[::]:0".parse().unwrap(),
    }
}

/// Parses the `X-Record` header's comma-separated recipient list into
/// `Recipient`s plus the union of their `;name=value` parameters (the
/// environment variables the engine adds for the handler).
fn parse_x_record(header_value: &[u8]) -> (Vec<Recipient>, HashMap<String, String>) {
    let mut recipients = Vec::new();
    let mut params = HashMap::new();
    let mut rest = header_value;
    loop {
        let (entry, after) = find_list(rest);
        rest = after;
        let Some(entry) = entry else { break };
        let (uri, params_part) = find_uri(entry);
        let Some(uri) = uri else {
            if rest.is_empty() {
                break;
            }
            continue;
        };
        let display_name = answer_sip::find_display(entry).0.map(|v| {
            let mut buf = vec![0u8; v.len()];
            let n = deescape(v, &mut buf);
            buf.truncate(n);
            String::from_utf8_lossy(&buf).into_owned()
        });
        let mut uri_buf = vec![0u8; uri.len()];
        let n = deescape(uri, &mut uri_buf);
        uri_buf.truncate(n);
        recipients.push(Recipient { display_name, uri: String::from_utf8_lossy(&uri_buf).into_owned() });

        for pair in params_part.split(|&b| b == b';').skip(1) {
            if let Some(eq) = pair.iter().position(|&b| b == b'=') {
                let name = String::from_utf8_lossy(&pair[..eq]).into_owned();
                let value = String::from_utf8_lossy(&pair[eq + 1..]).into_owned();
                params.insert(name, value);
            }
        }
        if rest.is_empty() {
            break;
        }
    }
    (recipients, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rejects_non_letter_first_byte() {
        assert!(matches!(classify(b"\x0012345"), Classification::Garbage));
    }

    #[test]
    fn classify_ignores_responses_and_acks() {
        assert!(matches!(classify(b"SIP/2.0 200 OK\r\n"), Classification::Response));
        assert!(matches!(classify(b"ACK sip:x@y SIP/2.0\r\n"), Classification::Ack));
    }

    #[test]
    fn classify_detects_fresh_invite() {
        let invite = b"INVITE sip:1234@host SIP/2.0\r\nTo: <sip:1234@host>\r\n\r\n";
        assert!(matches!(classify(invite), Classification::NewInvite));
    }

    #[test]
    fn classify_treats_tagged_invite_as_in_dialog() {
        let reinvite = b"INVITE sip:1234@host SIP/2.0\r\nTo: <sip:1234@host>;tag=abc\r\n\r\n";
        assert!(matches!(classify(reinvite), Classification::OtherRequest(_)));
    }

    #[test]
    fn parses_single_recipient_with_param() {
        let (recipients, params) = parse_x_record(br#""Alice" <mailto:alice@x>;project=demo"#);
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].display_name.as_deref(), Some("Alice"));
        assert_eq!(recipients[0].uri, "mailto:alice@x");
        assert_eq!(params.get("project"), Some(&"demo".to_string()));
    }

    #[test]
    fn parses_multiple_recipients() {
        let (recipients, _) = parse_x_record(br#""Alice" <mailto:a@x>, "Bob" <mailto:b@x>"#);
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[1].uri, "mailto:b@x");
    }
}
