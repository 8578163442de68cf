//! Builds outbound SIP messages from an inbound one: `make_reply` mirrors
//! the original's nested `make_reply`/`send_reply` helpers as an explicit
//! function operating on borrowed ranges, per `SPEC_FULL.md` §9.

use std::net::IpAddr;

use answer_sip::{find_header, find_local, find_request, find_uri, ComposeError, OutBuf};

/// What kind of outbound message `make_reply` is building.
pub enum Direction<'a> {
    /// A response to the inbound request (`reverse = false` in `spec.md`
    /// §4.4): `Via`/`From`/`To`/`CSeq` are copied verbatim from the inbound
    /// message.
    Response { status_line: &'a str },
    /// An originated request — BYE or REFER (`reverse = true`): a single
    /// dummy `Via` is emitted, `From`/`To` are swapped, and the caller
    /// supplies a fresh `CSeq`.
    Request { request_line: &'a str, cseq: &'a str },
}

/// Describes the RTP leg to offer in SDP, when one has been allocated for
/// this call.
pub struct RtpOffer {
    pub local_addr: IpAddr,
    pub port: u16,
}

/// Builds the outbound message into `out`. `inbound` is the original
/// datagram this message answers or originates from (its `Via`/`From`/`To`/
/// `Call-ID` are the source of truth either way).
pub fn make_reply(
    out: &mut OutBuf<'_>,
    inbound: &[u8],
    direction: Direction<'_>,
    rtp: Option<&RtpOffer>,
) -> Result<(), ComposeError> {
    match &direction {
        Direction::Response { status_line } => {
            out.start_line(status_line.as_bytes())?;
            let mut prev = None;
            while let Some(via) = find_header(inbound, Some("Via"), Some("v"), prev) {
                out.add_header("Via", via)?;
                prev = Some(via);
            }
        }
        Direction::Request { request_line, .. } => {
            out.start_line(request_line.as_bytes())?;
            out.add_header("Via", b"SIP/2.0/UDP 0.0.0.0:5060")?;
        }
    }

    let from = find_header(inbound, Some("From"), Some("f"), None);
    let to = find_header(inbound, Some("To"), Some("t"), None);

    let (new_from, new_to) = match direction {
        Direction::Response { .. } => (from, to),
        Direction::Request { .. } => (to, from),
    };

    if let Some(value) = new_from {
        out.add_header("From", value)?;
    }
    if let Some(value) = new_to {
        let value_start = out.add_header("To", value)?;
        if let Some(rtp) = rtp {
            let port = rtp.port.to_string();
            out.add_extra("tag", port.as_bytes(), b';', false, false)?;
        }
        let _ = value_start;
    }

    if let Some(call_id) = find_header(inbound, Some("Call-ID"), Some("i"), None) {
        out.add_header("Call-ID", call_id)?;
    }

    match direction {
        Direction::Response { .. } => {
            if let Some(cseq) = find_header(inbound, Some("CSeq"), None, None) {
                out.add_header("CSeq", cseq)?;
            }
        }
        Direction::Request { cseq, .. } => {
            out.add_header("CSeq", cseq.as_bytes())?;
        }
    }

    if let Some(rtp) = rtp {
        let body = build_sdp(rtp);
        out.add_header("Content-Type", b"application/sdp")?;
        out.add_header("Content-Length", body.len().to_string().as_bytes())?;
        out.end_headers()?;
        out.add_body(body.as_bytes())?;
    } else {
        out.add_header("Content-Length", b"0")?;
        out.end_headers()?;
    }

    Ok(())
}

/// Builds the SDP body offering PCMA mono (PT 8), PCMA stereo (PT 9), and
/// telephone-event 0-16 (PT 101), `ptime:20`, `sendrecv`.
fn build_sdp(rtp: &RtpOffer) -> String {
    let (addrtype, addr) = match rtp.local_addr {
        IpAddr::V4(v4) => ("IP4", v4.to_string()),
        IpAddr::V6(v6) => ("IP6", v6.to_string()),
    };
    format!(
        "v=0\r\n\
         o=- 0 0 IN {addrtype} {addr}\r\n\
         s=voip-answer\r\n\
         c=IN {addrtype} {addr}\r\n\
         t=0 0\r\n\
         m=audio {port} RTP/AVP 8 9 101\r\n\
         a=rtpmap:8 PCMA/8000\r\n\
         a=rtpmap:9 PCMA/8000\r\n\
         a=rtpmap:101 telephone-event/8000\r\n\
         a=fmtp:101 0-16\r\n\
         a=ptime:20\r\n\
         a=sendrecv\r\n",
        port = rtp.port,
    )
}

/// Extracts the local part of the request URI — the embedded playback
/// program — from an INVITE's first line.
pub fn request_local_part(inbound: &[u8]) -> Option<&[u8]> {
    let request_uri = find_request(inbound)?;
    find_local(request_uri)
}

/// Returns `true` when the `To` header on `inbound` already carries a `tag`
/// parameter, meaning this is a re-INVITE or other in-dialog request rather
/// than a fresh call.
pub fn has_to_tag(inbound: &[u8]) -> bool {
    let Some(to) = find_header(inbound, Some("To"), Some("t"), None) else {
        return false;
    };
    let (_, rest) = find_uri(to);
    answer_sip::find_semi(rest, "tag").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &[u8] = b"INVITE sip:1234@host SIP/2.0\r\n\
Via: SIP/2.0/UDP peer:5060\r\n\
From: <sip:alice@peer>;tag=abc\r\n\
To: <sip:1234@host>\r\n\
Call-ID: xyz\r\n\
CSeq: 1 INVITE\r\n\
Contact: <sip:alice@peer:5060>\r\n\
\r\n";

    #[test]
    fn response_copies_via_from_to_and_appends_rtp_tag() {
        let mut storage = [0u8; 1024];
        let mut out = OutBuf::new(&mut storage);
        let rtp = RtpOffer { local_addr: "10.0.0.1".parse().unwrap(), port: 40000 };
        make_reply(
            &mut out,
            INVITE,
            Direction::Response { status_line: "SIP/2.0 200 OK" },
            Some(&rtp),
        )
        .unwrap();
        let text = String::from_utf8_lossy(out.as_bytes());
        assert!(text.starts_with("SIP/2.0 200 OK\r\n"));
        assert!(text.contains("Via: SIP/2.0/UDP peer:5060\r\n"));
        assert!(text.contains("To: <sip:1234@host>;tag=40000\r\n"));
        assert!(text.contains("m=audio 40000 RTP/AVP 8 9 101"));
    }

    #[test]
    fn request_swaps_from_and_to() {
        let mut storage = [0u8; 1024];
        let mut out = OutBuf::new(&mut storage);
        make_reply(
            &mut out,
            INVITE,
            Direction::Request { request_line: "BYE sip:alice@peer SIP/2.0", cseq: "2 BYE" },
            None,
        )
        .unwrap();
        let text = String::from_utf8_lossy(out.as_bytes());
        assert!(text.contains("From: <sip:1234@host>\r\n"));
        assert!(text.contains("To: <sip:alice@peer>;tag=abc\r\n"));
        assert!(text.contains("CSeq: 2 BYE\r\n"));
    }

    #[test]
    fn has_to_tag_detects_in_dialog_requests() {
        assert!(!has_to_tag(INVITE));
        let tagged = INVITE.replace("To: <sip:1234@host>", "To: <sip:1234@host>;tag=def");
        assert!(has_to_tag(tagged.as_bytes()));
    }

    #[test]
    fn request_local_part_extracts_program() {
        let invite = b"INVITE sip:9999=@host SIP/2.0\r\n\r\n";
        assert_eq!(request_local_part(invite), Some(&b"9999="[..]));
    }
}
