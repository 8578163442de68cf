/// Size of a bare RTP header (version 2, no CSRC list, no extension).
pub const HEADER_LEN: usize = 12;

/// PCMA (G.711 A-law), 8 kHz, one channel.
pub const PT_PCMA_MONO: u8 = 8;
/// PCMA, 8 kHz, two channels.
pub const PT_PCMA_STEREO: u8 = 9;
/// RFC 2833 telephone-event.
pub const PT_TELEPHONE_EVENT: u8 = 101;

/// Samples per 20 ms frame at 8 kHz.
pub const FRAME_SAMPLES: usize = 160;

/// A-law code for silence (the sign-magnitude zero pattern).
pub const SILENCE_ALAW: u8 = 0x55;

/// The fixed 12-byte RTP header this program ever emits or inspects. No
/// extension header or CSRC list is produced, and none is expected on
/// inbound packets beyond skipping past the fixed portion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Writes the 12-byte wire form: version 2, no padding, no extension,
    /// no CSRC.
    pub fn encode(&self, out: &mut [u8; HEADER_LEN]) {
        out[0] = 0x80;
        out[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7f);
        out[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        out[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        out[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
    }

    /// Parses a datagram's fixed header, returning the header and the
    /// payload that follows it. `None` if `buf` is shorter than
    /// [`HEADER_LEN`]; callers must drop such datagrams rather than
    /// treat them as zero-length packets.
    pub fn decode(buf: &[u8]) -> Option<(RtpHeader, &[u8])> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let header = RtpHeader {
            marker: buf[1] & 0x80 != 0,
            payload_type: buf[1] & 0x7f,
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        };
        Some((header, &buf[HEADER_LEN..]))
    }
}

/// Maps an RFC 2833 event code to the DTMF key it represents. Only
/// `0`-`9`, `*` (10), and `#` (11) are recognised; every other code
/// (including the A-D codes) is not a call-terminating key here.
pub fn dtmf_key(event: u8) -> Option<char> {
    match event {
        0..=9 => Some((b'0' + event) as char),
        10 => Some('*'),
        11 => Some('#'),
        _ => None,
    }
}
