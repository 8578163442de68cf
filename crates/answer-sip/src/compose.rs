//! Message composition into a caller-owned, fixed-capacity buffer.
//!
//! Nothing here grows the buffer: every append is checked against the
//! remaining capacity before a single byte is written, so a failed append
//! never leaves a partial line behind.

use std::fmt;

/// The output buffer ran out of room for an append. The buffer is left
/// exactly as it was before the call that returned this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeError;

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("output buffer exhausted")
    }
}

impl std::error::Error for ComposeError {}

/// A bounded, append-only output buffer for a single SIP message.
pub struct OutBuf<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> OutBuf<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        OutBuf { buf, len: 0 }
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    fn push(&mut self, bytes: &[u8]) {
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    /// `true` if `extra` more bytes fit while still leaving room for the
    /// CRLF that terminates the header block.
    fn fits(&self, extra: usize) -> bool {
        self.remaining() >= extra + 2
    }

    /// Appends a request-line or status-line; `line` must not include the
    /// terminating CRLF.
    pub fn start_line(&mut self, line: &[u8]) -> Result<(), ComposeError> {
        if !self.fits(line.len() + 2) {
            return Err(ComposeError);
        }
        self.push(line);
        self.push(b"\r\n");
        Ok(())
    }

    /// Emits `"<name>: <value>\r\n"`. Returns the start offset of the
    /// emitted value within [`as_bytes`] on success.
    pub fn add_header(&mut self, name: &str, value: &[u8]) -> Result<usize, ComposeError> {
        let body = name.len() + 2 + value.len() + 2;
        if !self.fits(body) {
            return Err(ComposeError);
        }
        self.push(name.as_bytes());
        self.push(b": ");
        let value_start = self.len;
        self.push(value);
        self.push(b"\r\n");
        Ok(value_start)
    }

    /// Same as [`add_header`](Self::add_header), wrapping the value in `<...>`.
    pub fn add_header_angle(&mut self, name: &str, value: &[u8]) -> Result<usize, ComposeError> {
        let body = name.len() + 2 + 1 + value.len() + 1 + 2;
        if !self.fits(body) {
            return Err(ComposeError);
        }
        self.push(name.as_bytes());
        self.push(b": <");
        let value_start = self.len;
        self.push(value);
        self.push(b">\r\n");
        Ok(value_start)
    }

    /// Appends `tag=value` to the most recently emitted header, rewinding
    /// over its terminating CRLF first. `sep` is inserted before the new
    /// chunk unless the preceding byte is already a space or `:`. When
    /// `sep` is `,` and `wrap` is set, a chunk that would push the current
    /// line past column 120 instead starts a folded continuation line
    /// (`\r\n\t`). `quote` surrounds the value with `"`.
    pub fn add_extra(
        &mut self,
        tag: &str,
        value: &[u8],
        sep: u8,
        quote: bool,
        wrap: bool,
    ) -> Result<(), ComposeError> {
        if self.len < 2 {
            return Err(ComposeError);
        }
        let content_len = self.len - 2; // rewind over the previous CRLF
        let prev = if content_len > 0 { self.buf[content_len - 1] } else { b'\0' };
        let need_sep = !matches!(prev, b' ' | b':');

        let body_len = tag.len() + 1 + value.len() + if quote { 2 } else { 0 };
        let line_start = self.buf[..content_len]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |p| p + 1);
        let column = content_len - line_start;
        let sep_len = usize::from(need_sep);
        let fold = sep == b',' && wrap && column + sep_len + body_len > 120;

        let needed = sep_len + if fold { 3 } else { 0 } + body_len + 2 + 1; // + CRLF + NUL sentinel
        if self.buf.len() - content_len < needed {
            return Err(ComposeError);
        }

        self.len = content_len;
        if need_sep {
            self.push(&[sep]);
        }
        if fold {
            self.push(b"\r\n\t");
        }
        self.push(tag.as_bytes());
        self.push(b"=");
        if quote {
            self.push(b"\"");
            self.push(value);
            self.push(b"\"");
        } else {
            self.push(value);
        }
        self.push(b"\r\n");
        if self.len < self.buf.len() {
            self.buf[self.len] = 0; // sentinel for logging, not counted in as_bytes
        }
        Ok(())
    }

    /// Appends the blank line that ends the header block (and, if a body
    /// follows, separates it from the headers).
    pub fn end_headers(&mut self) -> Result<(), ComposeError> {
        if self.remaining() < 2 {
            return Err(ComposeError);
        }
        self.push(b"\r\n");
        Ok(())
    }

    /// Appends raw body bytes verbatim (used for the SDP body).
    pub fn add_body(&mut self, body: &[u8]) -> Result<(), ComposeError> {
        if self.remaining() < body.len() {
            return Err(ComposeError);
        }
        self.push(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_header_then_end_headers_is_valid_block() {
        let mut storage = [0u8; 256];
        let mut out = OutBuf::new(&mut storage);
        out.add_header("Call-ID", b"abc123").unwrap();
        out.add_header("CSeq", b"1 INVITE").unwrap();
        out.end_headers().unwrap();
        assert_eq!(
            out.as_bytes(),
            b"Call-ID: abc123\r\nCSeq: 1 INVITE\r\n\r\n".as_slice()
        );
    }

    #[test]
    fn add_extra_inserts_separator_and_rewinds_crlf() {
        let mut storage = [0u8; 256];
        let mut out = OutBuf::new(&mut storage);
        out.add_header("To", b"<sip:bob@host>").unwrap();
        out.add_extra("tag", b"5060", b';', false, false).unwrap();
        assert_eq!(out.as_bytes(), b"To: <sip:bob@host>;tag=5060\r\n".as_slice());
    }

    #[test]
    fn add_extra_skips_separator_after_colon_or_space() {
        let mut storage = [0u8; 256];
        let mut out = OutBuf::new(&mut storage);
        out.add_header("Contact", b"sip:a@b ").unwrap();
        out.add_extra("q", b"1", b';', false, false).unwrap();
        assert_eq!(out.as_bytes(), b"Contact: sip:a@b q=1\r\n".as_slice());
    }

    #[test]
    fn add_extra_quotes_value_when_requested() {
        let mut storage = [0u8; 256];
        let mut out = OutBuf::new(&mut storage);
        out.add_header("X", b"base").unwrap();
        out.add_extra("name", b"Alice", b';', true, false).unwrap();
        assert_eq!(out.as_bytes(), b"X: base;name=\"Alice\"\r\n".as_slice());
    }

    #[test]
    fn add_extra_folds_past_column_120() {
        let mut storage = [0u8; 512];
        let mut out = OutBuf::new(&mut storage);
        let long_value = [b'a'; 110];
        out.add_header("Allow-Events", &long_value).unwrap();
        out.add_extra("x", b"1", b',', false, true).unwrap();
        let text = out.as_bytes();
        assert!(text.windows(3).any(|w| w == b"\r\n\t"));
        let last_line_len = text.len() - text.iter().rposition(|&b| b == b'\n').unwrap() - 1;
        assert!(last_line_len <= 120);
    }

    #[test]
    fn overflow_is_detected_before_any_bytes_are_written() {
        let mut storage = [0u8; 10];
        let mut out = OutBuf::new(&mut storage);
        let before = out.len;
        assert_eq!(out.add_header("Via", b"SIP/2.0/UDP 1.2.3.4:5060"), Err(ComposeError));
        assert_eq!(out.len, before);
    }
}
