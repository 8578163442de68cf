//! Byte-range scanners: "find a range within a range" primitives over a
//! borrowed SIP message buffer. Every function here is pure and allocates
//! nothing; a missing result is `None`, never a sentinel index.

mod display;
mod headers;
mod numeric;
mod params;
mod uri;
mod whitespace;

pub use display::{find_display, skip_display};
pub use headers::find_header;
pub use numeric::read_unsigned;
pub use params::{find_comma, find_list, find_semi};
pub use uri::{find_host, find_local, find_request, find_uri};
pub use whitespace::skip_space;

/// RFC 3261 `token` characters beyond alphanumerics.
const TOKEN_EXTRA: &[u8] = b"-.!%*_+`'~";

pub(crate) fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || TOKEN_EXTRA.contains(&b)
}

pub(crate) fn is_lws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}
