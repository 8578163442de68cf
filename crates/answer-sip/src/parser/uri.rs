use super::display::skip_display;
use super::whitespace::skip_space;

/// Returns the request-URI atom from the first line of a request, skipping
/// the method name and the spaces that follow it.
pub fn find_request(input: &[u8]) -> Option<&[u8]> {
    let mut i = 0;
    while i < input.len() && input[i].is_ascii_alphabetic() {
        i += 1;
    }
    let after_method = skip_space(&input[i..]);
    let mut j = 0;
    while j < after_method.len() && !super::is_lws(after_method[j]) {
        j += 1;
    }
    if j == 0 {
        None
    } else {
        Some(&after_method[..j])
    }
}

/// Strips an optional `sip:` scheme prefix and returns the range up to
/// (exclusive of) the first `@`. `None` if there is no `@` in `input`.
pub fn find_local(input: &[u8]) -> Option<&[u8]> {
    let stripped = if input.len() >= 4 && input[..4].eq_ignore_ascii_case(b"sip:") {
        &input[4..]
    } else {
        input
    };
    let at = stripped.iter().position(|&b| b == b'@')?;
    Some(&stripped[..at])
}

/// Skips a display name; if a `<...>` form follows, returns the range
/// inside the angle brackets, otherwise the range up to the next `,`.
pub fn find_uri(input: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let after_display = skip_display(input);
    let trimmed = skip_space(after_display);
    if trimmed.first() == Some(&b'<') {
        let body = &trimmed[1..];
        return match body.iter().position(|&b| b == b'>') {
            Some(end) => (Some(&body[..end]), &body[end + 1..]),
            None => (Some(body), &body[body.len()..]),
        };
    }
    let mut end = trimmed
        .iter()
        .position(|&b| b == b',')
        .unwrap_or(trimmed.len());
    if let Some(eol) = trimmed[..end].iter().position(|&b| b == b'\r' || b == b'\n') {
        end = eol;
    }
    if end == 0 {
        (None, trimmed)
    } else {
        (Some(&trimmed[..end]), &trimmed[end..])
    }
}

/// From a URI range, strips any `scheme:`, cuts at the first `;`, discards
/// a `userinfo@` prefix, and returns either an `[IPv6]` literal (brackets
/// included) or a hostname/IPv4 literal.
pub fn find_host(input: &[u8]) -> Option<&[u8]> {
    let mut rest = input;
    if let Some(colon) = rest.iter().position(|&b| b == b':') {
        if colon > 0 && rest[..colon].iter().all(u8::is_ascii_alphabetic) {
            rest = &rest[colon + 1..];
        }
    }
    if let Some(semi) = rest.iter().position(|&b| b == b';') {
        rest = &rest[..semi];
    }
    if let Some(at) = rest.iter().position(|&b| b == b'@') {
        rest = &rest[at + 1..];
    }
    if rest.first() == Some(&b'[') {
        let end = rest.iter().position(|&b| b == b']')?;
        return Some(&rest[..=end]);
    }
    let end = rest
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'.' || b == b'-'))
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(&rest[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_request_skips_method_and_spaces() {
        let line = b"INVITE sip:9999=@host SIP/2.0";
        assert_eq!(find_request(line), Some(&b"sip:9999=@host"[..]));
    }

    #[test]
    fn find_local_strips_scheme_and_stops_at_at_sign() {
        assert_eq!(find_local(b"sip:1234@host"), Some(&b"1234"[..]));
        assert_eq!(find_local(b"no-at-sign"), None);
    }

    #[test]
    fn find_uri_prefers_angle_brackets_over_comma() {
        let (uri, rest) = find_uri(b"Bob <sip:bob@x>;tag=1");
        assert_eq!(uri, Some(&b"sip:bob@x"[..]));
        assert_eq!(rest, b";tag=1");
    }

    #[test]
    fn find_uri_falls_back_to_comma_boundary() {
        let (uri, rest) = find_uri(b"sip:bob@x, sip:carol@y");
        assert_eq!(uri, Some(&b"sip:bob@x"[..]));
        assert_eq!(rest, b", sip:carol@y");
    }

    #[test]
    fn find_host_handles_ipv6_literal_with_port_and_params() {
        assert_eq!(
            find_host(b"sip:user@[2001:db8::1]:5060;lr"),
            Some(&b"[2001:db8::1]"[..])
        );
    }

    #[test]
    fn find_host_handles_plain_hostname() {
        assert_eq!(find_host(b"sip:alice@example.com:5060"), Some(&b"example.com"[..]));
    }
}
