use super::{is_token_char, whitespace::skip_space};

/// Parses a quoted-string or bare-token display name at the head of
/// `input`, returning its content (quotes stripped) and what follows it.
///
/// A quoted string (`"..."`, with `\`-escapes) is always accepted whole.
/// A bare token sequence is accepted atom-by-atom only while a further
/// atom follows it separated by whitespace — the last whitespace-separated
/// atom on the line is left untouched for the URI/host parser, since it is
/// the actual address rather than part of the display name.
fn scan(input: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let trimmed = skip_space(input);
    if trimmed.first() == Some(&b'"') {
        return quoted(trimmed);
    }
    tokens(trimmed)
}

fn quoted(input: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let body = &input[1..];
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' if i + 1 < body.len() => i += 2,
            b'"' => return (Some(&body[..i]), &body[i + 1..]),
            _ => i += 1,
        }
    }
    (Some(body), &body[body.len()..])
}

fn tokens(input: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let mut cursor = input;
    let mut accepted_end = 0usize;
    let mut accepted_any = false;

    loop {
        let atom_start = input.len() - cursor.len();
        let mut j = 0;
        while j < cursor.len() && is_token_char(cursor[j]) {
            j += 1;
        }
        if j == 0 {
            break;
        }
        let after_atom = &cursor[j..];
        let after_gap = skip_space(after_atom);
        let gap_len = after_atom.len() - after_gap.len();
        if gap_len == 0 || after_gap.is_empty() {
            // No whitespace gap, or nothing follows: this atom is the
            // final one on the line and is left for the URI/host parser.
            break;
        }
        accepted_end = atom_start + j;
        accepted_any = true;
        cursor = after_gap;
    }

    if !accepted_any {
        return (None, input);
    }
    (Some(&input[..accepted_end]), &input[accepted_end..])
}

/// Returns the display-name content, if any, and the remaining input.
pub fn find_display(input: &[u8]) -> (Option<&[u8]>, &[u8]) {
    scan(input)
}

/// Advances past a display name, discarding its content.
pub fn skip_display(input: &[u8]) -> &[u8] {
    scan(input).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_display_name_strips_quotes_and_unescapes_nothing() {
        let (name, rest) = find_display(br#""Alice Doe" <sip:alice@x>"#);
        assert_eq!(name, Some(&b"Alice Doe"[..]));
        assert_eq!(rest, b" <sip:alice@x>");
    }

    #[test]
    fn bare_token_display_name_leaves_final_atom() {
        let (name, rest) = find_display(b"Bob Smith <sip:bob@x.com>");
        assert_eq!(name, Some(&b"Bob Smith"[..]));
        assert_eq!(rest, b" <sip:bob@x.com>");
    }

    #[test]
    fn no_display_name_when_only_one_atom() {
        let (name, rest) = find_display(b"sip:bob@x.com");
        assert_eq!(name, None);
        assert_eq!(rest, b"sip:bob@x.com");
    }

    #[test]
    fn angle_uri_with_no_display_name() {
        let (name, rest) = find_display(b"<sip:bob@x.com>");
        assert_eq!(name, None);
        assert_eq!(rest, b"<sip:bob@x.com>");
    }
}
