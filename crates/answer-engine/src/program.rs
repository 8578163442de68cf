//! Parses the playback program embedded in the local part of the request
//! URI into a structured form the call cursor can step through.

use answer_sip::read_unsigned;

/// One playback item: a file (with its `?`-introduced alternates, tried in
/// order until one opens), a dot-separator's ~100 ms pause, or a `*`
/// silence-minute marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    File(Vec<String>),
    Pause,
    /// A `*` reached mid-program: holds on a silence-minute window (see
    /// `cursor::tick_silence_minute`) before the cursor moves past it.
    SilenceMinute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferTarget {
    /// Program ended in a bare `#`.
    Hash,
    /// Program ended in `#` followed by digits; the exact digit text is
    /// kept (not parsed to a number) since it is a dial target, not a count.
    Digits(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Temp,
    Named(String),
}

/// The trailing markers of a program. More than one may be present (the
/// original accepts e.g. `*#`, meaning both "any DTMF ends the call" and "a
/// final `#` specifically designates the REFER target").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suffix {
    pub dtmf_any: bool,
    pub refer: Option<ReferTarget>,
    pub record: Option<RecordKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// `None`: a normal answered call. `Some(0)`: a bare `=` prefix
    /// (non-answer, no specific progress code). `Some(n)`: an `n=` prefix.
    pub nonanswer: Option<u32>,
    pub rings: u32,
    pub sits: u32,
    pub repeat: u32,
    pub body: Vec<BodyItem>,
    pub suffix: Suffix,
}

fn is_filename_char(b: u8, first: bool) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || (!first && b == b'/')
}

fn scan_filename(input: &[u8]) -> (&[u8], &[u8]) {
    let mut i = 0;
    while i < input.len() && is_filename_char(input[i], i == 0) {
        i += 1;
    }
    (&input[..i], &input[i..])
}

fn scan_digits(input: &[u8]) -> (&[u8], &[u8]) {
    let mut i = 0;
    while i < input.len() && input[i].is_ascii_digit() {
        i += 1;
    }
    (&input[..i], &input[i..])
}

fn to_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parses the local part of the request URI (already percent-decoded).
pub fn parse(input: &[u8]) -> Program {
    let mut rest = input;

    let nonanswer = if rest.first() == Some(&b'=') {
        rest = &rest[1..];
        Some(0)
    } else {
        let (digits, after) = read_unsigned(rest);
        if after.len() < rest.len() && after.first() == Some(&b'=') {
            rest = &after[1..];
            Some(digits)
        } else {
            None
        }
    };

    let mut rings = 0u32;
    while rest.first() == Some(&b'-') {
        rings += 1;
        rest = &rest[1..];
    }
    let mut sits = 0u32;
    while rest.first() == Some(&b'!') {
        sits += 1;
        rest = &rest[1..];
    }

    let repeat = {
        let (digits_bytes, after_digits) = scan_digits(rest);
        if !digits_bytes.is_empty() && after_digits.first() == Some(&b'*') {
            let (value, _) = read_unsigned(rest);
            rest = &after_digits[1..];
            value.max(1)
        } else {
            1
        }
    };

    let mut body = Vec::new();
    loop {
        match rest.first() {
            None | Some(b'=') | Some(b'#') => break,
            Some(b'*') => {
                // A trailing `*` with nothing playable after it is the
                // wait-for-any-DTMF suffix, not a body atom; leave it for
                // the suffix loop below. A `*` with more program after it
                // is a silence-minute marker and the scan continues.
                let continues = matches!(
                    rest.get(1),
                    Some(&b) if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.' | b'*')
                );
                if !continues {
                    break;
                }
                body.push(BodyItem::SilenceMinute);
                rest = &rest[1..];
            }
            Some(b'.') => {
                // An empty stem between (or before) dots is the fixed
                // 100 ms silence clip, not "no file here".
                body.push(BodyItem::File(vec!["100ms".to_string()]));
                rest = &rest[1..];
                body.push(BodyItem::Pause);
            }
            Some(_) => {
                let (stem, after_stem) = scan_filename(rest);
                rest = after_stem;
                let mut alternates = vec![to_str(stem)];
                while rest.first() == Some(&b'?') {
                    let (alt, after_alt) = scan_filename(&rest[1..]);
                    if alt.is_empty() {
                        break;
                    }
                    alternates.push(to_str(alt));
                    rest = after_alt;
                }
                body.push(BodyItem::File(alternates));
                if rest.first() == Some(&b'.') {
                    body.push(BodyItem::Pause);
                    rest = &rest[1..];
                }
            }
        }
    }

    let mut suffix = Suffix::default();
    loop {
        match rest.first() {
            Some(b'*') => {
                suffix.dtmf_any = true;
                rest = &rest[1..];
            }
            Some(b'#') => {
                let (digits, after) = scan_digits(&rest[1..]);
                suffix.refer = Some(if digits.is_empty() {
                    ReferTarget::Hash
                } else {
                    ReferTarget::Digits(to_str(digits))
                });
                rest = after;
            }
            Some(b'=') => {
                let name = &rest[1..];
                suffix.record = Some(if name.is_empty() {
                    RecordKind::Temp
                } else {
                    RecordKind::Named(to_str(name))
                });
                break;
            }
            _ => break,
        }
    }

    Program {
        nonanswer,
        rings,
        sits,
        repeat,
        body,
        suffix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_equals_is_nonanswer_with_no_code() {
        let p = parse(b"=");
        assert_eq!(p.nonanswer, Some(0));
        assert!(p.body.is_empty());
    }

    #[test]
    fn numeric_prefix_sets_progress_code() {
        let p = parse(b"9999=");
        assert_eq!(p.nonanswer, Some(9999));
        assert!(p.body.is_empty());
    }

    #[test]
    fn rings_and_sits_counted_before_body() {
        let p = parse(b"--!greeting");
        assert_eq!(p.rings, 2);
        assert_eq!(p.sits, 1);
        assert_eq!(p.body, vec![BodyItem::File(vec!["greeting".to_string()])]);
    }

    #[test]
    fn repeat_prefix_applies_to_body() {
        let p = parse(b"3*greeting");
        assert_eq!(p.repeat, 3);
        assert_eq!(p.body, vec![BodyItem::File(vec!["greeting".to_string()])]);
    }

    #[test]
    fn dot_separated_stems_with_alternates() {
        let p = parse(b"1.2.3");
        assert_eq!(
            p.body,
            vec![
                BodyItem::File(vec!["1".to_string()]),
                BodyItem::Pause,
                BodyItem::File(vec!["2".to_string()]),
                BodyItem::Pause,
                BodyItem::File(vec!["3".to_string()]),
            ]
        );
    }

    #[test]
    fn question_mark_introduces_alternates() {
        let p = parse(b"greeting?backup?100ms");
        assert_eq!(
            p.body,
            vec![BodyItem::File(vec![
                "greeting".to_string(),
                "backup".to_string(),
                "100ms".to_string()
            ])]
        );
    }

    #[test]
    fn leading_dot_resolves_to_fixed_silence_clip() {
        let p = parse(b".greeting");
        assert_eq!(
            p.body,
            vec![
                BodyItem::File(vec!["100ms".to_string()]),
                BodyItem::Pause,
                BodyItem::File(vec!["greeting".to_string()]),
            ]
        );
    }

    #[test]
    fn trailing_star_hash_combines_dtmf_any_and_refer_target() {
        let p = parse(b"1.2.3*#");
        assert!(p.suffix.dtmf_any);
        assert_eq!(p.suffix.refer, Some(ReferTarget::Hash));
    }

    #[test]
    fn hash_with_digits_is_refer_target() {
        let p = parse(b"greeting#12345");
        assert_eq!(p.suffix.refer, Some(ReferTarget::Digits("12345".to_string())));
    }

    #[test]
    fn equals_with_name_records_to_named_file() {
        let p = parse(b"greeting=outgoing");
        assert_eq!(p.suffix.record, Some(RecordKind::Named("outgoing".to_string())));
    }

    #[test]
    fn bare_trailing_equals_records_to_temp_file() {
        let p = parse(b"greeting=");
        assert_eq!(p.suffix.record, Some(RecordKind::Temp));
    }
}
