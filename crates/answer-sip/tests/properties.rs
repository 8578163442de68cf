//! Property-based checks for the parser invariants listed in `spec.md` §8.

use proptest::prelude::*;

use answer_sip::{deescape, esc_cmp, read_unsigned};

fn percent_encode(byte: u8) -> String {
    format!("%{byte:02X}")
}

proptest! {
    #[test]
    fn read_unsigned_consumes_exactly_the_leading_digit_run(
        digits in "[0-9]{0,9}",
        tail in "[a-zA-Z]{0,5}",
    ) {
        let input = format!("{digits}{tail}");
        let (value, rest) = read_unsigned(input.as_bytes());
        prop_assert_eq!(rest, tail.as_bytes());
        if digits.is_empty() {
            prop_assert_eq!(value, 0);
        } else {
            let expected: u32 = digits.parse().unwrap_or(u32::MAX);
            prop_assert_eq!(value.min(expected), value);
        }
    }

    #[test]
    fn read_unsigned_never_reads_past_input_end(digits in "[0-9]{0,12}") {
        let (_, rest) = read_unsigned(digits.as_bytes());
        prop_assert!(rest.is_empty());
    }

    #[test]
    fn deescape_is_idempotent_on_percent_free_input(s in "[ -~&&[^%]]{0,32}") {
        let mut once = vec![0u8; s.len() + 8];
        let n1 = deescape(s.as_bytes(), &mut once);
        let mut twice = vec![0u8; n1 + 8];
        let n2 = deescape(&once[..n1], &mut twice);
        prop_assert_eq!(&once[..n1], &twice[..n2]);
    }

    #[test]
    fn esc_cmp_matches_any_percent_encoding_of_the_same_bytes(bytes in prop::collection::vec(1u8..=126u8, 0..16)) {
        let encoded: String = bytes.iter().copied().map(percent_encode).collect();
        prop_assert_eq!(esc_cmp(Some(encoded.as_bytes()), Some(&bytes)), std::cmp::Ordering::Equal);
    }
}
