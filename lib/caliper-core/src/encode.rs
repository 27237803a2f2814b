//! Percent-encoding for URL path, query, and form components.
//!
//! [`canonicalize_for_path`] is the workhorse behind path-parameter
//! substitution: deterministic, referentially transparent, and allocation
//! free when nothing needs encoding. Query and form components go through
//! the [`percent-encoding`] crate's [`AsciiSet`] machinery.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters percent-encoded inside a path segment even though they are
/// printable ASCII.
const PATH_SEGMENT_ALWAYS_ENCODE: &str = " \"<>^`{}|\\?#";

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Encode set for query parameter names and values.
pub const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'=')
    .add(b'+');

/// Encode set for `application/x-www-form-urlencoded` names and values.
pub const FORM_COMPONENT: &AsciiSet = &QUERY_COMPONENT
    .add(b'!')
    .add(b'$')
    .add(b'(')
    .add(b')')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b'~');

/// Percent-encode a query parameter name or value.
#[must_use]
pub fn query_encode(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, QUERY_COMPONENT).into()
}

/// Percent-encode a form field name or value.
#[must_use]
pub fn form_encode(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, FORM_COMPONENT).into()
}

/// Canonicalize a path-parameter value for substitution into a URL path.
///
/// Every code point outside printable ASCII, and every printable ASCII
/// character in the reserved set (space, `"`, `<`, `>`, `^`, backtick,
/// `{`, `}`, `|`, `\`, `?`, `#`), is percent-encoded as uppercase `%XX`
/// triples over its UTF-8 bytes. When `already_encoded` is `false`, `/` and
/// `%` are also encoded; callers passing pre-encoded values accept
/// responsibility for those two characters. When `already_encoded` is
/// `true`, tab, newline, form-feed, and carriage-return are silently
/// dropped instead of encoded.
///
/// Returns the input borrowed when no character requires encoding.
#[must_use]
pub fn canonicalize_for_path(input: &str, already_encoded: bool) -> Cow<'_, str> {
    for (i, c) in input.char_indices() {
        if requires_encoding(c, already_encoded) {
            let mut out = String::with_capacity(input.len() + 8);
            out.push_str(input.get(..i).unwrap_or_default());
            canonicalize_slow(&mut out, input.get(i..).unwrap_or_default(), already_encoded);
            return Cow::Owned(out);
        }
    }
    Cow::Borrowed(input)
}

fn requires_encoding(c: char, already_encoded: bool) -> bool {
    let cp = c as u32;
    cp < 0x20
        || cp >= 0x7f
        || PATH_SEGMENT_ALWAYS_ENCODE.contains(c)
        || (!already_encoded && (c == '/' || c == '%'))
}

fn canonicalize_slow(out: &mut String, rest: &str, already_encoded: bool) {
    let mut utf8 = [0_u8; 4];
    for c in rest.chars() {
        if already_encoded && matches!(c, '\t' | '\n' | '\u{000C}' | '\r') {
            // Dropped, not encoded.
        } else if requires_encoding(c, already_encoded) {
            for &b in c.encode_utf8(&mut utf8).as_bytes() {
                out.push('%');
                out.push(char::from(HEX_DIGITS[usize::from(b >> 4)]));
                out.push(char::from(HEX_DIGITS[usize::from(b & 0xf)]));
            }
        } else {
            out.push(c);
        }
    }
}

/// Returns `true` if any `/`-separated segment of `relative_url` is a
/// standalone `.` or `..` path component, in raw or percent-encoded
/// (`%2e`/`%2E`) form.
///
/// Such segments change URL resolution (`/one/../two/` pops a directory),
/// so a substituted value producing one must be rejected. Dots embedded in
/// a larger segment (`a..z`, `index.html`) are fine.
#[must_use]
pub fn has_path_traversal(relative_url: &str) -> bool {
    relative_url.split('/').any(is_traversal_segment)
}

fn is_traversal_segment(segment: &str) -> bool {
    match strip_dot(segment) {
        // One dot unit, or exactly two.
        Some(rest) => rest.is_empty() || strip_dot(rest).is_some_and(str::is_empty),
        None => false,
    }
}

fn strip_dot(s: &str) -> Option<&str> {
    s.strip_prefix('.')
        .or_else(|| s.strip_prefix("%2e"))
        .or_else(|| s.strip_prefix("%2E"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_borrows_unchanged_input() {
        let input = "simple-value_1.2~";
        let out = canonicalize_for_path(input, false);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, input);
    }

    #[test]
    fn reserved_ascii_is_encoded() {
        assert_eq!(canonicalize_for_path("a b", false), "a%20b");
        assert_eq!(canonicalize_for_path("a\"b", false), "a%22b");
        assert_eq!(canonicalize_for_path("{v}", false), "%7Bv%7D");
        assert_eq!(canonicalize_for_path("x|y^z", false), "x%7Cy%5Ez");
        assert_eq!(canonicalize_for_path("q?f#a", false), "q%3Ff%23a");
    }

    #[test]
    fn slash_and_percent_depend_on_already_encoded() {
        assert_eq!(canonicalize_for_path("a/b", false), "a%2Fb");
        assert_eq!(canonicalize_for_path("a/b", true), "a/b");
        assert_eq!(canonicalize_for_path("50%", false), "50%25");
        assert_eq!(canonicalize_for_path("50%25", true), "50%25");
    }

    #[test]
    fn non_ascii_is_encoded_as_utf8_bytes_uppercase() {
        assert_eq!(canonicalize_for_path("café", false), "caf%C3%A9");
        assert_eq!(canonicalize_for_path("日", false), "%E6%97%A5");
        // Control characters are always encoded when not pre-encoded.
        assert_eq!(canonicalize_for_path("a\u{1}b", false), "a%01b");
    }

    #[test]
    fn output_is_ascii_and_decodes_back() {
        let inputs = ["café/日本 %", "plain", "tab\there", "a?b#c^d"];
        for input in inputs {
            let encoded = canonicalize_for_path(input, false);
            assert!(encoded.is_ascii(), "non-ASCII output for {input:?}");
            let decoded = percent_encoding::percent_decode_str(&encoded)
                .decode_utf8()
                .expect("valid UTF-8");
            assert_eq!(decoded, input);
        }
    }

    #[test]
    fn control_whitespace_is_dropped_when_already_encoded() {
        assert_eq!(canonicalize_for_path("a\tb\nc\rd\u{000C}e", true), "abcde");
        // ...but encoded when the value is not pre-encoded.
        assert_eq!(canonicalize_for_path("a\tb", false), "a%09b");
    }

    #[test]
    fn idempotent_over_already_encoded_output() {
        for input in ["café 日本", "a/b%c", "x\"y|z"] {
            let once = canonicalize_for_path(input, false).into_owned();
            let twice = canonicalize_for_path(&once, true);
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn traversal_segments_are_detected() {
        for candidate in [
            ".", "..", "%2e", "%2E", "%2e%2E", ".%2e", "a/../b", "a/..", "../a", "x/./y",
            "user/%2E%2E/admin",
        ] {
            assert!(has_path_traversal(candidate), "{candidate:?} should match");
        }
    }

    #[test]
    fn embedded_dots_are_not_traversal() {
        for candidate in ["a..z", "index.html", "...", "a.b/c.d", "%2ex", "..%2e."] {
            assert!(!has_path_traversal(candidate), "{candidate:?} should not match");
        }
    }

    #[test]
    fn query_encoding_escapes_structural_characters() {
        assert_eq!(query_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(query_encode("plain-value"), "plain-value");
        assert_eq!(query_encode("café"), "caf%C3%A9");
    }

    #[test]
    fn form_encoding_is_stricter_than_query() {
        assert_eq!(form_encode("a/b:c"), "a%2Fb%3Ac");
        assert_eq!(query_encode("a/b:c"), "a/b:c");
    }
}
