//! Media types for request and response bodies.

use std::fmt;

use crate::{Error, Result};

/// A parsed media type such as `application/json; charset=utf-8`.
///
/// Only the `type/subtype` essence is validated; parameters after the first
/// `;` are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    full: String,
    main_len: usize,
    essence_len: usize,
}

impl MediaType {
    /// Parse a media type string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedContentType`] when the value does not start
    /// with a `type/subtype` pair of RFC token characters.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let full = value.into();
        let essence_len = full.find(';').unwrap_or(full.len());
        let essence = full.get(..essence_len).unwrap_or_default();
        let Some(main_len) = essence.find('/') else {
            return Err(Error::malformed_content_type(full));
        };
        let main = essence.get(..main_len).unwrap_or_default();
        let sub = essence.get(main_len + 1..).unwrap_or_default();
        if main.is_empty()
            || sub.is_empty()
            || !main.chars().all(is_token_char)
            || !sub.chars().all(is_token_char)
        {
            return Err(Error::malformed_content_type(full));
        }
        Ok(Self {
            full,
            main_len,
            essence_len,
        })
    }

    /// Build a media type from a value known to be well formed.
    pub(crate) fn new_unchecked(full: String) -> Self {
        let essence_len = full.find(';').unwrap_or(full.len());
        let main_len = full.find('/').unwrap_or(essence_len);
        Self {
            full,
            main_len,
            essence_len,
        }
    }

    /// `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn form_urlencoded() -> Self {
        Self::new_unchecked("application/x-www-form-urlencoded".to_owned())
    }

    /// `multipart/form-data` with the given boundary.
    #[must_use]
    pub fn multipart_form_data(boundary: &str) -> Self {
        Self::new_unchecked(format!("multipart/form-data; boundary={boundary}"))
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new_unchecked("application/octet-stream".to_owned())
    }

    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn text_plain_utf8() -> Self {
        Self::new_unchecked("text/plain; charset=utf-8".to_owned())
    }

    /// The top-level type, e.g. `application`.
    #[must_use]
    pub fn main_type(&self) -> &str {
        self.full.get(..self.main_len).unwrap_or_default()
    }

    /// The subtype, e.g. `json`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        self.full
            .get(self.main_len + 1..self.essence_len)
            .unwrap_or_default()
    }

    /// The `type/subtype` pair without parameters.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.full.get(..self.essence_len).unwrap_or_default()
    }

    /// The full media type string, parameters included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain() {
        let mt = MediaType::parse("application/json").expect("parse");
        assert_eq!(mt.main_type(), "application");
        assert_eq!(mt.subtype(), "json");
        assert_eq!(mt.essence(), "application/json");
        assert_eq!(mt.as_str(), "application/json");
    }

    #[test]
    fn parse_with_parameters() {
        let mt = MediaType::parse("text/plain; charset=utf-8").expect("parse");
        assert_eq!(mt.essence(), "text/plain");
        assert_eq!(mt.subtype(), "plain");
        assert_eq!(mt.to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn parse_suffixed_subtype() {
        let mt = MediaType::parse("application/vnd.api+json").expect("parse");
        assert_eq!(mt.subtype(), "vnd.api+json");
    }

    #[test]
    fn parse_rejects_malformed_values() {
        for bad in ["", "json", "/json", "application/", "appli cation/json", "a/b c"] {
            let err = MediaType::parse(bad).expect_err("should fail");
            assert!(matches!(err, Error::MalformedContentType(_)), "{bad:?}");
        }
    }

    #[test]
    fn known_constructors() {
        assert_eq!(
            MediaType::form_urlencoded().as_str(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            MediaType::multipart_form_data("xyz").as_str(),
            "multipart/form-data; boundary=xyz"
        );
        assert_eq!(
            MediaType::multipart_form_data("xyz").essence(),
            "multipart/form-data"
        );
        assert_eq!(MediaType::octet_stream().subtype(), "octet-stream");
    }
}
