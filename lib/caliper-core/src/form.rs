//! Form-urlencoded body accumulation.

use crate::encode::form_encode;
use crate::{MediaType, RequestBody};

/// Accumulates `application/x-www-form-urlencoded` fields.
///
/// Fields are stored already percent-encoded; [`FormBody::add_encoded`]
/// accepts values the caller has encoded and stores them verbatim.
#[derive(Debug, Clone, Default)]
pub struct FormBody {
    fields: Vec<(String, String)>,
}

impl FormBody {
    /// Create an empty form accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, percent-encoding name and value.
    pub fn add(&mut self, name: &str, value: &str) {
        self.fields
            .push((form_encode(name).into_owned(), form_encode(value).into_owned()));
    }

    /// Add a field whose name and value are already encoded.
    pub fn add_encoded(&mut self, name: &str, value: &str) {
        self.fields.push((name.to_owned(), value.to_owned()));
    }

    /// Number of accumulated fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields were accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode the accumulated fields into a request body.
    #[must_use]
    pub fn build(self) -> RequestBody {
        let mut encoded = String::new();
        for (name, value) in &self.fields {
            if !encoded.is_empty() {
                encoded.push('&');
            }
            encoded.push_str(name);
            encoded.push('=');
            encoded.push_str(value);
        }
        RequestBody::new(Some(MediaType::form_urlencoded()), encoded.into_bytes())
    }
}
