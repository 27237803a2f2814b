//! Request and response body representations.
//!
//! A [`RequestBody`] is a byte payload plus its media type; its content type
//! can be overridden without copying the payload. A [`ResponseBody`] is
//! handed over by the transport either fully buffered or as a live stream;
//! [`ResponseBody::buffer`] reads a stream to its end so the underlying
//! connection can be released.

use std::fmt;
use std::io::Read;

use bytes::{Buf, Bytes};

use crate::{Error, MediaType, Result};

/// An HTTP request body.
#[derive(Debug, Clone)]
pub struct RequestBody {
    content_type: Option<MediaType>,
    data: Bytes,
}

impl RequestBody {
    /// Create a request body from a media type and payload.
    #[must_use]
    pub fn new(content_type: Option<MediaType>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            data: data.into(),
        }
    }

    /// An empty body with no declared content type.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            content_type: None,
            data: Bytes::new(),
        }
    }

    /// The declared content type.
    #[must_use]
    pub const fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The payload bytes.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume into the payload bytes.
    #[must_use]
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Override the reported content type.
    ///
    /// The payload is shared with the original body, never copied or
    /// re-encoded.
    #[must_use]
    pub fn with_content_type(self, content_type: MediaType) -> Self {
        Self {
            content_type: Some(content_type),
            data: self.data,
        }
    }
}

/// An HTTP response body handed over by the transport.
pub struct ResponseBody {
    content_type: Option<MediaType>,
    content_length: Option<u64>,
    source: BodySource,
}

enum BodySource {
    /// Fully in memory; the transport connection is already released.
    Buffered(Bytes),
    /// Live, still-connected stream.
    Stream(Box<dyn Read + Send>),
    /// Placeholder left behind once a body has been handed to a converter.
    Consumed,
}

impl ResponseBody {
    /// A body fully buffered in memory.
    #[must_use]
    pub fn buffered(content_type: Option<MediaType>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            content_type,
            content_length: Some(data.len() as u64),
            source: BodySource::Buffered(data),
        }
    }

    /// A body read lazily from a live transport stream.
    #[must_use]
    pub fn streamed(
        content_type: Option<MediaType>,
        content_length: Option<u64>,
        reader: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            content_type,
            content_length,
            source: BodySource::Stream(reader),
        }
    }

    /// A placeholder that reports metadata but refuses reads.
    #[must_use]
    pub const fn no_content(content_type: Option<MediaType>, content_length: Option<u64>) -> Self {
        Self {
            content_type,
            content_length,
            source: BodySource::Consumed,
        }
    }

    /// The declared content type.
    #[must_use]
    pub const fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// The declared content length, when known.
    #[must_use]
    pub const fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Returns `true` if the body is fully in memory.
    #[must_use]
    pub const fn is_buffered(&self) -> bool {
        matches!(self.source, BodySource::Buffered(_))
    }

    /// Read the entire body into memory, releasing the underlying stream.
    ///
    /// # Errors
    ///
    /// Fails with a transport error if reading the stream fails, or with an
    /// invalid-state error on a consumed placeholder body.
    pub fn buffer(self) -> Result<Self> {
        let content_type = self.content_type;
        match self.source {
            BodySource::Buffered(data) => Ok(Self::buffered(content_type, data)),
            BodySource::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Ok(Self::buffered(content_type, data))
            }
            BodySource::Consumed => Err(consumed_error()),
        }
    }

    /// The full body bytes, buffering first if necessary.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ResponseBody::buffer`].
    pub fn bytes(self) -> Result<Bytes> {
        match self.buffer()?.source {
            BodySource::Buffered(data) => Ok(data),
            // buffer() only returns the buffered variant.
            BodySource::Stream(_) | BodySource::Consumed => Err(consumed_error()),
        }
    }

    /// Consume into a reader over the body bytes.
    ///
    /// # Errors
    ///
    /// Fails on a consumed placeholder body.
    pub fn into_reader(self) -> Result<Box<dyn Read + Send>> {
        match self.source {
            BodySource::Buffered(data) => Ok(Box::new(data.reader())),
            BodySource::Stream(reader) => Ok(reader),
            BodySource::Consumed => Err(consumed_error()),
        }
    }
}

fn consumed_error() -> Error {
    Error::invalid_state("cannot read the raw body of an already converted response")
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            BodySource::Buffered(data) => format!("Buffered({} bytes)", data.len()),
            BodySource::Stream(_) => "Stream".to_owned(),
            BodySource::Consumed => "Consumed".to_owned(),
        };
        f.debug_struct("ResponseBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("source", &source)
            .finish()
    }
}
