//! Messages exchanged over pipes.
//!
//! A message is a body plus an optional routing header. Both are
//! [`Bytes`], so handing the same message to several pipes during a
//! multicast only bumps reference counts.

use bytes::Bytes;

/// A message body with its routing header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    header: Bytes,
    body: Bytes,
}

impl Message {
    /// Create a message with an empty header
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            header: Bytes::new(),
            body: body.into(),
        }
    }

    /// Create a message from a static body
    #[must_use]
    pub fn from_static(body: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(body))
    }

    /// Create a message with an explicit routing header
    pub fn with_header(header: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }

    /// Routing header bytes
    #[must_use]
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    /// Body bytes
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Check whether a routing header is present
    #[must_use]
    pub fn has_header(&self) -> bool {
        !self.header.is_empty()
    }

    /// Replace the routing header
    pub fn set_header(&mut self, header: impl Into<Bytes>) {
        self.header = header.into();
    }

    /// Remove and return the routing header
    pub fn take_header(&mut self) -> Bytes {
        std::mem::take(&mut self.header)
    }

    /// Split into `(header, body)`
    #[must_use]
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.header, self.body)
    }

    /// Total size of header and body
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.len() + self.body.len()
    }

    /// Check whether both header and body are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_empty()
    }
}

impl From<&'static str> for Message {
    fn from(body: &'static str) -> Self {
        Self::new(Bytes::from_static(body.as_bytes()))
    }
}

impl From<Vec<u8>> for Message {
    fn from(body: Vec<u8>) -> Self {
        Self::new(body)
    }
}
