//! Fixed-width peer names used for named multicast.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ANNOUNCE_SIZE, NAME_SIZE};

/// A 4-byte peer name
///
/// Names are built like a bounded C string copy: at most [`NAME_SIZE`]
/// bytes are taken, copying stops at the first zero byte and the rest is
/// zero-filled. Outbound bodies are matched against a pipe's name by
/// building a name from the body's leading bytes the same way, so a
/// registered `"AB"` matches bodies starting with `"AB\0"` as well as a
/// bare `"AB"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PeerName([u8; NAME_SIZE]);

impl PeerName {
    /// The all-zero name a socket announces when no local name was set
    pub const UNSET: Self = Self([0; NAME_SIZE]);

    /// Build a name from the leading bytes of `bytes`
    #[must_use]
    pub fn from_prefix(bytes: &[u8]) -> Self {
        let mut name = [0u8; NAME_SIZE];
        for (slot, &b) in name.iter_mut().zip(bytes.iter().take_while(|&&b| b != 0)) {
            *slot = b;
        }
        Self(name)
    }

    /// Raw name bytes, zero padded
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NAME_SIZE] {
        &self.0
    }

    /// Check whether `body` is addressed to this name
    #[must_use]
    pub fn matches(&self, body: &[u8]) -> bool {
        Self::from_prefix(body) == *self
    }

    /// Body of the self-announcement carrying this name
    ///
    /// The name is followed by a zero terminator for wire compatibility with
    /// peers that read it as a C string.
    #[must_use]
    pub fn announcement(&self) -> [u8; ANNOUNCE_SIZE] {
        let mut body = [0u8; ANNOUNCE_SIZE];
        body[..NAME_SIZE].copy_from_slice(&self.0);
        body
    }

    /// Name without trailing zero padding
    fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
        &self.0[..end]
    }
}

impl From<&str> for PeerName {
    fn from(s: &str) -> Self {
        Self::from_prefix(s.as_bytes())
    }
}

impl fmt::Display for PeerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.trimmed().escape_ascii())
    }
}

impl fmt::Debug for PeerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerName(\"{self}\")")
    }
}

impl Serialize for PeerName {
    /// Names that are valid UTF-8 serialize as strings, anything else as raw
    /// bytes. The escaped [`Display`](fmt::Display) form is never used.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(self.trimmed()) {
            Ok(s) => serializer.serialize_str(s),
            Err(_) => serializer.serialize_bytes(self.trimmed()),
        }
    }
}

struct PeerNameVisitor;

impl<'de> Visitor<'de> for PeerNameVisitor {
    type Value = PeerName;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a peer name as a string or byte sequence")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PeerName, E> {
        Ok(PeerName::from(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<PeerName, E> {
        Ok(PeerName::from_prefix(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PeerName, A::Error> {
        let mut bytes = Vec::with_capacity(NAME_SIZE);
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        Ok(PeerName::from_prefix(&bytes))
    }
}

impl<'de> Deserialize<'de> for PeerName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PeerNameVisitor)
    }
}
