//! Pipe identity handles and their wire tokens.
//!
//! Every attached pipe is addressed by a [`PipeId`]: the index of its slot in
//! the socket's [`PipeTable`](crate::table::PipeTable) plus the generation
//! the slot had when the pipe was attached. The same pair, serialized
//! big-endian, forms the 8-byte [`PipeToken`] carried in routing headers:
//!
//! ```text
//!  0               4               8
//! ┌───────────────┬───────────────┐
//! │  slot index   │  generation   │
//! └───────────────┴───────────────┘
//! ```
//!
//! A slot's generation is bumped whenever its pipe is detached, so a token
//! kept past detachment no longer matches and resolves to an explicit
//! [`IdentityError::Stale`] instead of aliasing whichever pipe reuses the
//! slot.

use std::fmt;

use crate::TOKEN_SIZE;
use crate::error::IdentityError;

/// Arena handle of an attached pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeId {
    index: u32,
    generation: u32,
}

impl PipeId {
    /// Create a handle from its slot index and generation
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the pipe table
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Encode as a wire token
    #[must_use]
    pub fn to_token(self) -> PipeToken {
        let mut bytes = [0u8; TOKEN_SIZE];
        bytes[..4].copy_from_slice(&self.index.to_be_bytes());
        bytes[4..].copy_from_slice(&self.generation.to_be_bytes());
        PipeToken(bytes)
    }
}

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipe#{}v{}", self.index, self.generation)
    }
}

/// Fixed-width identity token as carried in a routing header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeToken([u8; TOKEN_SIZE]);

impl PipeToken {
    /// Wrap raw token bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TOKEN_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a token from a header slice
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Length`] if the slice is not exactly
    /// [`TOKEN_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let raw: [u8; TOKEN_SIZE] = bytes
            .try_into()
            .map_err(|_| IdentityError::Length(bytes.len()))?;
        Ok(Self(raw))
    }

    /// Raw token bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; TOKEN_SIZE] {
        &self.0
    }

    /// Split the token back into its handle fields
    ///
    /// The result is only meaningful for the table that issued the token;
    /// use [`PipeTable::resolve`](crate::table::PipeTable::resolve) to check
    /// that the pipe is still attached.
    #[must_use]
    pub fn pipe_id(&self) -> PipeId {
        let [i0, i1, i2, i3, g0, g1, g2, g3] = self.0;
        PipeId::new(
            u32::from_be_bytes([i0, i1, i2, i3]),
            u32::from_be_bytes([g0, g1, g2, g3]),
        )
    }
}

impl From<PipeId> for PipeToken {
    fn from(id: PipeId) -> Self {
        id.to_token()
    }
}

impl fmt::Display for PipeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_layout() {
        let token = PipeId::new(0x0102_0304, 0x0A0B_0C0D).to_token();
        assert_eq!(
            token.as_bytes(),
            &[0x01, 0x02, 0x03, 0x04, 0x0A, 0x0B, 0x0C, 0x0D]
        );
        assert_eq!(token.to_string(), "010203040a0b0c0d");
    }

    #[test]
    fn test_token_back_to_id() {
        let id = PipeId::new(7, 3);
        assert_eq!(id.to_token().pipe_id(), id);
        assert_eq!(PipeToken::from(id), id.to_token());
    }

    #[test]
    fn test_token_from_slice_length() {
        assert!(PipeToken::from_slice(&[0u8; 8]).is_ok());
        assert_eq!(
            PipeToken::from_slice(&[0u8; 4]),
            Err(IdentityError::Length(4))
        );
        assert_eq!(PipeToken::from_slice(&[]), Err(IdentityError::Length(0)));
    }

    #[test]
    fn test_pipe_id_display() {
        assert_eq!(PipeId::new(2, 5).to_string(), "pipe#2v5");
    }
}
