//! Opaque document keys.
//!
//! A [`DocumentKey`] is a monotonic ULID. Its canonical text form is the
//! 26-character Crockford Base32 encoding, so keys sort by creation time both
//! as values and as text.
//!
//! Services never look inside a key; they only convert between the text form
//! and the key with [`DocumentKey::parse`].

use core::{fmt, str::FromStr};
use ferroid::{
    base32::Base32UlidExt,
    generator::thread_local::Ulid,
    id::{Id, ULID},
};

/// Length of the text encoding of a [`DocumentKey`].
pub const KEY_TEXT_LEN: usize = 26;

/// Store-native identifier of a document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey(ULID);

impl DocumentKey {
    /// A fresh key, strictly greater than every key generated before it on
    /// this thread.
    pub fn generate() -> Self {
        Self(Ulid::new_ulid_mono())
    }

    pub fn from_raw(raw: u128) -> Self {
        Self(ULID::from_raw(raw))
    }

    pub fn to_raw(&self) -> u128 {
        self.0.to_raw()
    }

    /// Parses the Base32 text form.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if `text` has the wrong length, contains a
    /// character outside the Crockford alphabet, or overflows a ULID.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        ULID::decode(text).map(Self).map_err(|e| KeyError::Invalid {
            text: text.to_string(),
            reason: e.to_string(),
        })
    }

    /// Whether `text` is a well-formed key.
    pub fn is_valid(text: &str) -> bool {
        Self::parse(text).is_ok()
    }
}

impl From<ULID> for DocumentKey {
    fn from(ulid: ULID) -> Self {
        Self(ulid)
    }
}

impl FromStr for DocumentKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.encode(), f)
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentKey({self})")
    }
}

/// Why a text identifier is not a valid [`DocumentKey`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid document key {text:?}: {reason}")]
    Invalid { text: String, reason: String },
}
