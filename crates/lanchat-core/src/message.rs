//! Protocol values: the participant identity and single-line messages.

use crate::error::{CodecError, ConnectionError};
use std::fmt;

fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// One line of chat traffic, without its terminator.
///
/// A `Message` never contains `\n` or `\r`, so writing it followed by a
/// single terminator always produces exactly one record on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message(String);

impl Message {
    /// Validate and wrap `text`.
    ///
    /// # Errors
    /// Returns `CodecError::EmbeddedLineBreak` if `text` contains a line
    /// boundary.
    pub fn new(text: impl Into<String>) -> Result<Self, CodecError> {
        let text = text.into();
        if has_line_break(&text) {
            return Err(CodecError::EmbeddedLineBreak);
        }
        Ok(Self(text))
    }

    /// Wrap text already known to be free of line breaks (decoder output).
    pub(crate) fn from_decoded(text: String) -> Self {
        debug_assert!(!text.contains('\n'));
        Self(text)
    }

    /// Borrow the text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned text
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the empty line
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Message {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Message {
    type Error = CodecError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

/// The display name a participant registers with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Validate a display name.
    ///
    /// # Errors
    /// Fails for the empty string or a name containing a line break.
    pub fn new(name: impl Into<String>) -> Result<Self, ConnectionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConnectionError::InvalidIdentity("identity must not be empty"));
        }
        if has_line_break(&name) {
            return Err(ConnectionError::InvalidIdentity(
                "identity must be a single line",
            ));
        }
        Ok(Self(name))
    }

    /// Borrow the name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The registration line sent as the first record of a session
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message(self.0.clone())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
