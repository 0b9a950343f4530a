//! Symbol name validation.
//!
//! Every variable, rule, pool, argument, module type and import alias goes
//! through [`validate_name`] before it is registered. Accepted names are
//! non-empty and consist only of ASCII letters, digits, `_` and `-`. The path
//! and namespace separators are reserved for qualification, so they get their
//! own error variant to make the message point at the real problem.

use thiserror::Error;

use crate::consts::{NAMESPACE_SEPARATOR, PATH_SEPARATOR};

/// Errors produced by name validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
  #[error("name is empty")]
  Empty,

  #[error("name {name:?} contains reserved separator {ch:?} at byte offset {offset}")]
  Separator { name: String, ch: char, offset: usize },

  #[error("name {name:?} contains invalid character {ch:?} at byte offset {offset}")]
  InvalidChar { name: String, ch: char, offset: usize },
}

/// Returns true for characters allowed in a bare symbol name.
pub fn is_name_char(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Check that `name` is usable as a build-tool identifier.
///
/// # Errors
///
/// Fails on the first offending character, or with [`NameError::Empty`].
pub fn validate_name(name: &str) -> Result<(), NameError> {
  if name.is_empty() {
    return Err(NameError::Empty);
  }

  for (offset, ch) in name.char_indices() {
    if ch == NAMESPACE_SEPARATOR || ch == PATH_SEPARATOR {
      return Err(NameError::Separator {
        name: name.to_string(),
        ch,
        offset,
      });
    }
    if !is_name_char(ch) {
      return Err(NameError::InvalidChar {
        name: name.to_string(),
        ch,
        offset,
      });
    }
  }

  Ok(())
}

/// Check a dotted name such as a package full name (`"code.example.cc"`).
///
/// Each dot-separated segment must be a valid bare name.
pub fn validate_qualified_name(name: &str) -> Result<(), NameError> {
  if name.is_empty() {
    return Err(NameError::Empty);
  }

  let mut start: usize = 0;
  for segment in name.split(NAMESPACE_SEPARATOR) {
    validate_name(segment).map_err(|err| match err {
      NameError::Empty => NameError::Separator {
        name: name.to_string(),
        ch: NAMESPACE_SEPARATOR,
        offset: start.saturating_sub(1),
      },
      NameError::Separator { ch, offset, .. } => NameError::Separator {
        name: name.to_string(),
        ch,
        offset: start + offset,
      },
      NameError::InvalidChar { ch, offset, .. } => NameError::InvalidChar {
        name: name.to_string(),
        ch,
        offset: start + offset,
      },
    })?;
    start += segment.len() + NAMESPACE_SEPARATOR.len_utf8();
  }

  Ok(())
}
