//! Parsing and rendering of text containing variable references.
//!
//! Rule commands, variable values and other declaration text may refer to
//! variables using the build tool's syntax. The text is parsed once against a
//! [`Scope`] into a [`NinjaString`]: literal segments and references bound to
//! the [`Variable`] they resolved to. The same parsed value can then be
//! rendered with any prefix assignment, or fully expanded for a configuration.
//!
//! # Reference Formats
//!
//! - `$name` - variable visible from the scope (own or parent chain)
//! - `${name}` - same, delimited
//! - `${alias.name}` - variable declared by the package imported as `alias`
//!
//! # Escapes
//!
//! `$$`, `$ `, `$:` and `$` followed by a newline are build-tool escapes. They
//! are kept verbatim in literal segments so the rendered text means the same
//! thing to the build tool.
//!
//! # Example
//!
//! ```
//! use blueprint_lib::ninja_string::{parse, Segment};
//! use blueprint_lib::{PackageNames, Registry};
//!
//! let registry = Registry::new();
//! let cc = registry.context("build/cc").unwrap();
//! let compiler = cc.static_variable("cc", "gcc").unwrap();
//!
//! let text = parse(cc.package().scope(), "${cc} -c $$HOME").unwrap();
//! assert_eq!(text.segments()[0], Segment::Ref(compiler));
//!
//! let names = PackageNames::full_names(&registry, None);
//! assert_eq!(text.render(&names), "${build.cc.cc} -c $$HOME");
//! ```

use std::fmt;

use thiserror::Error;

use crate::config::Config;
use crate::consts::{MAX_EXPANSION_DEPTH, NAMESPACE_SEPARATOR};
use crate::error::{Error, Result};
use crate::name::is_name_char;
use crate::package::PackageNames;
use crate::scope::{LookupError, Scope};
use crate::variable::Variable;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text, escapes included
  Literal(String),

  /// A reference resolved at parse time
  Ref(Variable),
}

/// Errors that can occur while parsing text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("invalid character {ch:?} after '$' at byte offset {offset}")]
  InvalidEscape { ch: char, offset: usize },

  #[error("unexpected end of text after '$' at byte offset {0}")]
  DanglingDollar(usize),

  #[error("unclosed reference starting at byte offset {0}")]
  Unclosed(usize),

  #[error("invalid character {ch:?} in reference at byte offset {offset}")]
  InvalidReference { ch: char, offset: usize },

  #[error("unresolved reference {token:?} at byte offset {offset}: {source}")]
  Unresolved {
    token: String,
    offset: usize,
    #[source]
    source: LookupError,
  },
}

/// Text with its variable references resolved.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NinjaString {
  segments: Vec<Segment>,
}

impl NinjaString {
  /// Text without references, used as is.
  pub fn literal(text: impl Into<String>) -> Self {
    let text = text.into();
    if text.is_empty() {
      return Self::default();
    }
    Self {
      segments: vec![Segment::Literal(text)],
    }
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Variables referenced, in order of appearance.
  pub fn variables(&self) -> impl Iterator<Item = &Variable> {
    self.segments.iter().filter_map(|segment| match segment {
      Segment::Ref(variable) => Some(variable),
      Segment::Literal(_) => None,
    })
  }

  pub fn is_literal(&self) -> bool {
    self.variables().next().is_none()
  }

  /// Render with every reference replaced by `${qualified-name}`.
  ///
  /// Argument placeholders render under their bare name.
  pub fn render(&self, names: &PackageNames) -> String {
    let mut result = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => result.push_str(text),
        Segment::Ref(variable) => push_reference(&mut result, &variable.full_name(names)),
      }
    }
    result
  }

  /// Substitute every reference with its value for `config`, recursively.
  ///
  /// Argument placeholders stay as `${name}` since they only get a value
  /// per build statement.
  ///
  /// # Errors
  ///
  /// Fails when a referenced variable cannot be evaluated, or when the chain
  /// of references is cyclic or deeper than [`MAX_EXPANSION_DEPTH`].
  pub fn expand(&self, config: &Config) -> Result<String> {
    let mut chain = Vec::new();
    self.expand_into(config, &mut chain)
  }

  fn expand_into(&self, config: &Config, chain: &mut Vec<Variable>) -> Result<String> {
    let mut result = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => result.push_str(text),
        Segment::Ref(variable) if variable.is_arg() => push_reference(&mut result, variable.name()),
        Segment::Ref(variable) => {
          if chain.len() >= MAX_EXPANSION_DEPTH || chain.contains(variable) {
            let path = chain
              .iter()
              .chain(std::iter::once(variable))
              .map(Variable::name)
              .collect::<Vec<_>>()
              .join(" -> ");
            return Err(Error::ExpansionCycle {
              name: variable.name().to_string(),
              chain: path,
            });
          }

          chain.push(variable.clone());
          let value = variable.value(config)?.expand_into(config, chain)?;
          chain.pop();
          result.push_str(&value);
        }
      }
    }
    Ok(result)
  }
}

impl fmt::Debug for NinjaString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(&self.segments).finish()
  }
}

fn push_reference(out: &mut String, name: &str) {
  out.push_str("${");
  out.push_str(name);
  out.push('}');
}

/// Parse `input`, resolving each reference against `scope`.
///
/// # Errors
///
/// Returns an error for malformed escapes or references, and
/// [`ParseError::Unresolved`] for references that name no visible variable.
pub fn parse(scope: &Scope, input: &str) -> Result<NinjaString, ParseError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    let token = match chars.next() {
      Some((_, escaped @ ('$' | ' ' | ':' | '\n'))) => {
        literal.push('$');
        literal.push(escaped);
        continue;
      }
      Some((_, '{')) => {
        let mut token = String::new();
        let mut found_close = false;

        for (offset, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          if !is_name_char(c) && c != NAMESPACE_SEPARATOR {
            return Err(ParseError::InvalidReference { ch: c, offset });
          }
          token.push(c);
        }

        if !found_close {
          return Err(ParseError::Unclosed(pos));
        }
        token
      }
      Some((_, first)) if is_name_char(first) => {
        let mut token = String::from(first);
        while let Some(&(_, c)) = chars.peek() {
          if !is_name_char(c) {
            break;
          }
          token.push(c);
          chars.next();
        }
        token
      }
      Some((offset, c)) => return Err(ParseError::InvalidEscape { ch: c, offset }),
      None => return Err(ParseError::DanglingDollar(pos)),
    };

    let variable = scope
      .resolve_variable(&token)
      .map_err(|source| ParseError::Unresolved {
        token: token.clone(),
        offset: pos,
        source,
      })?;

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }
    segments.push(Segment::Ref(variable));
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(NinjaString { segments })
}
