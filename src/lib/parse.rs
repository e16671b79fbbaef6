use std::{borrow::Cow, fmt};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const COMMENT_PREFIX: char = '#';
const ASSIGNMENT_OPERATOR: char = '=';
const SINGLE_QUOTE: char = '\'';
const DOUBLE_QUOTE: char = '"';

/// All classified lines of a single input document, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvFile<'a> {
  pub lines: Vec<EnvLine<'a>>,
}

impl<'a> From<&'a str> for EnvFile<'a> {
  /// Splits on `\n` and drops a trailing `\r`, so a final newline yields a
  /// trailing blank line.
  fn from(s: &'a str) -> Self {
    #[cfg(feature = "tracing")]
    debug!("Classifying env file with {} bytes", s.len());

    let lines: Vec<EnvLine<'a>> = s
      .split('\n')
      .map(|line| EnvLine::from(line.strip_suffix('\r').unwrap_or(line)))
      .collect();

    #[cfg(feature = "tracing")]
    debug!("Classified {} lines", lines.len());

    Self { lines }
  }
}

/// One input line sorted into exactly one category.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvLine<'a> {
  Blank,
  /// The original line, leading whitespace included.
  Comment(Cow<'a, str>),
  Entry(EnvEntry<'a>),
  /// Content without an unquoted `=`, or with an empty key. Passed through as is.
  Unknown(Cow<'a, str>),
}

impl<'a> From<&'a str> for EnvLine<'a> {
  fn from(line: &'a str) -> Self {
    #[cfg(feature = "tracing")]
    trace!("Classifying line: {:?}", line);

    if line.trim().is_empty() {
      return EnvLine::Blank;
    }

    if line.trim_start().starts_with(COMMENT_PREFIX) {
      return EnvLine::Comment(Cow::Borrowed(line));
    }

    let Some(eq_pos) = find_unquoted(line, ASSIGNMENT_OPERATOR) else {
      #[cfg(feature = "tracing")]
      trace!("No unquoted assignment, passing through");
      return EnvLine::Unknown(Cow::Borrowed(line));
    };

    let key = line[..eq_pos].trim();
    if key.is_empty() {
      return EnvLine::Unknown(Cow::Borrowed(line));
    }

    let remainder = &line[eq_pos + ASSIGNMENT_OPERATOR.len_utf8()..];
    let (value, comment) = match find_unquoted(remainder, COMMENT_PREFIX) {
      Some(hash_pos) => (&remainder[..hash_pos], remainder[hash_pos..].trim()),
      None => (remainder, ""),
    };
    let value = value.trim();

    #[cfg(feature = "tracing")]
    trace!(
      "Parsed entry: key={}, has_inline_comment={}",
      key,
      !comment.is_empty()
    );

    EnvLine::Entry(EnvEntry {
      key: Cow::Borrowed(key),
      value: Cow::Borrowed(value),
      comment: Cow::Borrowed(comment),
      quote: Quote::detect(value),
    })
  }
}

/// A `key=value` line. `value` keeps any enclosing quotes it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvEntry<'a> {
  pub key: Cow<'a, str>,
  pub value: Cow<'a, str>,
  /// Trailing inline comment starting with `#`, or empty.
  pub comment: Cow<'a, str>,
  pub quote: Quote,
}

impl<'a> EnvEntry<'a> {
  /// Same key, comment and quote style with the right-hand side replaced.
  pub fn with_value(&self, value: impl Into<Cow<'a, str>>) -> Self {
    Self {
      value: value.into(),
      ..self.clone()
    }
  }
}

impl<'a> fmt::Display for EnvEntry<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.key, ASSIGNMENT_OPERATOR, self.value)?;
    if !self.comment.is_empty() {
      write!(f, " {}", self.comment)?;
    }
    Ok(())
  }
}

/// Quote pair enclosing a trimmed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
  #[default]
  None,
  Single,
  Double,
}

impl Quote {
  /// Only a value of two or more characters whose first and last characters are
  /// the same quote counts as quoted.
  pub fn detect(value: &str) -> Self {
    let mut chars = value.chars();
    match (chars.next(), chars.next_back()) {
      (Some(SINGLE_QUOTE), Some(SINGLE_QUOTE)) => Quote::Single,
      (Some(DOUBLE_QUOTE), Some(DOUBLE_QUOTE)) => Quote::Double,
      _ => Quote::None,
    }
  }

  pub fn as_char(self) -> Option<char> {
    match self {
      Quote::None => None,
      Quote::Single => Some(SINGLE_QUOTE),
      Quote::Double => Some(DOUBLE_QUOTE),
    }
  }

  pub fn wrap(self, s: &str) -> String {
    match self.as_char() {
      Some(q) => format!("{q}{s}{q}"),
      None => s.to_string(),
    }
  }
}

/// Byte offset of the first `target` outside any single- or double-quoted span.
///
/// A quote only toggles while the other kind is closed. Unterminated quotes stay
/// open to the end of the input.
fn find_unquoted(s: &str, target: char) -> Option<usize> {
  let mut in_single = false;
  let mut in_double = false;

  for (pos, c) in s.char_indices() {
    if c == SINGLE_QUOTE && !in_double {
      in_single = !in_single;
    } else if c == DOUBLE_QUOTE && !in_single {
      in_double = !in_double;
    } else if c == target && !in_single && !in_double {
      return Some(pos);
    }
  }

  None
}
