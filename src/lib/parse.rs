//! Plain `.env` content parsing.
//!
//! [`parse_env_content`] extracts the flat key/value map of a `.env` body.
//! [`EnvDocument`] keeps every line around so a file can be edited with
//! [`EnvDocument::set`] and [`EnvDocument::unset`] and written back without
//! losing its comments.

use std::{borrow::Cow, collections::HashMap, fmt};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

pub(crate) const COMMENT_PREFIX: &str = "#";
pub(crate) const ASSIGNMENT_OPERATOR: &str = "=";

/// Parses `.env` text into a key/value map.
///
/// Empty lines, comments and lines without `=` are skipped. The key is the
/// trimmed text before the first `=`; the value is everything after it, taken
/// from the trimmed line without further trimming. Later assignments of the
/// same key win.
pub fn parse_env_content(content: &str) -> HashMap<String, String> {
  EnvDocument::from(content).to_map()
}

/// Returns the key declared by a single `.env` line, if any.
pub(crate) fn declared_key(line: &str) -> Option<&str> {
  let trimmed = line.trim();
  if trimmed.starts_with(COMMENT_PREFIX) {
    return None;
  }

  trimmed
    .split_once(ASSIGNMENT_OPERATOR)
    .map(|(key, _)| key.trim())
    .filter(|key| !key.is_empty())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvDocument<'a> {
  pub lines: Vec<EnvLine<'a>>,
}

impl<'a> fmt::Display for EnvDocument<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{}", line)?;
    }
    Ok(())
  }
}

impl<'a> From<&'a str> for EnvDocument<'a> {
  fn from(s: &'a str) -> Self {
    #[cfg(feature = "tracing")]
    debug!("Parsing env content with {} lines", s.lines().count());

    let lines = s.lines().map(EnvLine::from).collect();

    Self { lines }
  }
}

impl<'a> EnvDocument<'a> {
  /// Value of the last assignment of `key`.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.assignments().filter(|(k, _)| *k == key).map(|(_, v)| v).last()
  }

  /// Replaces the value of the last assignment of `key`, or appends a new one.
  pub fn set(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
    let value = value.into();

    let existing = self.lines.iter_mut().rev().find_map(|line| match line {
      EnvLine::Assignment { key: k, value: v, raw } if *k == key => Some((v, raw)),
      _ => None,
    });

    if let Some((current, raw)) = existing {
      #[cfg(feature = "tracing")]
      trace!("Replacing value of {}", key);

      *raw = None;
      let old = std::mem::replace(current, Cow::Owned(value));
      return Some(old.into_owned());
    }

    #[cfg(feature = "tracing")]
    trace!("Appending new variable {}", key);

    self.lines.push(EnvLine::Assignment {
      key: Cow::Owned(key.to_string()),
      value: Cow::Owned(value),
      raw: None,
    });

    None
  }

  /// Removes every assignment of `key`. Returns whether anything was removed.
  pub fn unset(&mut self, key: &str) -> bool {
    let before = self.lines.len();
    self
      .lines
      .retain(|line| !matches!(line, EnvLine::Assignment { key: k, .. } if *k == key));
    self.lines.len() != before
  }

  pub fn assignments(&self) -> impl Iterator<Item = (&str, &str)> {
    self.lines.iter().filter_map(|line| match line {
      EnvLine::Assignment { key, value, .. } => Some((key.as_ref(), value.as_ref())),
      _ => None,
    })
  }

  pub fn to_map(&self) -> HashMap<String, String> {
    self
      .assignments()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }
}

/// One line of a `.env` file.
///
/// Parsing a line never fails: anything that is not blank, a comment or a
/// `KEY=value` assignment is kept as [`EnvLine::Malformed`]. Every variant
/// carries the line as read, so lines that were not edited are written back
/// byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvLine<'a> {
  Blank(Cow<'a, str>),
  Comment(Cow<'a, str>),
  Assignment {
    key: Cow<'a, str>,
    value: Cow<'a, str>,
    /// Source line, dropped once the value is replaced.
    raw: Option<Cow<'a, str>>,
  },
  Malformed(Cow<'a, str>),
}

impl<'a> fmt::Display for EnvLine<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EnvLine::Blank(raw) | EnvLine::Comment(raw) | EnvLine::Malformed(raw) => write!(f, "{}", raw),
      EnvLine::Assignment { raw: Some(raw), .. } => write!(f, "{}", raw),
      EnvLine::Assignment { key, value, raw: None } => {
        write!(f, "{}{}{}", key, ASSIGNMENT_OPERATOR, value)
      }
    }
  }
}

impl<'a> From<&'a str> for EnvLine<'a> {
  fn from(s: &'a str) -> Self {
    let trimmed = s.trim();

    if trimmed.is_empty() {
      return EnvLine::Blank(Cow::Borrowed(s));
    }

    if trimmed.starts_with(COMMENT_PREFIX) {
      return EnvLine::Comment(Cow::Borrowed(s));
    }

    match declared_key(trimmed).zip(trimmed.split_once(ASSIGNMENT_OPERATOR)) {
      Some((key, (_, value))) => EnvLine::Assignment {
        key: Cow::Borrowed(key),
        value: Cow::Borrowed(value),
        raw: Some(Cow::Borrowed(s)),
      },
      _ => {
        #[cfg(feature = "tracing")]
        trace!("Skipping malformed line: {:?}", s);

        EnvLine::Malformed(Cow::Borrowed(s))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_env_content() {
    let vars = parse_env_content("FOO=bar\n# comment\nBAZ=\nMALFORMED\n");

    assert_eq!(vars.len(), 2);
    assert_eq!(vars["FOO"], "bar");
    assert_eq!(vars["BAZ"], "");
    assert!(!vars.contains_key("MALFORMED"));
  }

  #[test]
  fn test_value_is_kept_verbatim() {
    let vars = parse_env_content("  KEY = \"quoted value\" \nURL=postgres://u:p@h/db?a=b\n");

    assert_eq!(vars["KEY"], " \"quoted value\"");
    assert_eq!(vars["URL"], "postgres://u:p@h/db?a=b");
  }

  #[test]
  fn test_last_assignment_wins() {
    let vars = parse_env_content("A=1\nA=2\n");
    assert_eq!(vars["A"], "2");
  }

  #[test]
  fn test_empty_key_is_malformed() {
    let vars = parse_env_content("=value\n   \n#A=1\n");
    assert!(vars.is_empty());

    assert_eq!(
      EnvLine::from("=value"),
      EnvLine::Malformed(Cow::Borrowed("=value"))
    );
  }

  #[test]
  fn test_crlf_lines() {
    let vars = parse_env_content("A=1\r\nB=2\r\n");
    assert_eq!(vars["A"], "1");
    assert_eq!(vars["B"], "2");
  }

  #[test]
  fn test_line_kinds() {
    assert_eq!(EnvLine::from(""), EnvLine::Blank(Cow::Borrowed("")));
    assert_eq!(EnvLine::from("   "), EnvLine::Blank(Cow::Borrowed("   ")));
    assert_eq!(
      EnvLine::from("  # note"),
      EnvLine::Comment(Cow::Borrowed("  # note"))
    );
    assert_eq!(
      EnvLine::from("KEY="),
      EnvLine::Assignment {
        key: Cow::Borrowed("KEY"),
        value: Cow::Borrowed(""),
        raw: Some(Cow::Borrowed("KEY=")),
      }
    );
    assert_eq!(
      EnvLine::from("just words"),
      EnvLine::Malformed(Cow::Borrowed("just words"))
    );
  }

  #[test]
  fn test_declared_key() {
    assert_eq!(declared_key(" DB_HOST =x"), Some("DB_HOST"));
    assert_eq!(declared_key("# DB_HOST=x"), None);
    assert_eq!(declared_key("DB_HOST"), None);
  }

  #[test]
  fn test_set_existing_and_new() {
    let input = "# Database\nDB_HOST=localhost\nDB_PORT=5432";
    let mut doc = EnvDocument::from(input);

    assert_eq!(doc.set("DB_HOST", "db.internal"), Some("localhost".to_string()));
    assert_eq!(doc.set("API_KEY", "abc"), None);

    assert_eq!(
      doc.to_string(),
      "# Database\nDB_HOST=db.internal\nDB_PORT=5432\nAPI_KEY=abc\n"
    );
  }

  #[test]
  fn test_set_updates_effective_assignment() {
    let mut doc = EnvDocument::from("A=1\nA=2");
    doc.set("A", "3");

    assert_eq!(doc.get("A"), Some("3"));
    assert_eq!(doc.to_string(), "A=1\nA=3\n");
  }

  #[test]
  fn test_set_leaves_other_lines_untouched() {
    let mut doc = EnvDocument::from("  # indented note\nexport  A = 1\n   \nC = 3\n");

    doc.set("B", "2");
    doc.set("C", "4");

    assert_eq!(
      doc.to_string(),
      "  # indented note\nexport  A = 1\n   \nC=4\nB=2\n"
    );
  }

  #[test]
  fn test_unset() {
    let mut doc = EnvDocument::from("A=1\n# keep\nB=2\nA=3\n");

    assert!(doc.unset("A"));
    assert!(!doc.unset("A"));
    assert_eq!(doc.to_string(), "# keep\nB=2\n");
  }

  #[test]
  fn test_roundtrip_preserves_comments_and_malformed_lines() {
    let input = "# header\n\nKEY=value\nnot an assignment\n";
    let doc = EnvDocument::from(input);

    assert_eq!(doc.to_string(), input);
    assert_eq!(doc.to_map(), parse_env_content(input));
  }
}
