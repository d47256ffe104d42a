//! Annotated `.env` templates.
//!
//! A template is a `.env` file whose comments describe the variables a project
//! expects. Annotations live in the comment lines directly above a declaration:
//!
//! ```text
//! # @group:<name>            sets the group of every following variable
//! # <free text>              description of the next variable
//! # @type:<string|number|boolean|secret|url>
//! # @required
//! <KEY>=<ignored value>
//! ```
//!
//! [`parse_template_content`] never fails: unknown types are ignored, missing
//! annotations fall back to defaults and comments that are not attached to a
//! declaration are dropped. [`serialize_template_content`] writes the variables
//! back grouped and annotated, with every value left empty.
//!
//! # Example
//!
//! ```rust
//! use env_ui::template::{parse_template_content, VariableType};
//!
//! let template = parse_template_content("# @type:url\n# @required\n# Connection string\nDATABASE_URL=\n");
//! let variable = &template.variables[0];
//!
//! assert_eq!(variable.key, "DATABASE_URL");
//! assert_eq!(variable.kind, VariableType::Url);
//! assert!(variable.required);
//! assert_eq!(variable.description, "Connection string");
//! ```

use std::{fmt, str::FromStr};

use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::parse::{ASSIGNMENT_OPERATOR, COMMENT_PREFIX, declared_key};

/// First line of every serialized template.
pub const TEMPLATE_HEADER: &str = "# Environment variables template";

const GROUP_MARKER: &str = "# @group:";
const GROUP_ANNOTATION: &str = "@group:";
const TYPE_ANNOTATION: &str = "@type:";
const REQUIRED_ANNOTATION: &str = "@required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
  #[default]
  String,
  Number,
  Boolean,
  Secret,
  Url,
}

impl VariableType {
  pub const ALL: [VariableType; 5] = [
    VariableType::String,
    VariableType::Number,
    VariableType::Boolean,
    VariableType::Secret,
    VariableType::Url,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      VariableType::String => "string",
      VariableType::Number => "number",
      VariableType::Boolean => "boolean",
      VariableType::Secret => "secret",
      VariableType::Url => "url",
    }
  }
}

impl fmt::Display for VariableType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

impl FromStr for VariableType {
  type Err = TemplateError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| TemplateError::UnknownType(s.to_string()))
  }
}

/// A variable declared by the template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TemplateVariable {
  pub key: String,
  /// Newline-joined description lines, empty when there are none.
  pub description: String,
  #[serde(rename = "type")]
  pub kind: VariableType,
  pub required: bool,
  /// Empty when the variable is ungrouped.
  pub group: String,
}

impl TemplateVariable {
  pub fn new(key: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      ..Default::default()
    }
  }

  /// Reads the annotations of the comment block directly above a declaration.
  ///
  /// `preceding` holds every line before the declaration. The walk goes upward
  /// and stops at the first line that is not a comment, so the nearest lines
  /// are seen first: the nearest valid `@type:` wins, and description lines are
  /// collected in reverse and flipped back at the end.
  fn annotate(&mut self, preceding: &[&str]) {
    let mut kind = None;
    let mut description = Vec::new();

    let block = preceding
      .iter()
      .rev()
      .map(|line| line.trim())
      .take_while(|line| line.starts_with(COMMENT_PREFIX));

    for comment in block {
      if comment.contains(TYPE_ANNOTATION) && kind.is_none() {
        kind = type_annotation(comment);
      }

      if comment.contains(REQUIRED_ANNOTATION) {
        self.required = true;
      }

      if !is_annotation(comment) {
        let text = comment[COMMENT_PREFIX.len()..].trim();
        if !text.is_empty() {
          description.push(text);
        }
      }
    }

    description.reverse();
    self.description = description.join("\n");
    self.kind = kind.unwrap_or_default();
  }
}

impl fmt::Display for TemplateVariable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !self.description.is_empty() {
      for line in self.description.split('\n') {
        writeln!(f, "{} {}", COMMENT_PREFIX, line)?;
      }
    }

    write!(f, "{} {}{}", COMMENT_PREFIX, TYPE_ANNOTATION, self.kind)?;
    if self.required {
      write!(f, " {}", REQUIRED_ANNOTATION)?;
    }
    writeln!(f)?;

    write!(f, "{}{}", self.key, ASSIGNMENT_OPERATOR)
  }
}

fn is_annotation(comment: &str) -> bool {
  comment.contains(TYPE_ANNOTATION)
    || comment.contains(REQUIRED_ANNOTATION)
    || comment.contains(GROUP_ANNOTATION)
}

/// First word token following a `@type:` marker, if it names a known type.
///
/// Markers with nothing word-like right after them are skipped, so
/// `@type: @type:url` reads as `url`.
fn type_annotation(comment: &str) -> Option<VariableType> {
  let token = comment
    .match_indices(TYPE_ANNOTATION)
    .map(|(index, marker)| {
      let rest = &comment[index + marker.len()..];
      let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
      &rest[..end]
    })
    .find(|token| !token.is_empty())?;

  match token.parse() {
    Ok(kind) => Some(kind),
    Err(_err) => {
      #[cfg(feature = "tracing")]
      trace!("Ignoring {}", _err);

      None
    }
  }
}

/// Parsed template: declared variables and the groups in order of appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Template {
  pub variables: Vec<TemplateVariable>,
  pub groups: Vec<String>,
}

/// Parses template text into its variables and groups.
///
/// Variables come out in declaration order. A key declared twice yields two
/// entries. `# @group:` with an empty name returns to ungrouped and is not
/// recorded as a group.
pub fn parse_template_content(content: &str) -> Template {
  let lines: Vec<&str> = content.lines().collect();

  #[cfg(feature = "tracing")]
  debug!("Parsing template with {} lines", lines.len());

  let mut template = Template::default();
  let mut current_group = String::new();

  for (index, line) in lines.iter().enumerate() {
    let line = line.trim();

    if let Some(name) = line.strip_prefix(GROUP_MARKER) {
      current_group = name.trim().to_string();

      #[cfg(feature = "tracing")]
      trace!("Entering group {:?}", current_group);

      if !current_group.is_empty() && !template.groups.contains(&current_group) {
        template.groups.push(current_group.clone());
      }
      continue;
    }

    let Some(key) = declared_key(line) else {
      continue;
    };

    let mut variable = TemplateVariable {
      key: key.to_string(),
      group: current_group.clone(),
      ..Default::default()
    };
    variable.annotate(&lines[..index]);

    #[cfg(feature = "tracing")]
    trace!(
      "Found variable {} (type={}, required={}, group={:?})",
      variable.key, variable.kind, variable.required, variable.group
    );

    template.variables.push(variable);
  }

  #[cfg(feature = "tracing")]
  debug!(
    "Parsed {} variables in {} groups",
    template.variables.len(),
    template.groups.len()
  );

  template
}

/// Writes variables back as template text.
///
/// Ungrouped variables come first, then each group of `groups` in order.
/// Groups without variables are left out, and so are variables whose group is
/// not listed in `groups`.
pub fn serialize_template_content(variables: &[TemplateVariable], groups: &[String]) -> String {
  TemplateWriter { variables, groups }.to_string()
}

struct TemplateWriter<'a> {
  variables: &'a [TemplateVariable],
  groups: &'a [String],
}

impl<'a> fmt::Display for TemplateWriter<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", TEMPLATE_HEADER)?;
    writeln!(f)?;

    let mut written: Vec<&str> = Vec::new();

    for group in std::iter::once("").chain(self.groups.iter().map(String::as_str)) {
      if written.contains(&group) {
        continue;
      }
      written.push(group);

      let mut members = self.variables.iter().filter(|var| var.group == group).peekable();
      if members.peek().is_none() {
        continue;
      }

      if !group.is_empty() {
        writeln!(f)?;
        writeln!(f, "{}{}", GROUP_MARKER, group)?;
      }

      for variable in members {
        writeln!(f, "{}", variable)?;
        writeln!(f)?;
      }
    }

    #[cfg(feature = "tracing")]
    for variable in self.variables {
      if !written.contains(&variable.group.as_str()) {
        warn!(
          "Dropping {}: group {:?} is not listed",
          variable.key, variable.group
        );
      }
    }

    Ok(())
  }
}

impl From<&str> for Template {
  fn from(content: &str) -> Self {
    parse_template_content(content)
  }
}

impl fmt::Display for Template {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let writer = TemplateWriter {
      variables: &self.variables,
      groups: &self.groups,
    };
    fmt::Display::fmt(&writer, f)
  }
}

impl Template {
  /// Last declaration of `key`.
  pub fn get(&self, key: &str) -> Option<&TemplateVariable> {
    self.variables.iter().rev().find(|var| var.key == key)
  }

  /// Every declaration of `key`.
  pub fn variables_mut<'s>(
    &'s mut self,
    key: &'s str,
  ) -> impl Iterator<Item = &'s mut TemplateVariable> + 's {
    self.variables.iter_mut().filter(move |var| var.key == key)
  }

  pub fn required_keys(&self) -> impl Iterator<Item = &str> {
    self
      .variables
      .iter()
      .filter(|var| var.required)
      .map(|var| var.key.as_str())
  }

  /// Registers a group. Returns `false` if it was already known.
  pub fn add_group(&mut self, name: &str) -> Result<bool, TemplateError> {
    let name = name.trim();
    if name.is_empty() || name.contains('\n') {
      return Err(TemplateError::InvalidGroup(name.to_string()));
    }

    if self.groups.iter().any(|group| group == name) {
      return Ok(false);
    }

    self.groups.push(name.to_string());
    Ok(true)
  }

  /// Appends a variable, registering its group if needed.
  ///
  /// Keys must be writable as a bare `KEY=` line.
  pub fn add_variable(&mut self, mut variable: TemplateVariable) -> Result<(), TemplateError> {
    validate_key(&variable.key)?;
    variable.description = normalize_description(&variable.description)?;

    variable.group = variable.group.trim().to_string();
    if !variable.group.is_empty() {
      self.add_group(&variable.group)?;
    }

    self.variables.push(variable);
    Ok(())
  }

  /// Removes every declaration of `key` and returns how many were removed.
  pub fn remove_variable(&mut self, key: &str) -> usize {
    let before = self.variables.len();
    self.variables.retain(|var| var.key != key);
    before - self.variables.len()
  }
}

fn validate_key(key: &str) -> Result<(), TemplateError> {
  let valid = !key.is_empty()
    && !key.starts_with(COMMENT_PREFIX)
    && !key.contains(ASSIGNMENT_OPERATOR)
    && !key.contains(char::is_whitespace);

  if valid {
    Ok(())
  } else {
    Err(TemplateError::InvalidKey(key.to_string()))
  }
}

/// Brings a description into the shape the parser reads back: lines are
/// trimmed and blank ones dropped.
///
/// Lines carrying an annotation marker would be read back as annotations, so
/// they are rejected.
pub fn normalize_description(description: &str) -> Result<String, TemplateError> {
  let mut lines = Vec::new();

  for line in description.lines().map(str::trim).filter(|line| !line.is_empty()) {
    if is_annotation(line) {
      return Err(TemplateError::InvalidDescription(line.to_string()));
    }
    lines.push(line);
  }

  Ok(lines.join("\n"))
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
  #[error("Invalid variable key: {0:?}")]
  InvalidKey(String),
  #[error("Invalid group name: {0:?}")]
  InvalidGroup(String),
  #[error("Description line {0:?} would be read back as an annotation")]
  InvalidDescription(String),
  #[error("Unknown variable type '{0}', expected one of: string, number, boolean, secret, url")]
  UnknownType(String),
}
