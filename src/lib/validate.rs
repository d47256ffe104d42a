//! Validation of `.env` content against the required variables of a template.

use std::collections::HashSet;

use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::{parse::declared_key, template::parse_template_content};

/// Outcome of [`validate`]. `valid` is false exactly when `errors` is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
  pub valid: bool,
  pub errors: Vec<String>,
}

impl Default for ValidationResult {
  fn default() -> Self {
    Self {
      valid: true,
      errors: Vec::new(),
    }
  }
}

impl ValidationResult {
  fn push_error(&mut self, error: String) {
    self.valid = false;
    self.errors.push(error);
  }
}

/// Checks that every required template variable is declared in `candidate`.
///
/// Without a template everything is valid. Errors follow the order of the
/// template's declarations; a key declared twice as required is reported twice.
pub fn validate(candidate: &str, template: Option<&str>) -> ValidationResult {
  let mut result = ValidationResult::default();

  let Some(template) = template else {
    #[cfg(feature = "tracing")]
    debug!("No template, skipping validation");

    return result;
  };

  let present: HashSet<&str> = candidate.lines().filter_map(declared_key).collect();

  for key in parse_template_content(template).required_keys() {
    if !present.contains(key) {
      result.push_error(format!("Required variable '{}' not found", key));
    }
  }

  #[cfg(feature = "tracing")]
  debug!(
    "Validated {} declared keys: {} errors",
    present.len(),
    result.errors.len()
  );

  result
}
