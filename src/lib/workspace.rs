//! `.env` files of a project directory.
//!
//! [`EnvWorkspace`] lists, reads, writes, activates, creates and deletes the
//! `.env*` files of one directory, and validates them against the workspace
//! template. Two names are reserved: the active file (`.env`), which the
//! application actually loads, and the template (`.env.template`).
//!
//! Every operation reads or writes whole files. Nothing is cached between
//! calls.
//!
//! # Examples
//!
//! ```rust,no_run
//! use env_ui::workspace::EnvWorkspace;
//!
//! let workspace = EnvWorkspace::new(".");
//!
//! for file in workspace.list().unwrap() {
//!     println!("{} ({} bytes)", file.name, file.size);
//! }
//!
//! workspace.activate(".env.staging").unwrap();
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

use crate::{
  template::{Template, TemplateError, TEMPLATE_HEADER, parse_template_content},
  validate::{ValidationResult, validate},
};

pub const DEFAULT_ACTIVE_FILENAME: &str = ".env";
pub const DEFAULT_TEMPLATE_FILENAME: &str = ".env.template";

const ENV_FILE_PREFIX: &str = ".env";

/// A `.env*` file as seen on disk when the workspace was listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvFileInfo {
  pub name: String,
  pub is_active: bool,
  pub is_template: bool,
  pub size: u64,
  pub last_modified: DateTime<Local>,
}

/// The `.env*` files of a single directory.
#[derive(Debug, Clone)]
pub struct EnvWorkspace {
  root: PathBuf,
  active_name: String,
  template_name: String,
}

impl EnvWorkspace {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      active_name: DEFAULT_ACTIVE_FILENAME.to_string(),
      template_name: DEFAULT_TEMPLATE_FILENAME.to_string(),
    }
  }

  pub fn with_active_name(mut self, name: impl Into<String>) -> Self {
    self.active_name = name.into();
    self
  }

  pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
    self.template_name = name.into();
    self
  }

  pub fn active_name(&self) -> &str {
    &self.active_name
  }

  /// Lists the `.env*` files: template first, then the active file, then the
  /// rest by name.
  pub fn list(&self) -> Result<Vec<EnvFileInfo>, WorkspaceError> {
    #[cfg(feature = "tracing")]
    debug!(root = ?self.root, "Listing env files");

    let entries = std::fs::read_dir(&self.root).map_err(WorkspaceError::List)?;

    let mut files = Vec::new();
    for entry in entries {
      let entry = entry.map_err(WorkspaceError::List)?;
      let Ok(name) = entry.file_name().into_string() else {
        continue;
      };
      if !self.is_env_name(&name) {
        continue;
      }

      // Follows symlinks, so a linked `.env` is listed as the file it points to.
      let metadata = match std::fs::metadata(entry.path()) {
        Ok(metadata) => metadata,
        Err(_err) => {
          #[cfg(feature = "tracing")]
          trace!("Skipping {}: {}", name, _err);

          continue;
        }
      };
      if !metadata.is_file() {
        continue;
      }
      let modified = metadata.modified().map_err(WorkspaceError::List)?;

      files.push(EnvFileInfo {
        is_active: name == self.active_name,
        is_template: name == self.template_name,
        size: metadata.len(),
        last_modified: DateTime::<Local>::from(modified),
        name,
      });
    }

    files.sort_by(|a, b| {
      (!a.is_template, !a.is_active, &a.name).cmp(&(!b.is_template, !b.is_active, &b.name))
    });

    #[cfg(feature = "tracing")]
    debug!("Found {} env files", files.len());

    Ok(files)
  }

  /// Reads a file. A missing template is created with just the header line.
  pub fn read(&self, name: &str) -> Result<String, WorkspaceError> {
    let path = self.path_of(name)?;

    if !path.exists() {
      if name != self.template_name {
        return Err(WorkspaceError::NotFound(path));
      }

      #[cfg(feature = "tracing")]
      info!("Creating missing template {:?}", path);

      std::fs::write(&path, format!("{}\n", TEMPLATE_HEADER))
        .map_err(|err| WorkspaceError::Write(path.clone(), err))?;
    }

    std::fs::read_to_string(&path).map_err(|err| WorkspaceError::Read(path, err))
  }

  /// Overwrites a file with `content`.
  pub fn save(&self, name: &str, content: &str) -> Result<(), WorkspaceError> {
    let path = self.path_of(name)?;

    #[cfg(feature = "tracing")]
    debug!("Writing {} bytes to {:?}", content.len(), path);

    std::fs::write(&path, content).map_err(|err| WorkspaceError::Write(path, err))
  }

  /// Copies the content of `name` over the active file.
  pub fn activate(&self, name: &str) -> Result<(), WorkspaceError> {
    let source = self.path_of(name)?;
    if !source.exists() {
      return Err(WorkspaceError::NotFound(source));
    }

    let content = std::fs::read_to_string(&source).map_err(|err| WorkspaceError::Read(source, err))?;
    self.save(&self.active_name, &content)?;

    #[cfg(feature = "tracing")]
    info!("Activated {} as {}", name, self.active_name);

    Ok(())
  }

  /// Creates `.env.<suffix>`, seeded with the template when there is one.
  /// Returns the name of the new file.
  pub fn create(&self, suffix: &str) -> Result<String, WorkspaceError> {
    let suffix = suffix.trim();
    if suffix.is_empty() {
      return Err(WorkspaceError::InvalidName(suffix.to_string()));
    }

    let name = format!("{}.{}", ENV_FILE_PREFIX, suffix);
    let path = self.path_of(&name)?;
    if path.exists() {
      return Err(WorkspaceError::AlreadyExists(path));
    }

    let content = self.template_content()?.unwrap_or_default();

    #[cfg(feature = "tracing")]
    info!("Creating {:?}", path);

    std::fs::write(&path, content).map_err(|err| WorkspaceError::Write(path, err))?;
    Ok(name)
  }

  /// Deletes a file. The active file and the template cannot be deleted.
  pub fn delete(&self, name: &str) -> Result<(), WorkspaceError> {
    if name == self.active_name || name == self.template_name {
      return Err(WorkspaceError::Protected(name.to_string()));
    }

    let path = self.path_of(name)?;
    if !path.exists() {
      return Err(WorkspaceError::NotFound(path));
    }

    #[cfg(feature = "tracing")]
    info!("Deleting {:?}", path);

    std::fs::remove_file(&path).map_err(|err| WorkspaceError::Delete(path, err))
  }

  /// Validates a file of the workspace against the template.
  pub fn validate(&self, name: &str) -> Result<ValidationResult, WorkspaceError> {
    let content = self.read(name)?;
    self.validate_content(&content)
  }

  /// Validates unsaved content against the template.
  pub fn validate_content(&self, content: &str) -> Result<ValidationResult, WorkspaceError> {
    let template = self.template_content()?;
    Ok(validate(content, template.as_deref()))
  }

  /// Parses the template, creating it first if it is missing.
  pub fn load_template(&self) -> Result<Template, WorkspaceError> {
    let content = self.read(&self.template_name)?;
    Ok(parse_template_content(&content))
  }

  pub fn save_template(&self, template: &Template) -> Result<(), WorkspaceError> {
    self.save(&self.template_name, &template.to_string())
  }

  /// Loads the template, applies `edit` and writes the result back.
  ///
  /// The template is rewritten in its normalized layout, so comments that are
  /// not attached to a variable and declared values are not preserved.
  pub fn edit_template<F>(&self, edit: F) -> Result<Template, WorkspaceError>
  where
    F: FnOnce(&mut Template) -> Result<(), TemplateError>,
  {
    let mut template = self.load_template()?;
    edit(&mut template)?;
    self.save_template(&template)?;
    Ok(template)
  }

  fn template_content(&self) -> Result<Option<String>, WorkspaceError> {
    let path = self.path_of(&self.template_name)?;
    if !path.exists() {
      return Ok(None);
    }

    std::fs::read_to_string(&path)
      .map(Some)
      .map_err(|err| WorkspaceError::Read(path, err))
  }

  /// `.env*` names, plus the two reserved names whatever they are.
  fn is_env_name(&self, name: &str) -> bool {
    name.starts_with(ENV_FILE_PREFIX) || name == self.active_name || name == self.template_name
  }

  /// Resolves a file name inside the workspace. Only `.env*` names or the
  /// reserved names, without path separators, are accepted.
  fn path_of(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
    let valid = self.is_env_name(name) && !name.contains(['/', '\\']) && !matches!(name, "" | "." | "..");

    if !valid {
      return Err(WorkspaceError::InvalidName(name.to_string()));
    }

    Ok(self.root.join(name))
  }
}

/// Errors that can occur while working with the files of a workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
  /// Error reading the workspace directory
  #[error("Failed to list env files: {0}")]
  List(std::io::Error),
  /// Error reading a file
  #[error("Failed to read {0}: {1}")]
  Read(PathBuf, std::io::Error),
  /// Error writing a file
  #[error("Failed to write {0}: {1}")]
  Write(PathBuf, std::io::Error),
  /// Error removing a file
  #[error("Failed to delete {0}: {1}")]
  Delete(PathBuf, std::io::Error),
  /// The file does not exist
  #[error("File not found: {0}")]
  NotFound(PathBuf),
  /// The file to create already exists
  #[error("File already exists: {0}")]
  AlreadyExists(PathBuf),
  /// The active file and the template cannot be deleted
  #[error("Deleting {0} is not allowed")]
  Protected(String),
  /// The name does not designate a `.env*` file of the workspace
  #[error("Invalid env file name: {0:?}")]
  InvalidName(String),
  /// The template could not be edited
  #[error(transparent)]
  Template(#[from] TemplateError),
}
