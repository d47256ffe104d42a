//! Environment file management library.
//!
//! This library reads and edits the `.env` files of a project and validates
//! them against an annotated template that documents the expected variables:
//! their type, whether they are required, which group they belong to and what
//! they are for.
//!
//! # Features
//!
//! - **Template annotations**: `# @group:`, `# @type:` and `# @required`
//!   comments parsed into [`template::TemplateVariable`]s and written back
//! - **Permissive parsing**: malformed lines are skipped, never rejected
//! - **Comment-preserving edits**: [`parse::EnvDocument`] updates values in
//!   place
//! - **Workspace operations**: list, activate, create, delete and validate the
//!   `.env*` files of a directory
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust
//! use env_ui::validate::validate;
//!
//! let template = "# @type:url @required\nDATABASE_URL=\n";
//! let result = validate("PORT=8080\n", Some(template));
//!
//! assert!(!result.valid);
//! assert_eq!(result.errors, vec!["Required variable 'DATABASE_URL' not found"]);
//! ```

pub mod parse;
pub mod template;
pub mod validate;
pub mod workspace;
