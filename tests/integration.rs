use env_ui::template::{TemplateVariable, VariableType};
use env_ui::workspace::{EnvWorkspace, WorkspaceError};
use std::fs;
use tempfile::TempDir;

const TEMPLATE: &str = "# Environment variables template

# Public name of the app
# @type:string
APP_NAME=


# @group:database
# Primary database
# @type:url @required
DATABASE_URL=

# @type:number
DB_POOL=


# @group:auth
# @type:secret @required
JWT_SECRET=

";

fn workspace_with_files(files: &[(&str, &str)]) -> (TempDir, EnvWorkspace) {
  let temp_dir = TempDir::new().unwrap();
  for (name, content) in files {
    fs::write(temp_dir.path().join(name), content).unwrap();
  }
  let workspace = EnvWorkspace::new(temp_dir.path());
  (temp_dir, workspace)
}

#[test]
fn test_list_orders_reserved_files_first() {
  let (temp_dir, workspace) = workspace_with_files(&[
    (".env.staging", "A=1\n"),
    (".env", "A=2\n"),
    (".env.template", TEMPLATE),
    (".env.dev", ""),
    ("README.md", "not an env file"),
  ]);
  fs::create_dir(temp_dir.path().join(".env.d")).unwrap();

  let files = workspace.list().unwrap();
  let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();

  assert_eq!(names, vec![".env.template", ".env", ".env.dev", ".env.staging"]);
  assert!(files[0].is_template && !files[0].is_active);
  assert!(files[1].is_active && !files[1].is_template);
  assert_eq!(files[3].size, 4);
}

#[test]
fn test_create_seeds_from_template() {
  let (temp_dir, workspace) = workspace_with_files(&[(".env.template", TEMPLATE)]);

  let name = workspace.create("staging").unwrap();

  assert_eq!(name, ".env.staging");
  assert_eq!(
    fs::read_to_string(temp_dir.path().join(".env.staging")).unwrap(),
    TEMPLATE
  );
  assert!(matches!(
    workspace.create("staging"),
    Err(WorkspaceError::AlreadyExists(_))
  ));
  assert!(matches!(
    workspace.create("../escape"),
    Err(WorkspaceError::InvalidName(_))
  ));
}

#[test]
fn test_create_without_template_is_empty() {
  let (temp_dir, workspace) = workspace_with_files(&[]);

  workspace.create("local").unwrap();

  assert_eq!(
    fs::read_to_string(temp_dir.path().join(".env.local")).unwrap(),
    ""
  );
}

#[test]
fn test_activate_and_delete() {
  let (temp_dir, workspace) = workspace_with_files(&[
    (".env", "MODE=dev\n"),
    (".env.prod", "MODE=prod\n"),
  ]);

  workspace.activate(".env.prod").unwrap();
  assert_eq!(
    fs::read_to_string(temp_dir.path().join(".env")).unwrap(),
    "MODE=prod\n"
  );

  workspace.delete(".env.prod").unwrap();
  assert!(!temp_dir.path().join(".env.prod").exists());

  assert!(matches!(
    workspace.activate(".env.prod"),
    Err(WorkspaceError::NotFound(_))
  ));
  assert!(matches!(
    workspace.delete(".env.prod"),
    Err(WorkspaceError::NotFound(_))
  ));
}

#[test]
fn test_validate_file_against_template() {
  let (_temp_dir, workspace) = workspace_with_files(&[
    (".env.template", TEMPLATE),
    (".env", "DATABASE_URL=postgres://localhost/app\nJWT_SECRET=s3cr3t\n"),
    (".env.partial", "APP_NAME=demo\n# JWT_SECRET=\nDATABASE_URL=\n"),
  ]);

  assert!(workspace.validate(".env").unwrap().valid);

  let result = workspace.validate(".env.partial").unwrap();
  assert!(!result.valid);
  assert_eq!(result.errors, vec!["Required variable 'JWT_SECRET' not found"]);
}

#[test]
fn test_template_parse_serialize_is_stable() {
  let (temp_dir, workspace) = workspace_with_files(&[(".env.template", TEMPLATE)]);

  let template = workspace.load_template().unwrap();
  assert_eq!(template.groups, vec!["database", "auth"]);
  assert_eq!(template.variables.len(), 4);

  workspace.save_template(&template).unwrap();

  assert_eq!(
    fs::read_to_string(temp_dir.path().join(".env.template")).unwrap(),
    TEMPLATE
  );
}

#[test]
fn test_edit_template() {
  let (_temp_dir, workspace) = workspace_with_files(&[(".env.template", TEMPLATE)]);

  let mut redis = TemplateVariable::new("REDIS_URL");
  redis.kind = VariableType::Url;
  redis.required = true;
  redis.group = "cache".to_string();
  redis.description = "Cache server".to_string();

  workspace
    .edit_template(|template| {
      template.remove_variable("DB_POOL");
      template.add_variable(redis)
    })
    .unwrap();

  let template = workspace.load_template().unwrap();
  assert_eq!(template.groups, vec!["database", "auth", "cache"]);
  assert!(template.get("DB_POOL").is_none());

  let redis = template.get("REDIS_URL").unwrap();
  assert_eq!(redis.kind, VariableType::Url);
  assert_eq!(redis.group, "cache");
  assert_eq!(redis.description, "Cache server");

  let result = workspace.validate_content("DATABASE_URL=x\nJWT_SECRET=y\n").unwrap();
  assert_eq!(result.errors, vec!["Required variable 'REDIS_URL' not found"]);

  let invalid = workspace.edit_template(|template| template.add_variable(TemplateVariable::new("BAD KEY")));
  assert!(matches!(invalid, Err(WorkspaceError::Template(_))));
}

#[test]
fn test_load_template_creates_missing_template() {
  let (temp_dir, workspace) = workspace_with_files(&[]);

  let template = workspace.load_template().unwrap();

  assert!(template.variables.is_empty());
  assert!(temp_dir.path().join(".env.template").exists());
}

#[cfg(unix)]
#[test]
fn test_list_follows_symlinks() {
  let (temp_dir, workspace) = workspace_with_files(&[(".env.local", "MODE=local\n")]);
  std::os::unix::fs::symlink(".env.local", temp_dir.path().join(".env")).unwrap();
  std::os::unix::fs::symlink(".env.gone", temp_dir.path().join(".env.broken")).unwrap();

  let files = workspace.list().unwrap();
  let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();

  assert_eq!(names, vec![".env", ".env.local"]);
  assert!(files[0].is_active);
  assert_eq!(files[0].size, "MODE=local\n".len() as u64);
}
