use clap::{Parser, Subcommand};
use env_ui::parse::{EnvDocument, parse_env_content};
use env_ui::template::{Template, TemplateVariable, VariableType, normalize_description};
use env_ui::validate::ValidationResult;
use env_ui::workspace::{DEFAULT_ACTIVE_FILENAME, DEFAULT_TEMPLATE_FILENAME, EnvFileInfo, EnvWorkspace};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
  name = "env-ui",
  about = "View, edit and validate the .env files of a project",
  version,
  author
)]
struct Cli {
  /// Directory holding the .env files
  #[arg(short, long, global = true, env = "ENV_UI_DIR", default_value = ".")]
  dir: PathBuf,

  /// Name of the template file
  #[arg(short = 't', long = "template", global = true, default_value = DEFAULT_TEMPLATE_FILENAME)]
  template_file: String,

  /// Name of the active env file
  #[arg(short = 'a', long = "active", global = true, default_value = DEFAULT_ACTIVE_FILENAME)]
  active_file: String,

  /// Print machine-readable JSON
  #[arg(long, global = true)]
  json: bool,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List the .env files of the directory
  List,
  /// Show the variables of an env file
  Show { file: String },
  /// Check that an env file declares every required template variable
  Validate { file: String },
  /// Copy an env file over the active one
  Activate { file: String },
  /// Create .env.<SUFFIX>, seeded with the template
  Create { suffix: String },
  /// Delete an env file
  Delete { file: String },
  /// Set a variable in an env file
  Set {
    file: String,
    #[arg(value_parser = parse_key)]
    key: String,
    #[arg(value_parser = parse_value)]
    value: String,
  },
  /// Remove a variable from an env file
  Unset { file: String, key: String },
  /// Inspect or edit the template
  #[command(subcommand)]
  Template(TemplateCommand),
}

#[derive(Subcommand)]
enum TemplateCommand {
  /// Show the template variables by group
  Show,
  /// Rewrite the template in its normalized layout
  Fmt,
  /// Add a variable
  AddVar {
    key: String,
    #[arg(long = "type", default_value = "string")]
    kind: VariableType,
    #[arg(long)]
    required: bool,
    #[arg(long, default_value = "")]
    group: String,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// Remove every declaration of a variable
  RemoveVar { key: String },
  /// Update the metadata of a variable
  UpdateVar {
    key: String,
    #[arg(long = "type")]
    kind: Option<VariableType>,
    #[arg(long)]
    required: Option<bool>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
}

fn parse_key(key: &str) -> Result<String, String> {
  let key = key.trim();
  if key.is_empty() || key.starts_with('#') || key.contains('=') || key.contains(char::is_whitespace) {
    return Err(format!("'{}' is not a valid variable name", key));
  }
  Ok(key.to_string())
}

fn parse_value(value: &str) -> Result<String, String> {
  if value.contains(['\n', '\r']) {
    return Err("values cannot span several lines".to_string());
  }
  Ok(value.to_string())
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let workspace = EnvWorkspace::new(cli.dir)
    .with_active_name(cli.active_file)
    .with_template_name(cli.template_file);

  match cli.command {
    Command::List => {
      let files = workspace.list()?;
      if cli.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
      } else {
        print_files(&files);
      }
    }
    Command::Show { file } => {
      let content = workspace.read(&file)?;
      let variables: BTreeMap<String, String> = parse_env_content(&content).into_iter().collect();
      if cli.json {
        println!("{}", serde_json::to_string_pretty(&variables)?);
      } else {
        for (key, value) in &variables {
          println!("{}={}", key, value);
        }
      }
    }
    Command::Validate { file } => {
      let result = workspace.validate(&file)?;
      if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
      } else {
        print_validation(&file, &result);
      }
      if !result.valid {
        std::process::exit(1);
      }
    }
    Command::Activate { file } => {
      workspace.activate(&file)?;
      println!("Activated {} as {}", file, workspace.active_name());
    }
    Command::Create { suffix } => {
      let name = workspace.create(&suffix)?;
      println!("Created {}", name);
    }
    Command::Delete { file } => {
      workspace.delete(&file)?;
      println!("Deleted {}", file);
    }
    Command::Set { file, key, value } => {
      let content = workspace.read(&file)?;
      let mut document = EnvDocument::from(content.as_str());
      document.set(&key, value);
      workspace.save(&file, &document.to_string())?;
    }
    Command::Unset { file, key } => {
      let content = workspace.read(&file)?;
      let mut document = EnvDocument::from(content.as_str());
      if !document.unset(&key) {
        return Err(format!("{} is not set in {}", key, file).into());
      }
      workspace.save(&file, &document.to_string())?;
    }
    Command::Template(command) => run_template(&workspace, command, cli.json)?,
  }

  Ok(())
}

fn run_template(
  workspace: &EnvWorkspace,
  command: TemplateCommand,
  json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
  match command {
    TemplateCommand::Show => {
      let template = workspace.load_template()?;
      if json {
        println!("{}", serde_json::to_string_pretty(&template)?);
      } else {
        print_template(&template);
      }
    }
    TemplateCommand::Fmt => {
      let template = workspace.load_template()?;
      workspace.save_template(&template)?;
    }
    TemplateCommand::AddVar {
      key,
      kind,
      required,
      group,
      description,
    } => {
      workspace.edit_template(|template| {
        template.add_variable(TemplateVariable {
          key,
          description,
          kind,
          required,
          group,
        })
      })?;
    }
    TemplateCommand::RemoveVar { key } => {
      let mut template = workspace.load_template()?;
      if template.remove_variable(&key) == 0 {
        return Err(format!("{} is not declared in the template", key).into());
      }
      workspace.save_template(&template)?;
    }
    TemplateCommand::UpdateVar {
      key,
      kind,
      required,
      group,
      description,
    } => {
      let mut template = workspace.load_template()?;
      if template.get(&key).is_none() {
        return Err(format!("{} is not declared in the template", key).into());
      }

      let description = description.as_deref().map(normalize_description).transpose()?;
      let group = group.map(|group| group.trim().to_string());
      if let Some(group) = group.as_deref().filter(|group| !group.is_empty()) {
        template.add_group(group)?;
      }

      for variable in template.variables_mut(&key) {
        if let Some(kind) = kind {
          variable.kind = kind;
        }
        if let Some(required) = required {
          variable.required = required;
        }
        if let Some(group) = &group {
          variable.group = group.clone();
        }
        if let Some(description) = &description {
          variable.description = description.clone();
        }
      }

      workspace.save_template(&template)?;
    }
  }

  Ok(())
}

fn print_files(files: &[EnvFileInfo]) {
  for file in files {
    let role = if file.is_template {
      "template"
    } else if file.is_active {
      "active"
    } else {
      ""
    };

    println!(
      "{:<24} {:<8} {:>8} B  {}",
      file.name,
      role,
      file.size,
      file.last_modified.format("%Y-%m-%d %H:%M")
    );
  }
}

fn print_validation(file: &str, result: &ValidationResult) {
  if result.valid {
    println!("{} is valid", file);
    return;
  }

  println!("{} has {} problem(s):", file, result.errors.len());
  for error in &result.errors {
    println!("  - {}", error);
  }
}

fn print_template(template: &Template) {
  let sections = std::iter::once("").chain(template.groups.iter().map(String::as_str));

  for group in sections {
    let members: Vec<&TemplateVariable> =
      template.variables.iter().filter(|var| var.group == group).collect();
    if members.is_empty() && group.is_empty() {
      continue;
    }

    println!("[{}]", if group.is_empty() { "ungrouped" } else { group });
    for variable in members {
      let required = if variable.required { "required" } else { "optional" };
      let summary = variable.description.lines().next().unwrap_or_default();
      println!(
        "  {:<24} {:<8} {:<8} {}",
        variable.key, variable.kind, required, summary
      );
    }
  }
}
