//! SG-014: CLI subcommands (init, validate, plan, compile, digest).

pub mod logging;

use crate::core::{assembler, digest, emitter, parser, types};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new stepgraph project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate stepgraph.yaml without compiling
    Validate {
        /// Path to stepgraph.yaml
        #[arg(short, long, default_value = "stepgraph.yaml")]
        file: PathBuf,
    },

    /// Show the job chain the plan compiles to
    Plan {
        /// Path to stepgraph.yaml
        #[arg(short, long, default_value = "stepgraph.yaml")]
        file: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Compile the plan and write the document stream
    Compile {
        /// Path to stepgraph.yaml
        #[arg(short, long, default_value = "stepgraph.yaml")]
        file: PathBuf,

        /// Output file (`-` for stdout)
        #[arg(short, long, default_value = "stepgraph-pipeline.yml")]
        output: PathBuf,

        /// Output format (overrides policy.format)
        #[arg(long, value_enum)]
        format: Option<types::OutputFormat>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the BLAKE3 digest of an emitted document stream
    Digest {
        /// Emitted file
        #[arg(default_value = "stepgraph-pipeline.yml")]
        file: PathBuf,
    },
}

/// Flags that override values from stepgraph.yaml.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Pipeline identifier used in job names
    #[arg(long)]
    pub pipeline_id: Option<u32>,

    /// Handling for steps with no recognized kind
    #[arg(long, value_enum)]
    pub unknown_steps: Option<types::UnknownStepPolicy>,
}

impl Overrides {
    fn apply(&self, config: &mut types::PipelineConfig) {
        if let Some(id) = self.pipeline_id {
            config.pipeline_id = id;
        }
        if let Some(policy) = self.unknown_steps {
            config.policy.unknown_steps = policy;
        }
    }
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan { file, overrides } => cmd_plan(&file, &overrides),
        Commands::Compile {
            file,
            output,
            format,
            overrides,
        } => cmd_compile(&file, &output, format, &overrides),
        Commands::Digest { file } => cmd_digest(&file),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("stepgraph.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let template = r#"version: "1.0"
name: pipeline
pipeline_id: 0

storage:
  type: gcs
  location: gs://stepgraph-blobstore/blobs
  dir: "true"
  secret:
    field: GOOGLE_APPLICATION_CREDENTIALS
    key: service-account-key.json
    name: service-account

policy:
  unknown_steps: fail
  format: json

steps:
  - fetch:
      name: booklit
      resource: booklit
      type: git
      source:
        uri: https://github.com/vito/booklit
      version:
        ref: HEAD
  - run:
      name: test
      image: golang
      path: booklit/ci/test
      args: []
      env:
        GIT_BRANCH: master
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized stepgraph project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!("OK: {} ({} steps)", config.name, config.steps.len());
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse, apply CLI overrides, and validate a stepgraph file.
fn parse_and_validate(file: &Path, overrides: &Overrides) -> Result<types::PipelineConfig, String> {
    let mut config = parser::parse_config_file(file)?;
    overrides.apply(&mut config);
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn cmd_plan(file: &Path, overrides: &Overrides) -> Result<(), String> {
    let config = parse_and_validate(file, overrides)?;
    let compiled = assembler::assemble(&config).map_err(|e| e.to_string())?;
    print_plan(&config, &compiled);
    Ok(())
}

/// Display the compiled chain to stdout.
fn print_plan(config: &types::PipelineConfig, compiled: &assembler::CompiledPipeline) {
    println!(
        "Planning: {} ({} steps, pipeline id {})",
        config.name,
        config.steps.len(),
        config.pipeline_id
    );
    println!();

    let mut nodes = compiled.graph.spec.tasks.iter().zip(&compiled.jobs);
    for (index, step) in config.steps.iter().enumerate() {
        let Some(variant) = step.variant() else {
            println!("  - step {}: skipped (no recognized kind)", index);
            continue;
        };
        let Some((node, job)) = nodes.next() else {
            break;
        };
        let after = if node.run_after.is_empty() {
            "-".to_string()
        } else {
            node.run_after.join(", ")
        };
        println!(
            "  + {} {} {} [{}] after: {}",
            node.name,
            variant.kind(),
            variant.name(),
            job.sub_step_names().join(" -> "),
            after
        );
    }

    println!();
    println!(
        "Plan: {} job(s), {} skipped, shared store {}.",
        compiled.jobs.len(),
        compiled.skipped.len(),
        compiled.storage.metadata.name
    );
}

fn cmd_compile(
    file: &Path,
    output: &Path,
    format: Option<types::OutputFormat>,
    overrides: &Overrides,
) -> Result<(), String> {
    let config = parse_and_validate(file, overrides)?;
    let format = format.unwrap_or(config.policy.format);

    let compiled = assembler::assemble(&config).map_err(|e| e.to_string())?;
    let rendered = emitter::emit(&compiled, format, output).map_err(|e| e.to_string())?;

    let summary = format!(
        "Compiled {}: {} job(s), {} skipped -> {} ({})",
        config.name,
        compiled.jobs.len(),
        compiled.skipped.len(),
        output.display(),
        digest::digest_str(&rendered)
    );
    if output == Path::new(emitter::STDOUT) {
        eprintln!("{}", summary);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

fn cmd_digest(file: &Path) -> Result<(), String> {
    let hash = digest::digest_file(file)?;
    println!("{}  {}", hash, file.display());
    Ok(())
}
