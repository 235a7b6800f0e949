//! SG-001: Pipeline description types.
//!
//! Defines the YAML schema for a sequential build plan: pipeline identity,
//! the shared storage backend, compile policy, and the ordered step list.
//! All types derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, order-preserving key-value mapping forwarded to resource drivers.
pub type ConfigMap = IndexMap<String, serde_json::Value>;

// ============================================================================
// Top-level stepgraph.yaml
// ============================================================================

/// Root configuration: one sequential build plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Pipeline name; also the name of the emitted graph document
    #[serde(default = "default_pipeline_name")]
    pub name: String,

    /// Numeric pipeline identifier used in job names
    #[serde(default)]
    pub pipeline_id: u32,

    /// Backend for the shared artifact store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Compile policy
    #[serde(default)]
    pub policy: Policy,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

// ============================================================================
// Storage
// ============================================================================

/// Storage backend for the artifact channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend type (e.g. "gcs")
    #[serde(rename = "type", default = "default_storage_type")]
    pub backend: String,

    /// Bucket location
    #[serde(default = "default_location")]
    pub location: String,

    /// Directory flag passed to the storage resource
    #[serde(default = "default_dir")]
    pub dir: String,

    /// Credential reference for the backend
    #[serde(default)]
    pub secret: SecretRef,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_type(),
            location: default_location(),
            dir: default_dir(),
            secret: SecretRef::default(),
        }
    }
}

fn default_storage_type() -> String {
    "gcs".to_string()
}

fn default_location() -> String {
    "gs://stepgraph-blobstore/blobs".to_string()
}

fn default_dir() -> String {
    "true".to_string()
}

/// Reference to a cluster secret holding backend credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    /// Environment variable the runtime sets to the mounted secret path
    #[serde(default = "default_secret_field")]
    pub field: String,

    /// Key within the secret
    #[serde(default = "default_secret_key")]
    pub key: String,

    /// Secret name
    #[serde(default = "default_secret_name")]
    pub name: String,
}

impl Default for SecretRef {
    fn default() -> Self {
        Self {
            field: default_secret_field(),
            key: default_secret_key(),
            name: default_secret_name(),
        }
    }
}

fn default_secret_field() -> String {
    "GOOGLE_APPLICATION_CREDENTIALS".to_string()
}

fn default_secret_key() -> String {
    "service-account-key.json".to_string()
}

fn default_secret_name() -> String {
    "service-account".to_string()
}

// ============================================================================
// Policy
// ============================================================================

/// Compile policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// What to do with a step that has no recognized kind
    #[serde(default)]
    pub unknown_steps: UnknownStepPolicy,

    /// Output document format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Handling for steps with no recognized kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStepPolicy {
    #[default]
    Fail,
    Skip,
}

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Pretty-printed JSON documents, one after another
    #[default]
    Json,
    /// `---`-separated YAML documents
    Yaml,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

// ============================================================================
// Steps
// ============================================================================

/// One source step. Exactly one of `fetch`, `publish`, `run` should be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunStep>,

    /// Keys this compiler does not understand (e.g. `try`, `aggregate`)
    #[serde(flatten)]
    pub unrecognized: IndexMap<String, serde_yaml_ng::Value>,
}

/// Fetch an artifact through a resource driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchStep {
    /// Logical name; also the artifact directory name
    pub name: String,

    /// Resource identifier
    #[serde(default)]
    pub resource: String,

    /// Resource type tag (git, s3, registry-image, ...)
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default)]
    pub source: ConfigMap,

    #[serde(default)]
    pub params: ConfigMap,

    /// Version selector
    #[serde(default)]
    pub version: Option<ConfigMap>,
}

/// Publish a result through a resource driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishStep {
    pub name: String,

    #[serde(default)]
    pub resource: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default)]
    pub source: ConfigMap,

    #[serde(default)]
    pub params: ConfigMap,
}

/// Run a user command in a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStep {
    pub name: String,

    /// Container image reference
    #[serde(default)]
    pub image: Option<String>,

    /// Image produced by an earlier step; wins over `image`
    #[serde(default)]
    pub image_artifact: Option<String>,

    /// Executable path, relative to the workspace root
    pub path: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub privileged: bool,

    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl RunStep {
    /// The image the user sub-step runs in, if any was given.
    pub fn effective_image(&self) -> Option<&str> {
        self.image_artifact
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.image.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Step kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Fetch,
    Publish,
    Run,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Publish => write!(f, "publish"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// A step narrowed to its single populated variant.
#[derive(Debug, Clone, Copy)]
pub enum StepVariant<'a> {
    Fetch(&'a FetchStep),
    Publish(&'a PublishStep),
    Run(&'a RunStep),
}

impl<'a> StepVariant<'a> {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Fetch(_) => StepKind::Fetch,
            Self::Publish(_) => StepKind::Publish,
            Self::Run(_) => StepKind::Run,
        }
    }

    /// Logical name of the step.
    pub fn name(&self) -> &'a str {
        match self {
            Self::Fetch(f) => &f.name,
            Self::Publish(p) => &p.name,
            Self::Run(r) => &r.name,
        }
    }
}

impl Step {
    /// Kinds whose slot is populated, in declaration order.
    pub fn populated_kinds(&self) -> Vec<StepKind> {
        let mut kinds = Vec::new();
        if self.fetch.is_some() {
            kinds.push(StepKind::Fetch);
        }
        if self.publish.is_some() {
            kinds.push(StepKind::Publish);
        }
        if self.run.is_some() {
            kinds.push(StepKind::Run);
        }
        kinds
    }

    /// The single populated variant, or None when no slot is set.
    /// Callers must reject steps with more than one populated slot first.
    pub fn variant(&self) -> Option<StepVariant<'_>> {
        if let Some(ref f) = self.fetch {
            return Some(StepVariant::Fetch(f));
        }
        if let Some(ref p) = self.publish {
            return Some(StepVariant::Publish(p));
        }
        self.run.as_ref().map(StepVariant::Run)
    }

    /// Logical name of the first populated variant, if any.
    pub fn name(&self) -> Option<&str> {
        self.variant().map(|v| v.name())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sg001_config_parse() {
        let yaml = r#"
version: "1.0"
name: booklit
pipeline_id: 3
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
      env:
        GIT_BRANCH: master
"#;
        let config: PipelineConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.name, "booklit");
        assert_eq!(config.pipeline_id, 3);
        assert_eq!(config.steps.len(), 2);
        let fetch = config.steps[0].fetch.as_ref().unwrap();
        assert_eq!(fetch.resource_type, "git");
        assert_eq!(fetch.version.as_ref().unwrap()["ref"], "HEAD");
        let run = config.steps[1].run.as_ref().unwrap();
        assert_eq!(run.env["GIT_BRANCH"], "master");
        assert!(!run.privileged);
    }

    #[test]
    fn test_sg001_defaults() {
        let config: PipelineConfig = serde_yaml_ng::from_str("version: \"1.0\"").unwrap();
        assert_eq!(config.name, "pipeline");
        assert_eq!(config.pipeline_id, 0);
        assert!(config.steps.is_empty());
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.storage.backend, "gcs");
        assert_eq!(config.storage.secret.name, "service-account");
        assert_eq!(config.policy.unknown_steps, UnknownStepPolicy::Fail);
        assert_eq!(config.policy.format, OutputFormat::Json);
    }

    #[test]
    fn test_sg001_policy_parse() {
        let yaml = r#"
unknown_steps: skip
format: yaml
"#;
        let p: Policy = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(p.unknown_steps, UnknownStepPolicy::Skip);
        assert_eq!(p.format, OutputFormat::Yaml);
    }

    #[test]
    fn test_sg001_unrecognized_keys_captured() {
        let yaml = r#"
try:
  fetch:
    name: x
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(step.populated_kinds().is_empty());
        assert!(step.variant().is_none());
        assert!(step.unrecognized.contains_key("try"));
    }

    #[test]
    fn test_sg001_populated_kinds_multiple() {
        let yaml = r#"
fetch:
  name: a
  type: git
run:
  name: b
  image: alpine
  path: ./b
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(step.populated_kinds(), vec![StepKind::Fetch, StepKind::Run]);
    }

    #[test]
    fn test_sg001_variant_name() {
        let yaml = r#"
publish:
  name: release
  type: s3
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        let v = step.variant().unwrap();
        assert_eq!(v.kind(), StepKind::Publish);
        assert_eq!(v.name(), "release");
        assert_eq!(step.name(), Some("release"));
    }

    #[test]
    fn test_sg001_effective_image() {
        let mut run = RunStep {
            name: "t".to_string(),
            image: Some("golang".to_string()),
            image_artifact: None,
            path: "ci/test".to_string(),
            args: vec![],
            privileged: false,
            env: IndexMap::new(),
        };
        assert_eq!(run.effective_image(), Some("golang"));
        run.image_artifact = Some("built-image".to_string());
        assert_eq!(run.effective_image(), Some("built-image"));
        run.image_artifact = Some(String::new());
        assert_eq!(run.effective_image(), Some("golang"));
        run.image = None;
        assert_eq!(run.effective_image(), None);
    }

    #[test]
    fn test_sg001_display() {
        assert_eq!(StepKind::Fetch.to_string(), "fetch");
        assert_eq!(StepKind::Run.to_string(), "run");
        assert_eq!(OutputFormat::Yaml.to_string(), "yaml");
    }
}
