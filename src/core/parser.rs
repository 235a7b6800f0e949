//! SG-013: YAML parsing and validation.
//!
//! Parses stepgraph.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Pipeline name must be a DNS-1123 label (it names cluster objects)
//! - Each step sets exactly one kind
//! - Step names are safe artifact directory names; fetch names are unique
//! - Required fields per step kind

use super::types::*;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

/// Longest cluster object name we emit is `<name>-instance`.
const MAX_PIPELINE_NAME: usize = 63 - "-instance".len();

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static ARTIFACT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"));

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a stepgraph.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<PipelineConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a stepgraph.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<PipelineConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    if config.version != "1.0" {
        push(format!(
            "version must be \"1.0\", got \"{}\"",
            config.version
        ));
    }

    if !DNS_LABEL.is_match(&config.name) || config.name.len() > MAX_PIPELINE_NAME {
        push(format!(
            "name '{}' must be a lowercase DNS label of at most {} characters",
            config.name, MAX_PIPELINE_NAME
        ));
    }

    let mut fetched: HashSet<&str> = HashSet::new();

    for (index, step) in config.steps.iter().enumerate() {
        let kinds = step.populated_kinds();
        if kinds.len() > 1 {
            let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
            push(format!(
                "step {} sets more than one kind: {}",
                index,
                kinds.join(", ")
            ));
            continue;
        }

        let variant = match step.variant() {
            Some(v) => v,
            None => {
                if config.policy.unknown_steps == UnknownStepPolicy::Fail {
                    push(format!("step {} has no recognized kind", index));
                }
                continue;
            }
        };

        let name = variant.name();
        if !ARTIFACT_NAME.is_match(name) {
            push(format!(
                "step {} ({}) has invalid name '{}'",
                index,
                variant.kind(),
                name
            ));
        }

        match variant {
            StepVariant::Fetch(f) => {
                if f.resource_type.is_empty() {
                    push(format!("step {} (fetch {}) has no type", index, name));
                }
                if !fetched.insert(name) {
                    push(format!(
                        "step {} fetches '{}' again; artifacts would collide",
                        index, name
                    ));
                }
            }
            StepVariant::Publish(p) => {
                if p.resource_type.is_empty() {
                    push(format!("step {} (publish {}) has no type", index, name));
                }
            }
            StepVariant::Run(r) => {
                if r.path.is_empty() {
                    push(format!("step {} (run {}) has no path", index, name));
                }
                if r.effective_image().is_none() {
                    push(format!(
                        "step {} (run {}) has no image or image_artifact",
                        index, name
                    ));
                }
            }
        }
    }

    errors
}
