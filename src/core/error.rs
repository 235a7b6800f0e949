//! SG-003: Compile failures.
//!
//! Every failure here aborts the whole run before any document is written.

use super::types::StepKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// More than one step kind populated.
    #[error("step {index} ({name}) sets more than one kind: {kinds}")]
    AmbiguousStep {
        index: usize,
        name: String,
        kinds: String,
    },

    /// No step kind populated and the policy forbids skipping.
    #[error("step {index} has no recognized kind{}", describe_keys(.keys))]
    UnrecognizedStep { index: usize, keys: Vec<String> },

    #[error("step {index} ({name}) has no image or image_artifact")]
    MissingImage { index: usize, name: String },

    /// A driver request payload could not be serialized.
    #[error("step {index} ({name}): cannot serialize {kind} request: {source}")]
    Payload {
        index: usize,
        name: String,
        kind: StepKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot render {document} document: {message}")]
    Render { document: String, message: String },

    #[error("cannot write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        " (empty step)".to_string()
    } else {
        format!(" (keys: {})", keys.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sg003_unrecognized_message() {
        let e = CompileError::UnrecognizedStep {
            index: 2,
            keys: vec!["try".to_string(), "attempts".to_string()],
        };
        assert_eq!(
            e.to_string(),
            "step 2 has no recognized kind (keys: try, attempts)"
        );
        let e = CompileError::UnrecognizedStep {
            index: 0,
            keys: vec![],
        };
        assert_eq!(e.to_string(), "step 0 has no recognized kind (empty step)");
    }

    #[test]
    fn test_sg003_ambiguous_message() {
        let e = CompileError::AmbiguousStep {
            index: 1,
            name: "booklit".to_string(),
            kinds: "fetch, run".to_string(),
        };
        assert!(e.to_string().contains("more than one kind: fetch, run"));
    }

    #[test]
    fn test_sg003_output_message() {
        let e = CompileError::Output {
            path: PathBuf::from("/nope/out.yml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(e.to_string(), "cannot write /nope/out.yml: missing");
    }
}
