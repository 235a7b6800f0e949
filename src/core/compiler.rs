//! SG-009: Step compiler, which dispatches to the step handlers.
//!
//! Maps one source step to one job and one graph node. Pure and
//! deterministic: the job name depends only on pipeline id and position.

use super::error::CompileError;
use super::manifest::{CompiledJob, GraphNode};
use super::types::{Step, StepVariant};
use crate::steps::{self, StepContext};

/// Compile a step. Returns `Ok(None)` when the step has no recognized kind;
/// the assembler decides whether that is fatal.
pub fn compile(
    step: &Step,
    ctx: &StepContext,
) -> Result<Option<(CompiledJob, GraphNode)>, CompileError> {
    let kinds = step.populated_kinds();
    if kinds.len() > 1 {
        return Err(CompileError::AmbiguousStep {
            index: ctx.index,
            name: step.name().unwrap_or("?").to_string(),
            kinds: kinds
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let compiled = match step.variant() {
        Some(StepVariant::Fetch(f)) => steps::fetch::compile(f, ctx)?,
        Some(StepVariant::Publish(p)) => steps::publish::compile(p, ctx)?,
        Some(StepVariant::Run(r)) => steps::run::compile(r, ctx)?,
        None => return Ok(None),
    };
    Ok(Some(compiled))
}
