//! SG-008: Run step handler.
//!
//! Two sub-steps: restore exec bits on the fetched artifacts (the storage
//! transfer drops them), then the user's command. The channel is mounted
//! at the workspace root so paths like `booklit/ci/test` resolve the same
//! way they did against the shared directory.

use super::{new_container, new_job, new_node, StepContext};
use crate::core::channel;
use crate::core::error::CompileError;
use crate::core::manifest::{CompiledJob, GraphNode, SecurityContext};
use crate::core::types::RunStep;
use indexmap::IndexMap;

pub const FIXUP_SUB_STEP: &str = "make-everything-executable";
pub const USER_SUB_STEP: &str = "run-job-step";

const FIXUP_IMAGE: &str = "alpine";

/// Compile a run step into a job and its graph node.
pub fn compile(step: &RunStep, ctx: &StepContext) -> Result<(CompiledJob, GraphNode), CompileError> {
    let image = step
        .effective_image()
        .ok_or_else(|| CompileError::MissingImage {
            index: ctx.index,
            name: step.name.clone(),
        })?;

    let fixup = new_container(
        FIXUP_SUB_STEP,
        FIXUP_IMAGE,
        "chmod",
        vec!["-R".to_string(), "+x".to_string(), ".".to_string()],
        &IndexMap::new(),
    );

    let mut user = new_container(USER_SUB_STEP, image, &step.path, step.args.clone(), &step.env);
    if step.privileged {
        user.security_context = Some(SecurityContext { privileged: true });
    }

    let job = new_job(&ctx.job_name, vec![channel::mounted_binding(".")], vec![], vec![fixup, user]);
    let node = new_node(&job, vec![channel::node_binding()], vec![]);
    Ok((job, node))
}
