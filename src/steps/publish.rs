//! SG-007: Publish step handler.
//!
//! Runs the resource type's `out` driver against the workspace restored
//! from the artifact channel. The driver gets the mount root, so params
//! such as `file: built/*.tgz` resolve against every earlier artifact.
//! Publishing is a sink: no output binding.

use super::{driver_image, new_container, new_job, new_node, StepContext};
use crate::core::channel;
use crate::core::error::CompileError;
use crate::core::manifest::{CompiledJob, GraphNode};
use crate::core::types::{ConfigMap, PublishStep, StepKind};
use indexmap::IndexMap;
use serde::Serialize;

pub const SUB_STEP: &str = "run-resource-put";

/// Env var holding the directory handed to the `out` driver.
pub const SOURCE_DIR_ENV: &str = "SOURCE_DIR";

/// Where the channel input is mounted inside the publish job.
const MOUNT_PATH: &str = ".";

/// Payload for the `out` driver.
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    source: &'a ConfigMap,
    #[serde(skip_serializing_if = "is_empty_map")]
    params: &'a ConfigMap,
}

fn is_empty_map(map: &&ConfigMap) -> bool {
    map.is_empty()
}

pub fn request_payload(step: &PublishStep) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PublishRequest {
        source: &step.source,
        params: &step.params,
    })
}

/// Shell run inside the driver container. No step data is interpolated
/// outside the quoted heredoc.
pub fn publish_script(payload: &str) -> String {
    format!(
        "set -eu\n\
         /opt/resource/out \"${SOURCE_DIR_ENV}\" <<'STEPGRAPH_EOF'\n\
         {payload}\n\
         STEPGRAPH_EOF"
    )
}

/// Compile a publish step into a job and its graph node.
pub fn compile(step: &PublishStep, ctx: &StepContext) -> Result<(CompiledJob, GraphNode), CompileError> {
    let payload = request_payload(step).map_err(|source| CompileError::Payload {
        index: ctx.index,
        name: step.name.clone(),
        kind: StepKind::Publish,
        source,
    })?;

    let mut env = IndexMap::new();
    env.insert(SOURCE_DIR_ENV.to_string(), channel::WORKSPACE_ROOT.to_string());

    let container = new_container(
        SUB_STEP,
        &driver_image(&step.resource_type),
        "bash",
        vec!["-c".to_string(), publish_script(&payload)],
        &env,
    );

    let input = channel::mounted_binding(MOUNT_PATH);
    let job = new_job(&ctx.job_name, vec![input], vec![], vec![container]);
    let node = new_node(&job, vec![channel::node_binding()], vec![]);
    Ok((job, node))
}
