//! SG-006: Fetch step handler.
//!
//! Runs the resource type's `in` driver and leaves the artifact under
//! `<channel output>/<logical name>`, so fetches never collide inside the
//! shared store.

use super::{driver_image, new_container, new_job, new_node, StepContext};
use crate::core::channel;
use crate::core::error::CompileError;
use crate::core::manifest::{CompiledJob, GraphNode};
use crate::core::types::{ConfigMap, FetchStep, StepKind};
use indexmap::IndexMap;
use serde::Serialize;

pub const SUB_STEP: &str = "run-resource-get";

/// Env var holding the artifact directory inside the fetch container.
pub const ARTIFACT_DIR_ENV: &str = "ARTIFACT_DIR";

/// Payload for the `in` driver.
#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    source: &'a ConfigMap,
    #[serde(skip_serializing_if = "is_empty_map")]
    params: &'a ConfigMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a ConfigMap>,
}

fn is_empty_map(map: &&ConfigMap) -> bool {
    map.is_empty()
}

/// Serialize the driver request for a fetch step.
pub fn request_payload(step: &FetchStep) -> Result<String, serde_json::Error> {
    serde_json::to_string(&FetchRequest {
        source: &step.source,
        params: &step.params,
        version: step.version.as_ref(),
    })
}

/// Shell run inside the driver container.
pub fn fetch_script(payload: &str) -> String {
    format!(
        "set -eu\n\
         mkdir -p \"${ARTIFACT_DIR_ENV}\"\n\
         /opt/resource/in \"${ARTIFACT_DIR_ENV}\" <<'STEPGRAPH_EOF'\n\
         {payload}\n\
         STEPGRAPH_EOF\n\
         ls -lR /workspace/output"
    )
}

/// Compile a fetch step into a job and its graph node.
pub fn compile(step: &FetchStep, ctx: &StepContext) -> Result<(CompiledJob, GraphNode), CompileError> {
    let payload = request_payload(step).map_err(|source| CompileError::Payload {
        index: ctx.index,
        name: step.name.clone(),
        kind: StepKind::Fetch,
        source,
    })?;

    let mut env = IndexMap::new();
    env.insert(ARTIFACT_DIR_ENV.to_string(), channel::output_dir(&step.name));

    let container = new_container(
        SUB_STEP,
        &driver_image(&step.resource_type),
        "bash",
        vec!["-c".to_string(), fetch_script(&payload)],
        &env,
    );

    let job = new_job(&ctx.job_name, vec![], vec![channel::job_binding()], vec![container]);
    let node = new_node(&job, vec![], vec![channel::node_binding()]);
    Ok((job, node))
}
