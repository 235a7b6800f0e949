//! Step handlers: one job + one graph node per step kind.
//!
//! Each handler produces:
//! 1. A job whose sub-steps do the work in isolated containers
//! 2. A graph node referencing that job, bound to the artifact channel
//!    the same way the job is (predecessors are filled in by the assembler)

pub mod fetch;
pub mod publish;
pub mod run;

use crate::core::manifest::*;
use indexmap::IndexMap;

/// Position of a step being compiled.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Index in the source step list
    pub index: usize,
    /// Deterministic job name for this position
    pub job_name: String,
}

impl StepContext {
    pub fn new(pipeline_id: u32, index: usize) -> Self {
        Self {
            index,
            job_name: job_name(pipeline_id, index),
        }
    }
}

/// Job name for a step position. Depends only on position, never content.
pub fn job_name(pipeline_id: u32, index: usize) -> String {
    format!("job-{}-step-{}", pipeline_id, index)
}

/// Build a container sub-step. Env vars keep declaration order.
pub fn new_container(
    name: &str,
    image: &str,
    cmd: &str,
    args: Vec<String>,
    env: &IndexMap<String, String>,
) -> SubStep {
    SubStep {
        name: name.to_string(),
        image: image.to_string(),
        command: vec![cmd.to_string()],
        args,
        env: env
            .iter()
            .map(|(k, v)| EnvVar {
                name: k.clone(),
                value: v.clone(),
            })
            .collect(),
        security_context: None,
    }
}

/// Shape a job from its channel bindings and sub-steps.
pub fn new_job(
    name: &str,
    inputs: Vec<ResourceBinding>,
    outputs: Vec<ResourceBinding>,
    steps: Vec<SubStep>,
) -> CompiledJob {
    let wrap = |resources: Vec<ResourceBinding>| {
        (!resources.is_empty()).then_some(JobResources { resources })
    };
    CompiledJob {
        type_meta: TypeMeta::new("Task"),
        metadata: ObjectMeta::new(name),
        spec: JobSpec {
            inputs: wrap(inputs),
            outputs: wrap(outputs),
            steps,
        },
    }
}

/// Graph node for a job. `run_after` is left empty for the assembler.
pub fn new_node(job: &CompiledJob, inputs: Vec<NodeBinding>, outputs: Vec<NodeBinding>) -> GraphNode {
    let resources = if inputs.is_empty() && outputs.is_empty() {
        None
    } else {
        Some(NodeResources { inputs, outputs })
    };
    GraphNode {
        name: job.name().to_string(),
        task_ref: TaskRef {
            name: job.name().to_string(),
        },
        run_after: Vec::new(),
        resources,
    }
}

/// Container image of a resource-type driver.
pub fn driver_image(resource_type: &str) -> String {
    format!("concourse/{}-resource:ubuntu", resource_type)
}
