//! SG-002: Emitted document types (Tekton `v1alpha1`).
//!
//! Storage declaration, jobs (Task), the job graph (Pipeline) and the
//! execution request (PipelineRun). Field names follow the runtime's
//! camelCase wire format.

use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "tekton.dev/v1alpha1";

/// Resource type of the shared artifact store.
pub const STORAGE_TYPE: &str = "storage";

/// Document identity header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

impl TypeMeta {
    pub fn new(kind: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
}

impl ObjectMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

// ============================================================================
// Storage declaration (PipelineResource)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageResource {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: StorageResourceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageResourceSpec {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_params: Vec<SecretParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretParam {
    pub field_name: String,
    pub secret_key: String,
    pub secret_name: String,
}

// ============================================================================
// Job (Task)
// ============================================================================

/// One compiled unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledJob {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: JobSpec,
}

impl CompiledJob {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn input_bindings(&self) -> &[ResourceBinding] {
        self.spec
            .inputs
            .as_ref()
            .map(|r| r.resources.as_slice())
            .unwrap_or_default()
    }

    pub fn output_bindings(&self) -> &[ResourceBinding] {
        self.spec
            .outputs
            .as_ref()
            .map(|r| r.resources.as_slice())
            .unwrap_or_default()
    }

    /// Sub-step names in execution order.
    pub fn sub_step_names(&self) -> Vec<&str> {
        self.spec.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<JobResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<JobResources>,
    pub steps: Vec<SubStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResources {
    pub resources: Vec<ResourceBinding>,
}

/// A job's declared use of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBinding {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Path relative to the job workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
}

/// One container executed inside a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub privileged: bool,
}

// ============================================================================
// Graph (Pipeline)
// ============================================================================

/// One node of the job graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub name: String,
    pub task_ref: TaskRef,
    /// Predecessor node names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_after: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<NodeResources>,
}

impl GraphNode {
    pub fn input_bindings(&self) -> &[NodeBinding] {
        self.resources
            .as_ref()
            .map(|r| r.inputs.as_slice())
            .unwrap_or_default()
    }

    pub fn output_bindings(&self) -> &[NodeBinding] {
        self.resources
            .as_ref()
            .map(|r| r.outputs.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<NodeBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<NodeBinding>,
}

/// Graph-level wiring of a job resource to a declared pipeline resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBinding {
    pub name: String,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineGraph {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: GraphSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub resources: Vec<DeclaredResource>,
    pub tasks: Vec<GraphNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

// ============================================================================
// Execution request (PipelineRun)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: RunSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSpec {
    pub pipeline_ref: PipelineRef,
    pub trigger: Trigger,
    pub resources: Vec<RunBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBinding {
    pub name: String,
    pub resource_ref: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
}
