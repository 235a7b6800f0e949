//! SG-010: Pipeline assembly in one ordered pass over the steps.
//!
//! Compiles each step and chains it after every previously compiled node,
//! reproducing the total order the source model implied by position.
//! The predecessor list is an explicit fold accumulator; nothing here
//! touches global state or I/O.

use super::channel;
use super::compiler;
use super::error::CompileError;
use super::manifest::*;
use super::types::*;
use crate::steps::StepContext;

/// Everything a compile run produces, ready for the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPipeline {
    /// Shared storage declaration
    pub storage: StorageResource,
    /// Jobs in compilation order
    pub jobs: Vec<CompiledJob>,
    /// Job graph
    pub graph: PipelineGraph,
    /// Source indices skipped under `unknown_steps: skip`
    pub skipped: Vec<usize>,
}

/// Fold state threaded through the pass.
#[derive(Debug, Default)]
struct Chain {
    jobs: Vec<CompiledJob>,
    nodes: Vec<GraphNode>,
    predecessors: Vec<String>,
    skipped: Vec<usize>,
}

impl Chain {
    fn push(mut self, job: CompiledJob, mut node: GraphNode) -> Self {
        node.run_after = self.predecessors.clone();
        self.predecessors.push(node.name.clone());
        self.jobs.push(job);
        self.nodes.push(node);
        self
    }
}

/// Assemble a full pipeline from a parsed configuration.
pub fn assemble(config: &PipelineConfig) -> Result<CompiledPipeline, CompileError> {
    let chain = chain_steps(&config.steps, config.pipeline_id, config.policy.unknown_steps)?;

    tracing::info!(
        pipeline = %config.name,
        jobs = chain.jobs.len(),
        skipped = chain.skipped.len(),
        "assembled job graph"
    );

    Ok(CompiledPipeline {
        storage: channel::declaration(&config.storage),
        jobs: chain.jobs,
        graph: PipelineGraph {
            type_meta: TypeMeta::new("Pipeline"),
            metadata: ObjectMeta::new(&config.name),
            spec: GraphSpec {
                resources: vec![channel::declared_resource()],
                tasks: chain.nodes,
            },
        },
        skipped: chain.skipped,
    })
}

fn chain_steps(
    steps: &[Step],
    pipeline_id: u32,
    unknown_steps: UnknownStepPolicy,
) -> Result<Chain, CompileError> {
    steps
        .iter()
        .enumerate()
        .try_fold(Chain::default(), |mut chain, (index, step)| {
            let ctx = StepContext::new(pipeline_id, index);
            match compiler::compile(step, &ctx)? {
                Some((job, node)) => {
                    tracing::debug!(
                        index,
                        job = %node.name,
                        step = step.name().unwrap_or_default(),
                        run_after = chain.predecessors.len(),
                        "compiled step"
                    );
                    Ok(chain.push(job, node))
                }
                None => {
                    let keys: Vec<String> = step.unrecognized.keys().cloned().collect();
                    match unknown_steps {
                        UnknownStepPolicy::Fail => {
                            Err(CompileError::UnrecognizedStep { index, keys })
                        }
                        UnknownStepPolicy::Skip => {
                            tracing::warn!(index, ?keys, "skipping step with no recognized kind");
                            chain.skipped.push(index);
                            Ok(chain)
                        }
                    }
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::run::{FIXUP_SUB_STEP, USER_SUB_STEP};
    use proptest::prelude::*;

    fn booklit_config() -> PipelineConfig {
        serde_yaml_ng::from_str(
            r#"
version: "1.0"
steps:
  - fetch:
      name: booklit
      resource: booklit
      type: git
      source: {uri: "https://github.com/vito/booklit"}
      version: {ref: HEAD}
  - run:
      name: test
      image: golang
      path: booklit/ci/test
      args: []
"#,
        )
        .unwrap()
    }

    fn fetch_step(name: &str) -> Step {
        Step {
            fetch: Some(FetchStep {
                name: name.to_string(),
                resource: name.to_string(),
                resource_type: "git".to_string(),
                source: ConfigMap::new(),
                params: ConfigMap::new(),
                version: None,
            }),
            ..Step::default()
        }
    }

    fn run_step(name: &str) -> Step {
        Step {
            run: Some(RunStep {
                name: name.to_string(),
                image: Some("alpine".to_string()),
                image_artifact: None,
                path: "ci/run".to_string(),
                args: vec![],
                privileged: false,
                env: indexmap::IndexMap::new(),
            }),
            ..Step::default()
        }
    }

    fn config_with(steps: Vec<Step>, unknown_steps: UnknownStepPolicy) -> PipelineConfig {
        let mut config: PipelineConfig = serde_yaml_ng::from_str("version: \"1.0\"").unwrap();
        config.steps = steps;
        config.policy.unknown_steps = unknown_steps;
        config
    }

    #[test]
    fn test_sg010_booklit_two_nodes() {
        let compiled = assemble(&booklit_config()).unwrap();
        let tasks = &compiled.graph.spec.tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(compiled.jobs.len(), 2);
        assert!(tasks[0].run_after.is_empty());
        assert_eq!(tasks[1].run_after, vec![tasks[0].name.clone()]);
        assert_eq!(
            compiled.jobs[1].sub_step_names(),
            vec![FIXUP_SUB_STEP, USER_SUB_STEP]
        );
        assert_eq!(tasks[0].name, "job-0-step-0");
        assert_eq!(tasks[1].name, "job-0-step-1");
    }

    #[test]
    fn test_sg010_graph_declares_channel() {
        let compiled = assemble(&booklit_config()).unwrap();
        assert_eq!(compiled.graph.metadata.name, "pipeline");
        assert_eq!(compiled.graph.type_meta.kind, "Pipeline");
        assert_eq!(compiled.graph.spec.resources, vec![channel::declared_resource()]);
        assert_eq!(compiled.storage.metadata.name, channel::CHANNEL_NAME);
    }

    #[test]
    fn test_sg010_strict_chain_not_just_previous() {
        let config = config_with(
            vec![fetch_step("a"), fetch_step("b"), run_step("c"), run_step("d")],
            UnknownStepPolicy::Fail,
        );
        let compiled = assemble(&config).unwrap();
        let tasks = &compiled.graph.spec.tasks;
        assert_eq!(
            tasks[3].run_after,
            vec!["job-0-step-0", "job-0-step-1", "job-0-step-2"]
        );
    }

    #[test]
    fn test_sg010_skip_unrecognized() {
        let config = config_with(
            vec![fetch_step("a"), Step::default(), run_step("c")],
            UnknownStepPolicy::Skip,
        );
        let compiled = assemble(&config).unwrap();
        let tasks = &compiled.graph.spec.tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(compiled.skipped, vec![1]);
        // job names stay positional
        assert_eq!(tasks[1].name, "job-0-step-2");
        assert_eq!(tasks[1].run_after, vec!["job-0-step-0"]);
    }

    #[test]
    fn test_sg010_fail_unrecognized() {
        let config = config_with(
            vec![fetch_step("a"), Step::default()],
            UnknownStepPolicy::Fail,
        );
        let err = assemble(&config).unwrap_err();
        assert!(matches!(err, CompileError::UnrecognizedStep { index: 1, .. }));
    }

    #[test]
    fn test_sg010_ambiguous_aborts_even_when_skipping() {
        let mut bad = fetch_step("booklit");
        bad.run = run_step("test").run;
        let config = config_with(vec![fetch_step("a"), bad], UnknownStepPolicy::Skip);
        let err = assemble(&config).unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousStep { index: 1, .. }));
    }

    #[test]
    fn test_sg010_pipeline_id_in_names() {
        let mut config = booklit_config();
        config.pipeline_id = 42;
        let compiled = assemble(&config).unwrap();
        assert_eq!(compiled.jobs[0].name(), "job-42-step-0");
        assert_eq!(compiled.graph.spec.tasks[1].run_after, vec!["job-42-step-0"]);
    }

    #[test]
    fn test_sg010_empty_pipeline() {
        let compiled = assemble(&config_with(vec![], UnknownStepPolicy::Fail)).unwrap();
        assert!(compiled.jobs.is_empty());
        assert!(compiled.graph.spec.tasks.is_empty());
    }

    #[test]
    fn test_sg010_deterministic() {
        assert_eq!(
            assemble(&booklit_config()).unwrap(),
            assemble(&booklit_config()).unwrap()
        );
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            "[a-z]{1,8}".prop_map(|n| fetch_step(&n)),
            "[a-z]{1,8}".prop_map(|n| run_step(&n)),
            Just(Step::default()),
        ]
    }

    proptest! {
        #[test]
        fn prop_sg010_predecessors_are_all_prior_nodes(
            steps in proptest::collection::vec(arb_step(), 0..24)
        ) {
            let expected_nodes = steps.iter().filter(|s| s.variant().is_some()).count();
            let config = config_with(steps, UnknownStepPolicy::Skip);
            let compiled = assemble(&config).unwrap();
            let tasks = &compiled.graph.spec.tasks;

            prop_assert_eq!(tasks.len(), expected_nodes);
            prop_assert_eq!(compiled.jobs.len(), expected_nodes);
            for (k, task) in tasks.iter().enumerate() {
                let prior: Vec<String> = tasks[..k].iter().map(|t| t.name.clone()).collect();
                prop_assert_eq!(&task.run_after, &prior);
                prop_assert_eq!(&task.task_ref.name, compiled.jobs[k].name());
            }
        }
    }
}
