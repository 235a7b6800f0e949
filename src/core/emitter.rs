//! SG-011: Document emitter.
//!
//! Renders the storage declaration, every job, the graph and one manual
//! execution request, in that order, so each name is declared before it
//! is referenced. The whole stream is rendered before anything is written,
//! and files are written via temp file + rename: a failed run leaves no
//! partial output.

use super::assembler::CompiledPipeline;
use super::channel;
use super::error::CompileError;
use super::manifest::*;
use super::types::OutputFormat;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Destination meaning "write to stdout".
pub const STDOUT: &str = "-";

/// One emitted document.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Document<'a> {
    Storage(&'a StorageResource),
    Job(&'a CompiledJob),
    Graph(&'a PipelineGraph),
    Run(&'a ExecutionRequest),
}

impl Document<'_> {
    /// `Kind/name` label used in logs and errors.
    pub fn label(&self) -> String {
        let (meta, object) = match self {
            Self::Storage(d) => (&d.type_meta, &d.metadata),
            Self::Job(d) => (&d.type_meta, &d.metadata),
            Self::Graph(d) => (&d.type_meta, &d.metadata),
            Self::Run(d) => (&d.type_meta, &d.metadata),
        };
        format!("{}/{}", meta.kind, object.name)
    }
}

/// Manual execution request for a graph, bound to the artifact channel.
pub fn execution_request(graph: &PipelineGraph) -> ExecutionRequest {
    ExecutionRequest {
        type_meta: TypeMeta::new("PipelineRun"),
        metadata: ObjectMeta::new(&format!("{}-instance", graph.metadata.name)),
        spec: RunSpec {
            pipeline_ref: PipelineRef {
                name: graph.metadata.name.clone(),
            },
            trigger: Trigger {
                trigger_type: TriggerType::Manual,
            },
            resources: vec![channel::run_binding()],
        },
    }
}

/// Documents in emission order.
pub fn documents<'a>(
    compiled: &'a CompiledPipeline,
    request: &'a ExecutionRequest,
) -> Vec<Document<'a>> {
    let mut docs = Vec::with_capacity(compiled.jobs.len() + 3);
    docs.push(Document::Storage(&compiled.storage));
    docs.extend(compiled.jobs.iter().map(Document::Job));
    docs.push(Document::Graph(&compiled.graph));
    docs.push(Document::Run(request));
    docs
}

/// Render the full document stream.
pub fn render(compiled: &CompiledPipeline, format: OutputFormat) -> Result<String, CompileError> {
    let request = execution_request(&compiled.graph);
    let mut out = String::new();

    for doc in documents(compiled, &request) {
        let text = match format {
            OutputFormat::Json => serde_json::to_string_pretty(&doc).map_err(|e| e.to_string()),
            OutputFormat::Yaml => serde_yaml_ng::to_string(&doc).map_err(|e| e.to_string()),
        }
        .map_err(|message| CompileError::Render {
            document: doc.label(),
            message,
        })?;

        if format == OutputFormat::Yaml {
            out.push_str("---\n");
        }
        out.push_str(&text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }

    Ok(out)
}

/// Render and write the stream to `dest` (a path, or `-` for stdout).
/// Returns the rendered text.
pub fn emit(
    compiled: &CompiledPipeline,
    format: OutputFormat,
    dest: &Path,
) -> Result<String, CompileError> {
    let rendered = render(compiled, format)?;
    write_stream(&rendered, dest)?;
    tracing::info!(
        dest = %dest.display(),
        %format,
        documents = compiled.jobs.len() + 3,
        bytes = rendered.len(),
        "wrote documents"
    );
    Ok(rendered)
}

/// Write a rendered stream. Files are replaced atomically.
pub fn write_stream(rendered: &str, dest: &Path) -> Result<(), CompileError> {
    let output_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CompileError::Output { path, source }
    };

    if dest == Path::new(STDOUT) {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(output_err(dest))?;
        return Ok(());
    }

    let mut tmp_name = dest.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = dest.with_file_name(tmp_name);

    std::fs::write(&tmp_path, rendered).map_err(output_err(&tmp_path))?;
    if let Err(e) = std::fs::rename(&tmp_path, dest) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(output_err(dest)(e));
    }
    Ok(())
}
