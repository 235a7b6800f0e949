//! SG-004: Artifact channel, the one storage resource every job shares.
//!
//! Steps in a build plan implicitly share a working directory. Jobs in the
//! target runtime are isolated, so the shared directory becomes a single
//! named storage resource that fetch jobs write, and run/publish jobs read.
//! There is exactly one channel per compiled pipeline.

use super::manifest::*;
use super::types::StorageConfig;

/// Symbolic name of the shared storage resource.
pub const CHANNEL_NAME: &str = "stepgraph-internal-blobstore";

/// The storage resource declaration.
pub fn declaration(storage: &StorageConfig) -> StorageResource {
    StorageResource {
        type_meta: TypeMeta::new("PipelineResource"),
        metadata: ObjectMeta::new(CHANNEL_NAME),
        spec: StorageResourceSpec {
            resource_type: STORAGE_TYPE.to_string(),
            params: vec![
                param("type", &storage.backend),
                param("location", &storage.location),
                param("dir", &storage.dir),
            ],
            secret_params: vec![SecretParam {
                field_name: storage.secret.field.clone(),
                secret_key: storage.secret.key.clone(),
                secret_name: storage.secret.name.clone(),
            }],
        },
    }
}

fn param(name: &str, value: &str) -> Param {
    Param {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Minimal "this job touches the channel" binding.
pub fn job_binding() -> ResourceBinding {
    ResourceBinding {
        name: CHANNEL_NAME.to_string(),
        resource_type: STORAGE_TYPE.to_string(),
        target_path: None,
    }
}

/// Binding placed at `target_path` within the job workspace.
pub fn mounted_binding(target_path: &str) -> ResourceBinding {
    ResourceBinding {
        target_path: Some(target_path.to_string()),
        ..job_binding()
    }
}

/// Graph-level wiring of a job's channel binding.
pub fn node_binding() -> NodeBinding {
    NodeBinding {
        name: CHANNEL_NAME.to_string(),
        resource: CHANNEL_NAME.to_string(),
    }
}

/// Entry in the graph's declared resources.
pub fn declared_resource() -> DeclaredResource {
    DeclaredResource {
        name: CHANNEL_NAME.to_string(),
        resource_type: STORAGE_TYPE.to_string(),
    }
}

/// Binding of the channel at execution-request level.
pub fn run_binding() -> RunBinding {
    RunBinding {
        name: CHANNEL_NAME.to_string(),
        resource_ref: ResourceRef {
            name: CHANNEL_NAME.to_string(),
        },
    }
}

/// Job workspace root. A binding mounted at `.` restores the channel here.
pub const WORKSPACE_ROOT: &str = "/workspace";

/// Directory a fetch driver writes `subdir` into before upload.
pub fn output_dir(subdir: &str) -> String {
    format!("{}/output/{}/{}", WORKSPACE_ROOT, CHANNEL_NAME, subdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SecretRef;

    #[test]
    fn test_sg004_declaration_defaults() {
        let decl = declaration(&StorageConfig::default());
        assert_eq!(decl.metadata.name, CHANNEL_NAME);
        assert_eq!(decl.type_meta.kind, "PipelineResource");
        assert_eq!(decl.spec.resource_type, "storage");
        let names: Vec<&str> = decl.spec.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["type", "location", "dir"]);
        assert_eq!(decl.spec.params[0].value, "gcs");
        assert_eq!(decl.spec.secret_params.len(), 1);
        assert_eq!(
            decl.spec.secret_params[0].field_name,
            "GOOGLE_APPLICATION_CREDENTIALS"
        );
    }

    #[test]
    fn test_sg004_declaration_custom() {
        let storage = StorageConfig {
            backend: "gcs".to_string(),
            location: "gs://my-bucket/ci".to_string(),
            dir: "true".to_string(),
            secret: SecretRef {
                field: "CREDS".to_string(),
                key: "key.json".to_string(),
                name: "ci-sa".to_string(),
            },
        };
        let decl = declaration(&storage);
        assert_eq!(decl.spec.params[1].value, "gs://my-bucket/ci");
        assert_eq!(decl.spec.secret_params[0].secret_name, "ci-sa");
        assert_eq!(decl.spec.secret_params[0].secret_key, "key.json");
    }

    #[test]
    fn test_sg004_bindings_share_name() {
        assert_eq!(job_binding().name, CHANNEL_NAME);
        assert_eq!(job_binding().target_path, None);
        assert_eq!(mounted_binding(".").target_path.as_deref(), Some("."));
        assert_eq!(node_binding().resource, CHANNEL_NAME);
        assert_eq!(declared_resource().name, CHANNEL_NAME);
        assert_eq!(run_binding().resource_ref.name, CHANNEL_NAME);
    }

    #[test]
    fn test_sg004_output_dir() {
        assert_eq!(
            output_dir("booklit"),
            "/workspace/output/stepgraph-internal-blobstore/booklit"
        );
    }
}
