//! OpenAPI generation for every pasulol-core endpoint.

use std::path::{Path, PathBuf};

use crate::handlers;
use thiserror::Error;
use utoipa::OpenApi;

/// OpenAPI document for all public HTTP endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::root::root),
    components(schemas(handlers::MessageResponse)),
    nest(
        (
            path = handlers::RESULT_PATH,
            api = handlers::statistics::StatisticsApi,
            tags = ["Statistics"]
        ),
        (
            path = handlers::RESULT_PATH,
            api = handlers::results::ResultApi,
            tags = ["Results"]
        ),
        (
            path = handlers::RESULT_PATH,
            api = handlers::verification::VerificationApi,
            tags = ["Verification"]
        )
    ),
    tags(
        (name = "Statistics", description = "Visit and share counters"),
        (name = "Results", description = "Quiz result records"),
        (name = "Verification", description = "Binding an email to a result")
    )
)]
pub struct ApiDoc;

/// OpenAPI generation and file-write errors.
#[derive(Debug, Error)]
pub enum OpenApiError {
    /// OpenAPI serialization failed.
    #[error("failed to serialize openapi spec: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// Creating the docs directory failed.
    #[error("failed to create docs directory at {path}: {source}")]
    CreateDir {
        /// Target directory path.
        path: PathBuf,
        /// I/O source error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the OpenAPI file failed.
    #[error("failed to write openapi spec at {path}: {source}")]
    WriteFile {
        /// Target file path.
        path: PathBuf,
        /// I/O source error.
        #[source]
        source: std::io::Error,
    },
}

/// Build the OpenAPI document.
pub fn openapi_build() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Generate the OpenAPI document as YAML.
pub fn openapi_yaml_generate() -> Result<String, OpenApiError> {
    Ok(serde_yaml::to_string(&openapi_build())?)
}

/// Write `docs/openapi.yml` under the crate root and return the written path.
pub fn openapi_yaml_write_default() -> Result<PathBuf, OpenApiError> {
    let docs_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("docs");
    std::fs::create_dir_all(&docs_dir).map_err(|source| OpenApiError::CreateDir {
        path: docs_dir.clone(),
        source,
    })?;

    let path = docs_dir.join("openapi.yml");
    std::fs::write(&path, openapi_yaml_generate()?).map_err(|source| OpenApiError::WriteFile {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_yaml_generate_includes_result_paths() {
        let yaml = openapi_yaml_generate().expect("openapi yaml");
        assert!(yaml.contains("/result/statistics"));
        assert!(yaml.contains("/result/create"));
        assert!(yaml.contains("/result/{id}/verify-email"));
    }

    #[test]
    fn public_result_schema_declares_typed_formats() {
        let yaml = openapi_yaml_generate().expect("openapi yaml");
        assert!(yaml.contains("format: uuid"));
        assert!(yaml.contains("format: date-time"));
    }
}
