#![allow(dead_code)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use maaslin_core::scratch::RetentionPolicy;
use tower::ServiceExt;

use maaslin_api::config::{RunnerConfig, ServerConfig};
use maaslin_api::router::build_app_router;
use maaslin_api::state::AppState;

pub const BOUNDARY: &str = "maaslin-test-boundary";

/// A running test application plus the temp files it depends on.
///
/// The scratch root and stub script are deleted when this is dropped.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub scratch: tempfile::TempDir,
    _script: tempfile::TempPath,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn job_dir(&self, job_id: &str) -> std::path::PathBuf {
        self.scratch.path().join(job_id)
    }
}

/// Write a bash stub standing in for the analysis script.
pub fn write_stub_script(body: &str) -> tempfile::TempPath {
    let mut f = tempfile::Builder::new()
        .suffix(".sh")
        .tempfile()
        .expect("create stub script");
    writeln!(f, "#!/bin/bash").expect("write shebang");
    write!(f, "{body}").expect("write body");
    f.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o755))
        .expect("chmod stub");
    f.into_temp_path()
}

/// Build a test `ServerConfig` running `script` through `bash`.
pub fn test_config(script: &Path, scratch_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_bytes: 64 * 1024 * 1024,
        runner: RunnerConfig {
            script_path: script.to_path_buf(),
            interpreter: Some("bash".to_string()),
            scratch_root: scratch_root.to_path_buf(),
            retention: RetentionPolicy::Keep,
            sweep_interval_secs: 300,
            max_concurrent_jobs: 8,
            queue_timeout_secs: 30,
            job_timeout_secs: None,
        },
    }
}

/// Build the full application router around a stub script.
pub fn build_test_app(script_body: &str) -> TestApp {
    build_test_app_with(script_body, |_| {})
}

/// Like [`build_test_app`], with a hook to adjust the config first.
pub fn build_test_app_with(script_body: &str, adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let script = write_stub_script(script_body);
    let scratch = tempfile::tempdir().expect("create scratch root");

    let mut config = test_config(&script, scratch.path());
    adjust(&mut config);

    let state = AppState::from_config(config.clone()).expect("app state");
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        scratch,
        _script: script,
    }
}

// ---------------------------------------------------------------------------
// Multipart bodies
// ---------------------------------------------------------------------------

/// One part of a multipart form.
pub enum Part<'a> {
    File { name: &'a str, filename: &'a str, data: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { name, filename, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: text/tab-separated-values\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// The two required uploads.
pub fn tables<'a>(features: &'a [u8], metadata: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::File {
            name: "features",
            filename: "features.tsv",
            data: features,
        },
        Part::File {
            name: "metadata",
            filename: "metadata.tsv",
            data: metadata,
        },
    ]
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
