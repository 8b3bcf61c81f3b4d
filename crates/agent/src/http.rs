//! HTTP surface: graph introspection and metrics.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::TextEncoder;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::system::System;

/// The router serving `/graph` and `/metrics`.
pub fn router(system: Arc<System>) -> Router {
    Router::new()
        .route("/graph", get(graph_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(system)
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to invoke the dot renderer: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("dot renderer exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

#[derive(Serialize)]
struct GraphDump {
    nodes: Vec<String>,
    edges: Vec<(String, String)>,
}

/// Render the current DAG. The default is SVG via the external `dot`
/// renderer; `?format=dot` and `?format=json` expose the raw forms.
async fn graph_handler(
    State(system): State<Arc<System>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let dot = system.marshal_dot();

    match params.get("format").map(String::as_str) {
        Some("dot") => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            dot,
        )
            .into_response(),
        Some("json") => {
            let (nodes, edges) = system.graph_snapshot();
            Json(GraphDump { nodes, edges }).into_response()
        }
        _ => match render_svg(&dot).await {
            Ok(svg) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "image/svg+xml")],
                svg,
            )
                .into_response(),
            Err(err) => {
                error!(error = %err, "graph rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        },
    }
}

/// Pipe DOT text through the external `dot` binary and collect the SVG.
async fn render_svg(dot: &str) -> Result<Vec<u8>, RendererError> {
    let mut child = Command::new("dot")
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(RendererError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output.stdout)
}

async fn metrics_handler(State(system): State<Arc<System>>) -> Response {
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&system.registry().gather()) {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
