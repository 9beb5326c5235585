//! Read-only HTTP viewer.
//!
//! Three routes, all backed by store read paths:
//! - `GET /` static viewer page
//! - `GET /api/tasks` index entries
//! - `GET /api/task/{id}` one full task record
//!
//! Handlers may run concurrently; they never call a write path.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

use crate::error::{Error, JsonError, Result};
use crate::storage::Storage;
use crate::task::{parse_task_id, IndexEntry, Task};

const VIEWER_HTML: &str = include_str!("viewer.html");

/// Error response carrying the JSON error body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: i32,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!("viewer request failed: {err}");
        }
        let body = JsonError::from(&err);
        Self {
            status,
            message: body.error,
            code: body.code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = JsonError {
            error: self.message,
            code: self.code,
            details: None,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(storage: Storage) -> Router {
    Router::new()
        .route("/", get(viewer_page))
        .route("/api/tasks", get(list_tasks))
        .route("/api/task/{id}", get(show_task))
        .with_state(storage)
}

/// Bind on localhost and serve until the process is stopped
pub async fn serve(storage: Storage, port: u16) -> Result<()> {
    let listener = bind(port).await?;
    serve_on(listener, storage).await
}

/// Bind the viewer socket on localhost
pub async fn bind(port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "viewer listening");
    Ok(listener)
}

pub async fn serve_on(listener: TcpListener, storage: Storage) -> Result<()> {
    axum::serve(listener, router(storage)).await?;
    Ok(())
}

pub async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

pub async fn list_tasks(
    State(storage): State<Storage>,
) -> std::result::Result<Json<Vec<IndexEntry>>, ApiError> {
    Ok(Json(storage.read_index()?.tasks))
}

pub async fn show_task(
    State(storage): State<Storage>,
    Path(raw_id): Path<String>,
) -> std::result::Result<Json<Task>, ApiError> {
    let id = parse_task_id(&raw_id)?;
    Ok(Json(storage.read_task(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskGraph;
    use tempfile::TempDir;

    fn seeded() -> (TempDir, Storage) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path());
        storage.initialize().unwrap();
        let graph = TaskGraph::new(storage.clone());
        graph.create("First", "").unwrap();
        graph.create("Second", "").unwrap();
        (temp, storage)
    }

    #[tokio::test]
    async fn lists_index_entries() {
        let (_temp, storage) = seeded();
        let Json(entries) = list_tasks(State(storage)).await.unwrap();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn shows_single_task() {
        let (_temp, storage) = seeded();
        let Json(task) = show_task(State(storage), Path("2".to_string()))
            .await
            .unwrap();
        assert_eq!(task.title, "Second");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let (_temp, storage) = seeded();
        let err = show_task(State(storage), Path("two".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let (_temp, storage) = seeded();
        let err = show_task(State(storage), Path("99".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Task #99 not found");
    }

    #[tokio::test]
    async fn bind_listens_on_loopback_only() {
        let listener = bind(0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn page_is_static_html() {
        let Html(body) = viewer_page().await;
        assert!(body.contains("/api/tasks"));
    }
}
