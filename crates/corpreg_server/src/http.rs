//! HTTP routing.

use crate::error::{ServerError, ServerResult};
use crate::handler::RegistryHandler;
use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use corpreg_core::Company;
use serde::Deserialize;

/// Fields accepted by `POST /delete`, from the form body or the query string.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    /// Name or tax id of the record to remove.
    #[serde(default)]
    pub id: Option<String>,
}

/// Builds the registry router.
pub fn router(handler: RegistryHandler, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(list_companies))
        .route("/add", post(add_company))
        .route("/delete", post(delete_company))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(handler)
}

/// GET /
async fn list_companies(State(handler): State<RegistryHandler>) -> Json<Vec<Company>> {
    Json(handler.handle_list())
}

/// POST /add
///
/// The body is decoded as JSON whatever its `Content-Type` says.
async fn add_company(
    State(handler): State<RegistryHandler>,
    body: Bytes,
) -> ServerResult<StatusCode> {
    let company: Company = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid company payload: {e}")))?;
    let name = company.name.clone();

    // The write-through fsyncs; keep it off the async workers.
    let kind = tokio::task::spawn_blocking(move || handler.handle_add(company))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    tracing::debug!(name = %name, ?kind, "add request served");
    Ok(StatusCode::OK)
}

/// POST /delete
async fn delete_company(
    State(handler): State<RegistryHandler>,
    Query(query): Query<DeleteForm>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> ServerResult<StatusCode> {
    let id = form
        .ok()
        .and_then(|Form(form)| form.id)
        .filter(|id| !id.is_empty())
        .or(query.id)
        .unwrap_or_default();

    let removed = handler.handle_delete(&id)?;
    tracing::debug!(id = %id, removed, "delete request served");
    Ok(StatusCode::OK)
}
