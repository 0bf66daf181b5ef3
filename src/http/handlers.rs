//! Resource handlers.
//!
//! `GET <base>/<resource>` translates the sanitized query parameters into a
//! [`StructuredQuery`](crate::query::StructuredQuery) and runs it against the
//! store. `POST <base>/<resource>` stores the JSON body ingested by the
//! pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::http::context::{QueryParams, RequestContext};
use crate::http::error::{AppError, OperationalError};
use crate::query::QueryTranslator;
use crate::store::DocumentStore;

/// State shared by the resource handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub resources: Arc<BTreeSet<String>>,
}

impl AppState {
    pub fn new<I, S>(store: Arc<dyn DocumentStore>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            store,
            resources: Arc::new(resources.into_iter().map(Into::into).collect()),
        }
    }

    fn ensure_registered(&self, resource: &str, uri: &Uri) -> Result<(), AppError> {
        if self.resources.contains(resource) {
            Ok(())
        } else {
            Err(OperationalError::not_found(uri.path()).into())
        }
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    uri: Uri,
    QueryParams(params): QueryParams,
) -> Result<impl IntoResponse, AppError> {
    state.ensure_registered(&resource, &uri)?;

    let query = QueryTranslator::new(params)
        .filter()
        .sort()
        .limit_fields()
        .paginate()
        .into_query()?;

    tracing::debug!(resource = %resource, query = %query.to_document(), "Running query");
    let docs = state.store.find(&resource, &query).await?;

    Ok(Json(json!({
        "status": "success",
        "results": docs.len(),
        "data": { "data": docs },
    })))
}

pub async fn create_document(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    uri: Uri,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    state.ensure_registered(&resource, &uri)?;

    let body = match ctx.body {
        Some(body @ Value::Object(_)) => body,
        _ => return Err(OperationalError::bad_request("Request body must be a JSON object").into()),
    };

    let doc = state.store.create(&resource, body).await?;
    tracing::info!(resource = %resource, "Document created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "data": doc },
        })),
    ))
}
