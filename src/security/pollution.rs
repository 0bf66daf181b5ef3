//! Parameter pollution defense.
//!
//! Repeated query parameters collapse to their last occurrence unless the
//! name is whitelisted, in which case every value is kept. The cleaned
//! parameters are stored in the request extensions and written back into the
//! URI, so both the query translator and anything reading the raw URI agree.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};

use crate::query::{ParamValue, RawQueryParams};
use crate::security::is_api_path;

/// State for the pollution stage.
#[derive(Debug, Clone)]
pub struct PollutionStage {
    pub api_prefix: String,
    pub whitelist: Arc<HashSet<String>>,
}

impl PollutionStage {
    pub fn new<I, S>(api_prefix: impl Into<String>, whitelist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_prefix: api_prefix.into(),
            whitelist: Arc::new(whitelist.into_iter().map(Into::into).collect()),
        }
    }

    /// Collapse every non-whitelisted repeated parameter in place.
    /// Returns the names that were collapsed.
    pub fn clean(&self, params: &mut RawQueryParams) -> Vec<String> {
        let mut polluted = Vec::new();
        for (name, value) in params.iter_mut() {
            if self.whitelist.contains(name) {
                continue;
            }
            if is_repeated(value) {
                polluted.push(name.clone());
                value.collapse_to_last();
            }
        }
        polluted
    }
}

fn is_repeated(value: &ParamValue) -> bool {
    match value {
        ParamValue::Single(_) => false,
        ParamValue::Multi(_) => true,
        ParamValue::Nested(inner) => inner.values().any(is_repeated),
    }
}

pub async fn defend_pollution(
    State(stage): State<PollutionStage>,
    mut request: Request,
    next: Next,
) -> Response {
    if !is_api_path(request.uri().path(), &stage.api_prefix) {
        return next.run(request).await;
    }

    let mut params = RawQueryParams::from_uri(request.uri());
    let polluted = stage.clean(&mut params);

    if !polluted.is_empty() {
        tracing::debug!(params = ?polluted, "Collapsed repeated query parameters");
        if let Some(uri) = rewrite_query(request.uri(), &params.to_query_string()) {
            *request.uri_mut() = uri;
        }
    }

    request.extensions_mut().insert(params);
    next.run(request).await
}

fn rewrite_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
