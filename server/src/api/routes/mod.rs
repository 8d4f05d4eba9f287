//! API route handlers

pub mod jq;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use crate::core::config::ResolvedConfiguration;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::core::error::StartupError;

/// Build the router serving the filter endpoint at the configured path
pub fn routes(config: Arc<ResolvedConfiguration>) -> Result<Router, StartupError> {
    let path = config.server.path.clone();
    validate_path(&path)?;

    Ok(Router::new()
        .route(&path, post(jq::run_filter))
        .with_state(config)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT)))
}

/// Reject paths the router would panic on or treat as captures
fn validate_path(path: &str) -> Result<(), StartupError> {
    let invalid = |reason| {
        Err(StartupError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    };

    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path.contains(['{', '}']) {
        return invalid("must not contain '{' or '}'");
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return invalid("segments must not start with ':' or '*'");
    }
    Ok(())
}
