//! jq filter endpoint
//!
//! `POST <path>` with any JSON body. The filter comes from the
//! `x-goque-jq-filter` header when present and non-empty, otherwise from the
//! filter compiled at startup. The first non-null result is returned.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::{KeyValue, global};
use serde_json::Value;

use crate::api::types::{ApiError, json_response};
use crate::core::config::ResolvedConfiguration;
use crate::core::constants::{APP_NAME, FILTER_HEADER, MISSING_FILTER_MESSAGE, SPAN_JQ_REQUEST};
use crate::domain::filter::CompiledFilter;

/// Run a jq filter against the request body
pub async fn run_filter(
    State(config): State<Arc<ResolvedConfiguration>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let escape_html = config.server.escape_html;

    let parent = global::get_text_map_propagator(|p| p.extract(&HeaderExtractor(&headers)));
    let span = global::tracer(APP_NAME).start_with_context(SPAN_JQ_REQUEST, &parent);
    let cx = parent.with_span(span);

    let result = match body {
        Ok(body) => {
            let header_filter = headers.get(FILTER_HEADER).cloned();
            let task_cx = cx.clone();
            let task = tokio::task::spawn_blocking(move || {
                let _guard = task_cx.attach();
                evaluate(&config, header_filter.as_ref(), &body)
            });

            match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "jq evaluation task failed");
                    Err(ApiError::internal("Filter evaluation failed"))
                }
            }
        }
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    let span = cx.span();
    match result {
        Ok(value) => {
            span.set_attribute(KeyValue::new("http.response.status_code", 200_i64));
            json_response(StatusCode::OK, &value, escape_html)
        }
        Err(e) => {
            tracing::debug!(status = %e.status(), error = %e.message(), "jq request rejected");
            span.set_attribute(KeyValue::new(
                "http.response.status_code",
                i64::from(e.status().as_u16()),
            ));
            span.set_status(Status::error(e.message().to_string()));
            e.into_response_with(escape_html)
        }
    }
}

/// Decode, pick the filter, run it and extract the first value.
///
/// Order matters: a malformed body is reported before anything about the
/// filter.
fn evaluate(
    config: &ResolvedConfiguration,
    header_filter: Option<&HeaderValue>,
    body: &[u8],
) -> Result<Value, ApiError> {
    let input: Value = serde_json::from_slice(body)?;

    let header_filter = match header_filter {
        Some(value) => std::str::from_utf8(value.as_bytes())
            .map_err(|_| ApiError::bad_request("Filter header is not valid UTF-8"))?,
        None => "",
    };

    let output = if !header_filter.is_empty() {
        tracing::trace!(filter = %header_filter, "Using filter from request header");
        CompiledFilter::compile(header_filter)?.first_value(input)?
    } else if let Some(filter) = &config.filter {
        filter.first_value(input)?
    } else {
        return Err(ApiError::bad_request(MISSING_FILTER_MESSAGE));
    };

    Ok(output.unwrap_or(Value::Null))
}

/// Reads W3C trace context and baggage from request headers
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::routes;
    use crate::core::config::{EnvSnapshot, default_configuration, resolve_settings};
    use crate::core::constants::{DEFAULT_BODY_LIMIT, DEFAULT_PATH};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const BODY: &str = r#"{"test":{"peanuts":true,"pineapple":"nope."}}"#;
    const INNER: &str = r#"{"peanuts":true,"pineapple":"nope."}"#;

    fn config(startup_filter: Option<&str>, escape_html: bool) -> Arc<ResolvedConfiguration> {
        let mut settings =
            resolve_settings(default_configuration(), &EnvSnapshot::default(), ["goque"])
                .unwrap()
                .settings;
        settings.jq_filter = startup_filter.unwrap_or_default().to_string();
        settings.server.escape_html = escape_html;
        Arc::new(ResolvedConfiguration::build(settings).unwrap())
    }

    async fn send_request(
        config: Arc<ResolvedConfiguration>,
        request: Request<Body>,
    ) -> (StatusCode, String) {
        let response = routes(config).unwrap().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn post(
        config: Arc<ResolvedConfiguration>,
        filter: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, String) {
        let mut request = Request::builder()
            .method("POST")
            .uri(DEFAULT_PATH)
            .header("content-type", "application/json");
        if let Some(filter) = filter {
            request = request.header(FILTER_HEADER, filter);
        }
        send_request(config, request.body(Body::from(body)).unwrap()).await
    }

    #[tokio::test]
    async fn test_header_filter() {
        let (status, body) = post(config(None, false), Some(".test"), BODY).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, INNER);
    }

    #[tokio::test]
    async fn test_missing_filter() {
        let (status, body) = post(config(None, false), None, BODY).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            r#"{"status":"error","message":"A JQ filter was not sent with request"}"#
        );
    }

    #[tokio::test]
    async fn test_empty_header_counts_as_missing() {
        let (status, body) = post(config(None, false), Some(""), BODY).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains(MISSING_FILTER_MESSAGE));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        for filter in [Some(".test"), Some("(wut"), None] {
            let (status, body) = post(config(None, false), filter, r#""test"#).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "filter {filter:?}");

            let envelope: Value = serde_json::from_str(&body).unwrap();
            assert_eq!(envelope["status"], "error");
            assert_ne!(envelope["message"], MISSING_FILTER_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_with_startup_filter() {
        let (status, _) = post(config(Some(".peanuts"), false), None, "{").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_startup_filter_without_header() {
        let (status, body) = post(config(Some(".peanuts"), false), None, INNER).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "true");
    }

    #[tokio::test]
    async fn test_header_overrides_startup_filter() {
        let (status, body) = post(config(Some(".peanuts"), false), Some(".pineapple"), INNER).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#""nope.""#);
    }

    #[tokio::test]
    async fn test_empty_header_falls_back_to_startup_filter() {
        let (status, body) = post(config(Some(".peanuts"), false), Some(""), INNER).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "true");
    }

    #[tokio::test]
    async fn test_first_value_only() {
        let (status, body) = post(config(None, false), Some(".[]"), "[1,2,3]").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1");
    }

    #[tokio::test]
    async fn test_null_results_are_skipped() {
        let (status, body) = post(config(None, false), Some(".a, .b"), r#"{"b":2}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2");
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let (status, body) =
            post(config(None, false), Some(r#"error("boom"), 1"#), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["status"], "error");
        assert!(envelope["message"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_execution_error() {
        let (status, body) = post(config(None, false), Some(".a"), "5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with(r#"{"status":"error","message":"#));
    }

    #[tokio::test]
    async fn test_invalid_header_filter() {
        let (status, body) = post(config(Some(".peanuts"), false), Some("(wut"), INNER).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["message"], "unclosed delimiter `(`");
    }

    #[tokio::test]
    async fn test_undefined_function_message() {
        let (status, body) = post(config(None, false), Some("nope(1)"), INNER).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            r#"{"status":"error","message":"undefined filter `nope/1`"}"#
        );
    }

    #[tokio::test]
    async fn test_oversized_body_uses_error_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri(DEFAULT_PATH)
            .header(FILTER_HEADER, ".")
            .body(Body::from("a".repeat(DEFAULT_BODY_LIMIT + 1)))
            .unwrap();

        let (status, body) = send_request(config(None, false), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["status"], "error");
        assert!(!envelope["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_is_null() {
        let (status, body) = post(config(None, false), Some("empty"), "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "null");

        let (status, body) = post(config(None, false), Some(".missing"), "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "null");
    }

    #[tokio::test]
    async fn test_html_escaping() {
        let body = r#"{"a":"<b>&</b>"}"#;

        let (_, plain) = post(config(None, false), Some(".a"), body).await;
        assert_eq!(plain, r#""<b>&</b>""#);

        let (status, escaped) = post(config(None, true), Some(".a"), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(escaped, "\"\\u003cb\\u003e\\u0026\\u003c/b\\u003e\"");
    }

    #[tokio::test]
    async fn test_non_utf8_header_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri(DEFAULT_PATH)
            .header(FILTER_HEADER, HeaderValue::from_bytes(b".\xff").unwrap())
            .body(Body::from(INNER))
            .unwrap();

        let (status, _) = send_request(config(Some(".peanuts"), false), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_content_type_is_not_enforced() {
        let request = Request::builder()
            .method("POST")
            .uri(DEFAULT_PATH)
            .header(FILTER_HEADER, ".test")
            .body(Body::from(BODY))
            .unwrap();

        let (status, body) = send_request(config(None, false), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, INNER);
    }

    #[tokio::test]
    async fn test_other_methods_are_not_allowed() {
        let request = Request::builder()
            .method("GET")
            .uri(DEFAULT_PATH)
            .body(Body::empty())
            .unwrap();

        let (status, _) = send_request(config(Some("."), false), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v2/jq")
            .body(Body::from("{}"))
            .unwrap();

        let (status, _) = send_request(config(Some("."), false), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_header_extractor() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        let extractor = HeaderExtractor(&headers);
        assert_eq!(
            extractor.get("traceparent"),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
        assert_eq!(extractor.get("baggage"), None);
        assert_eq!(extractor.keys(), vec!["traceparent"]);
    }
}
