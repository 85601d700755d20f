//! Axum wiring: two routes, basic-auth + tracing + panic-catching
//! middleware, and the session cookie dance.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, COOKIE, SET_COOKIE};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use indexer_util::errors::IndexerError;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::controller::Controller;

const SESSION_COOKIE: &str = "IndexerSession";

fn parse_session_cookie(req_headers: &axum::http::HeaderMap) -> Option<String> {
    let raw = req_headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn set_session_cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly"))
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}

async fn auth_middleware(State(ctrl): State<Arc<Controller>>, req: Request, next: Next) -> Response {
    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !ctrl.auth.verify(header) {
        return IndexerError::Unauthorized.into_response();
    }
    next.run(req).await
}

async fn get_handler(State(ctrl): State<Arc<Controller>>, req_headers: axum::http::HeaderMap, Path(path): Path<String>) -> Response {
    let cookie = parse_session_cookie(&req_headers);

    match ctrl.handle_get(&path, cookie).await {
        Ok(outcome) => {
            let mut response = Response::new(Body::from_stream(outcome.stream));
            if let Some(token) = outcome.cookie {
                response.headers_mut().insert(SET_COOKIE, set_session_cookie(&token));
            }
            response
        }
        Err(e) => e.into_response(),
    }
}

async fn put_handler(
    State(ctrl): State<Arc<Controller>>,
    req_headers: axum::http::HeaderMap,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let cookie = parse_session_cookie(&req_headers);
    let content_length = req_headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match ctrl.handle_put(&path, cookie, content_length, body.to_vec(), &query).await {
        Ok(outcome) => {
            let mut response = Response::new(Body::empty());
            if let Some(token) = outcome.cookie {
                response.headers_mut().insert(SET_COOKIE, set_session_cookie(&token));
            }
            response
        }
        Err(e) => e.into_response(),
    }
}

pub fn build_router(controller: Arc<Controller>) -> Router {
    let route = format!("{}/*path", controller.upload_prefix());

    Router::new()
        .route(&route, get(get_handler).put(put_handler))
        .route_layer(middleware::from_fn_with_state(controller.clone(), auth_middleware))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn parses_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("foo=bar; IndexerSession=abc123; baz=qux"));
        assert_eq!(parse_session_cookie(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_cookie_header_returns_none() {
        let headers = HeaderMap::new();
        assert!(parse_session_cookie(&headers).is_none());
    }
}
