use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Request, State},
    http::{header, header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use quill_shared::{db::now_ms, user_store::UserRecord, Viewer};
use tracing::Instrument;

use crate::{
    handlers::{error_response, internal_error},
    state::AppState,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACE_ID_HEADER: &str = "x-trace-id";

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Who is making the request. Guests carry no user.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser {
    pub user: Option<UserRecord>,
    pub viewer: Option<Viewer>,
}

impl CurrentUser {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.viewer.is_some_and(|viewer| viewer.is_admin)
    }
}

pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let request_id = read_or_generate_header_id(request.headers(), REQUEST_ID_HEADER, "req");
    let trace_id = read_or_generate_header_id(request.headers(), TRACE_ID_HEADER, "trace");

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        trace_id = %trace_id,
        method = %method,
        path = %path,
        user_id = tracing::field::Empty,
    );

    let mut response = next.run(request).instrument(span.clone()).await;

    set_response_header(response.headers_mut(), REQUEST_ID_HEADER, request_id.as_str());
    set_response_header(response.headers_mut(), TRACE_ID_HEADER, trace_id.as_str());

    tracing::info!(
        parent: &span,
        status = response.status().as_u16(),
        elapsed_ms = started_at.elapsed().as_millis(),
        "request completed"
    );

    response
}

/// Resolves `Authorization: Bearer <token>` into a [`CurrentUser`] request
/// extension. No header means guest; a header that does not resolve to an
/// active user is rejected instead of being downgraded.
pub async fn resolve_viewer_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(raw) = request.headers().get(header::AUTHORIZATION).cloned() else {
        request.extensions_mut().insert(CurrentUser::guest());
        return next.run(request).await;
    };

    let Some(token) = bearer_token(&raw) else {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid authorization header")
            .into_response();
    };

    let users = state.users.clone();
    let resolved = tokio::task::spawn_blocking(move || users.resolve_token(&token)).await;
    let user = match resolved {
        Ok(Ok(Some(user))) => user,
        Ok(Ok(None)) => {
            tracing::warn!("rejected unknown, revoked or disabled api token");
            return error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token")
                .into_response();
        },
        Ok(Err(err)) => return internal_error("Failed to resolve token", err).into_response(),
        Err(err) => return internal_error("Failed to resolve token", err).into_response(),
    };

    tracing::Span::current().record("user_id", user.id);
    let viewer = user.viewer(now_ms());
    request.extensions_mut().insert(CurrentUser {
        user: Some(user),
        viewer: Some(viewer),
    });
    next.run(request).await
}

/// Gate for `/api/admin`: guests get 401, signed-in non-admins 403.
pub async fn require_admin_middleware(request: Request, next: Next) -> Response {
    let (signed_in, is_admin) = request
        .extensions()
        .get::<CurrentUser>()
        .map_or((false, false), |current| (current.user.is_some(), current.is_admin()));
    match (signed_in, is_admin) {
        (_, true) => next.run(request).await,
        (true, false) => {
            error_response(StatusCode::FORBIDDEN, "Admin access required").into_response()
        },
        (false, false) => {
            error_response(StatusCode::UNAUTHORIZED, "Authentication required").into_response()
        },
    }
}

fn bearer_token(value: &HeaderValue) -> Option<String> {
    let value = value.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn read_or_generate_header_id(
    headers: &HeaderMap,
    header_name: &'static str,
    prefix: &str,
) -> String {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| generate_id(prefix))
}

fn generate_id(prefix: &str) -> String {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_nanos())
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{now_ns:032x}-{counter:016x}")
}

fn set_response_header(headers: &mut HeaderMap, header_name: &'static str, value: &str) {
    let Ok(header_value) = HeaderValue::from_str(value) else {
        return;
    };
    headers.insert(HeaderName::from_static(header_name), header_value);
}
