use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use carsure_firebase::{TokenVerifier, VerifyError};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEV_BYPASS_HEADER: &str = "x-dev-auth-bypass";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated caller, stored as a request extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// The caller's ID token, forwarded to the database as `?auth=`. `None`
    /// for the development bypass user.
    pub token: Option<String>,
}

impl AuthUser {
    fn dev_user() -> Self {
        Self {
            uid: "dev-user".to_string(),
            email: Some("dev@carsure.local".to_string()),
            display_name: Some("Development User".to_string()),
            token: None,
        }
    }
}

/// Token verification settings used by middleware.
#[derive(Clone)]
pub struct AuthState {
    verifier: Arc<dyn TokenVerifier>,
    dev_bypass: bool,
    admin_uids: Arc<HashSet<String>>,
}

impl AuthState {
    /// `dev_bypass` honours `X-Dev-Auth-Bypass: true`; only pass `true` in
    /// development. An empty `admin_uids` lets any authenticated user reach
    /// admin routes.
    pub fn new(verifier: Arc<dyn TokenVerifier>, dev_bypass: bool, admin_uids: &[String]) -> Self {
        if dev_bypass {
            tracing::warn!("development auth bypass header is enabled");
        }
        Self {
            verifier,
            dev_bypass,
            admin_uids: Arc::new(admin_uids.iter().cloned().collect()),
        }
    }

    fn is_admin(&self, uid: &str) -> bool {
        self.admin_uids.is_empty() || self.admin_uids.contains(uid)
    }

    fn bypass_requested(&self, headers: &HeaderMap) -> bool {
        self.dev_bypass
            && headers
                .get(DEV_BYPASS_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Sliding fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware verifying the Firebase ID token and inserting [`AuthUser`].
pub async fn require_auth(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    if auth.bypass_requested(req.headers()) {
        tracing::debug!("development auth bypass used");
        req.extensions_mut().insert(AuthUser::dev_user());
        return next.run(req).await;
    }

    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)).map(str::to_owned)
    else {
        return reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        );
    };

    match auth.verifier.verify(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(AuthUser {
                uid: user.uid,
                email: user.email,
                display_name: user.display_name,
                token: Some(token),
            });
            next.run(req).await
        }
        Err(VerifyError::InvalidToken(reason)) => {
            tracing::debug!(reason = %reason, "rejected ID token");
            reject(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or invalid bearer token",
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "token verification unavailable");
            reject(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "token could not be verified",
            )
        }
    }
}

/// Middleware restricting a route to configured admin uids. Runs after
/// [`require_auth`].
pub async fn require_admin(State(auth): State<AuthState>, req: Request, next: Next) -> Response {
    let allowed = req
        .extensions()
        .get::<AuthUser>()
        .is_some_and(|user| auth.is_admin(&user.uid));

    if allowed {
        next.run(req).await
    } else {
        reject(StatusCode::FORBIDDEN, "forbidden", "admin access required")
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
