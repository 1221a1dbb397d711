use axum::{
    body::{Body, to_bytes},
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use courier_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity;

/// Outcome of the fail-open authentication step, attached to every request.
/// `None` is an anonymous request; downstream checks decide whether that is
/// acceptable for the route.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Claims>);

const BODY_LIMIT: usize = 1024 * 1024;

/// First link of the chain, applied to every route. The token travels in the
/// request body's `_token` field (a compatibility requirement, not a header),
/// so the body is buffered, inspected, and restored for downstream
/// extractors. This middleware never rejects: missing body, non-JSON body,
/// missing `_token`, and invalid tokens all degrade to anonymous.
pub async fn authenticate(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let bytes = to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable request body: {}", e)))?;

    let token = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|v| v.get("_token").and_then(|t| t.as_str().map(str::to_owned)));

    let identity = identity::parse_identity(&state.secret_key, token.as_deref());
    parts.extensions.insert(CurrentUser(identity));

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

/// Second link: reject anonymous requests. On success the bare `Claims` are
/// re-attached so handlers can take `Extension<Claims>` directly.
pub async fn require_login(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|c| c.0.clone())
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Deserialize)]
pub(crate) struct UserPath {
    username: String,
}

/// Third link: the acting identity must equal the `:username` path
/// parameter. Anonymous and mismatched requests are both denied with 401;
/// only the message wording distinguishes them. Usable without
/// `require_login` ahead of it.
pub async fn require_self(
    Path(path): Path<UserPath>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|c| c.0.clone());

    match current {
        None => Err(ApiError::Unauthorized),
        Some(claims) if claims.username != path.username => Err(ApiError::Forbidden("Unauthorized")),
        Some(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
    }
}
