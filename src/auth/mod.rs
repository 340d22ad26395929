/*!
 * # Request identity and access checks
 *
 * Identity is established upstream; requests arrive with:
 *
 * - `x-api-key`: must equal the configured store access key
 * - `x-user-id` / `x-user-role`: the acting user, read by the [`Actor`] extractor
 *
 * Authorization is table-driven through [`PermissionService`].
 */

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    entities::permission::{PermissionAction, Resource},
    errors::ServiceError,
    services::permissions::PermissionService,
};

pub mod rbac;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The shared key every caller must present.
#[derive(Clone)]
pub struct StoreAccessKey(Arc<str>);

impl StoreAccessKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Length-independent comparison of the presented key.
    fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        let mut diff = expected.len() ^ presented.len();
        for (i, b) in presented.iter().enumerate() {
            diff |= usize::from(b ^ expected.get(i).copied().unwrap_or(0));
        }
        diff == 0
    }
}

/// Rejects requests without a valid `x-api-key`.
pub async fn api_key_middleware(
    State(key): State<StoreAccessKey>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = match request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(value) if key.matches(value) => None,
        Some(_) => Some("invalid API key"),
        None => Some("missing API key"),
    };

    match verdict {
        None => next.run(request).await,
        Some(reason) => {
            warn!(path = %request.uri().path(), reason, "Rejected request");
            ServiceError::Unauthorized(reason.to_string()).into_response()
        }
    }
}

/// The user on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: String,
}

impl Actor {
    /// Fails with `Forbidden` unless this actor's role holds the grant.
    pub async fn require(
        &self,
        permissions: &PermissionService,
        resource: Resource,
        action: PermissionAction,
    ) -> Result<(), ServiceError> {
        permissions.require(&self.role, resource, action).await?;
        debug!(user_id = %self.user_id, role = %self.role, %resource, %action, "Access granted");
        Ok(())
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let missing = |name: &str| ServiceError::Unauthorized(format!("missing {} header", name));

        let user_id = header_value(parts, USER_ID_HEADER)
            .ok_or_else(|| missing(USER_ID_HEADER))?
            .parse::<Uuid>()
            .map_err(|_| {
                ServiceError::Unauthorized(format!("malformed {} header", USER_ID_HEADER))
            })?;
        let role = header_value(parts, USER_ROLE_HEADER)
            .ok_or_else(|| missing(USER_ROLE_HEADER))?
            .to_string();

        Ok(Actor { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|actor: Actor| async move { format!("{}:{}", actor.role, actor.user_id) }),
            )
            .layer(middleware::from_fn_with_state(
                StoreAccessKey::new("s3cret-key"),
                api_key_middleware,
            ))
    }

    fn request(key: Option<&str>, user: Option<&str>, role: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        if let Some(role) = role {
            builder = builder.header(USER_ROLE_HEADER, role);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn key_comparison() {
        let key = StoreAccessKey::new("s3cret-key");
        assert!(key.matches("s3cret-key"));
        assert!(!key.matches("s3cret-ke"));
        assert!(!key.matches("s3cret-key2"));
        assert!(!key.matches(""));
    }

    #[tokio::test]
    async fn missing_or_wrong_key_is_unauthorized() {
        let user = Uuid::new_v4().to_string();
        for key in [None, Some("nope")] {
            let res = app()
                .oneshot(request(key, Some(&user), Some("admin")))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn identity_headers_are_required() {
        let res = app()
            .oneshot(request(Some("s3cret-key"), None, Some("admin")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app()
            .oneshot(request(Some("s3cret-key"), Some("not-a-uuid"), Some("admin")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let user = Uuid::new_v4().to_string();
        let res = app()
            .oneshot(request(Some("s3cret-key"), Some(&user), Some("manager")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
