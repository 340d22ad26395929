use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::Json,
};
use serde::de::DeserializeOwned;
use std::str::FromStr;

use crate::{
    auth::Actor,
    entities::permission::{PermissionAction, Resource},
    errors::ServiceError,
    ApiResponse, AppState,
};

/// 201 with the standard envelope.
pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn created<T>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Parses a boundary string into a domain enum, as a validation failure.
pub fn parse_field<T: FromStr>(field: &str, raw: &str) -> Result<T, ServiceError> {
    raw.parse::<T>()
        .map_err(|_| ServiceError::ValidationError(format!("invalid {}: '{}'", field, raw)))
}

/// Checks the actor against the permissions table.
pub async fn authorize(
    state: &AppState,
    actor: &Actor,
    resource: Resource,
    action: PermissionAction,
) -> Result<(), ServiceError> {
    actor
        .require(&state.services.permissions, resource, action)
        .await
}

/// JSON body extractor whose rejections are 400 validation errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ServiceError {
    ServiceError::ValidationError(rejection.body_text())
}
