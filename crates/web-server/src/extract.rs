//! Extractors that bind and validate a request part in one step.
//!
//! Both binding and validation failures become [`INVALID_REQUEST`].

use crate::error::ApiError;
use crate::payload::INVALID_REQUEST;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// A validated JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

/// Validated query string parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

/// Validated path parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidPath<T>(pub T);

fn validate<T: Validate>(value: T, what: &str) -> Result<T, ApiError> {
    value
        .validate()
        .map_err(|errors| INVALID_REQUEST.wrap(errors, format!("Cannot validate {what}")))?;
    Ok(value)
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| INVALID_REQUEST.wrap(rejection, "Cannot bind request body"))?;

        Ok(Self(validate(value, "request body")?))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| INVALID_REQUEST.wrap(rejection, "Cannot bind query"))?;

        Ok(Self(validate(value, "query")?))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| INVALID_REQUEST.wrap(rejection, "Cannot bind path"))?;

        Ok(Self(validate(value, "path")?))
    }
}
