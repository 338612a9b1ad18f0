use crate::{
    AppState,
    error::ApiError,
    extract::{ValidJson, ValidPath, ValidQuery},
    payload::{CreateUserRequest, GetUserRequest, ListUsersRequest, UserResponse, UsersResponse},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// # GET /health
/// 200 when the database answers and the pool holds its minimum size.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.health.health().await {
        Ok(()) => (StatusCode::OK, "OK\n").into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// # POST /v1/user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_creator
        .create(request.name, request.username, request.age)
        .await?;
    Ok(Json(user.into()))
}

/// # GET /v1/user/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidPath(request): ValidPath<GetUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_getter.get_by_id(request.id).await?;
    Ok(Json(user.into()))
}

/// # GET /v1/user?username=
/// Users whose username contains the given text.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ValidQuery(request): ValidQuery<ListUsersRequest>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.user_getter.list(&request.username).await?;
    Ok(Json(users.into()))
}
