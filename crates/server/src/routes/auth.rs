//! Account route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::Registration;
use crate::state::AppState;

/// Login request body.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn json_error(rejection: &JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// `POST /api/signup`
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(registration) = payload.map_err(|e| json_error(&e))?;

    let user_id = state.accounts().register(registration).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "userId": user_id,
            "message": "Account created successfully",
        })),
    ))
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload.map_err(|e| json_error(&e))?;

    let session = state
        .accounts()
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "userId": session.user_id,
        "email": session.email,
        "firstName": session.first_name,
        "lastName": session.last_name,
        "accessLevel": session.access_level,
        "message": "Login successful",
    })))
}
