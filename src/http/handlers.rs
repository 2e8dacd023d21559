//! Route handlers.
//!
//! | Method | Path                 | Handler   |
//! |--------|----------------------|-----------|
//! | POST   | `/newsletter/signup` | `signup`  |
//! | GET    | `/newsletter/thanks` | `thanks`  |
//! | GET    | `/health`            | `health`  |

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::http::request::Email;
use crate::storage::Newsletter;

pub const SIGNUP_PATH: &str = "/newsletter/signup";
pub const THANKS_PATH: &str = "/newsletter/thanks";
pub const HEALTH_PATH: &str = "/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub newsletter: Newsletter,
}

/// Build the route table.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(SIGNUP_PATH, post(signup))
        .route(THANKS_PATH, get(thanks))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
}

async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Response {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(err) => {
            tracing::debug!(error = %err, "Rejected signup");
            return (StatusCode::BAD_REQUEST, format!("Invalid email: {}", err)).into_response();
        }
    };

    match state.newsletter.signup(email.as_str()).await {
        // Delivering the confirmation token is someone else's job.
        Ok(_token) => Redirect::to(THANKS_PATH).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Error signing up");
            (StatusCode::BAD_GATEWAY, "Error signing up, please try again").into_response()
        }
    }
}

async fn thanks() -> &'static str {
    "Thanks for signing up! Check your inbox to confirm your subscription."
}

async fn health(State(state): State<AppState>) -> Response {
    match state.newsletter.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthStatus { status: "ok" })).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "unavailable",
                }),
            )
                .into_response()
        }
    }
}
