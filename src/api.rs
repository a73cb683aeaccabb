//! HTTP API endpoints
//!
//! Read-only game state for dashboards, plus operator endpoints guarded by
//! the shared secret (Bearer token or Basic auth password).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth;
use crate::error::{ErrorKind, GameError};
use crate::state::AppState;
use crate::types::{GameSnapshot, LeaderboardEntry, Term, WinRecord};
use crate::ws;

/// Build the API and WebSocket routes
pub fn router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/terms", get(list_terms).post(add_term))
        .route("/api/admin/terms/{index}", delete(remove_term))
        .route("/api/admin/announce", post(announce))
        .route("/api/admin/unannounce", post(unannounce))
        .route("/api/admin/reset", post(reset))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::operator_auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/game-state", get(game_state))
        .route("/api/leaderboard", get(leaderboard))
        .merge(admin_routes)
        .with_state(state)
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

/// Wrapper turning a rejected action into an HTTP response
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::StateConflict => StatusCode::CONFLICT,
        };
        tracing::warn!("Operator request rejected: {}", self.0);
        let body = ErrorBody {
            success: false,
            code: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStateResponse {
    #[serde(flatten)]
    pub state: GameSnapshot,
    pub winners: Vec<WinRecord>,
}

/// GET /api/game-state
pub async fn game_state(State(state): State<Arc<AppState>>) -> Json<GameStateResponse> {
    Json(GameStateResponse {
        state: state.snapshot().await,
        winners: state.winners().await,
    })
}

/// GET /api/leaderboard
pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Json<Vec<LeaderboardEntry>> {
    Json(state.leaderboard().await)
}

#[derive(Debug, Deserialize)]
pub struct TermRequest {
    pub term: Term,
}

#[derive(Debug, Serialize)]
pub struct TermsResponse {
    pub success: bool,
    pub terms: Vec<Term>,
}

#[derive(Debug, Serialize)]
pub struct AnnouncedResponse {
    pub success: bool,
    pub announced: Vec<Term>,
}

/// GET /api/admin/terms
pub async fn list_terms(State(state): State<Arc<AppState>>) -> Json<TermsResponse> {
    Json(TermsResponse {
        success: true,
        terms: state.active_terms().await,
    })
}

/// POST /api/admin/terms
pub async fn add_term(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TermRequest>,
) -> Result<Json<TermsResponse>, ApiError> {
    let terms = state.add_term(req.term).await?;
    Ok(Json(TermsResponse {
        success: true,
        terms,
    }))
}

/// DELETE /api/admin/terms/{index}
pub async fn remove_term(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<TermsResponse>, ApiError> {
    let terms = state.remove_term(index).await?;
    Ok(Json(TermsResponse {
        success: true,
        terms,
    }))
}

/// POST /api/admin/announce
pub async fn announce(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TermRequest>,
) -> Result<Json<AnnouncedResponse>, ApiError> {
    let announced = state.announce_term(&req.term).await?;
    Ok(Json(AnnouncedResponse {
        success: true,
        announced,
    }))
}

/// POST /api/admin/unannounce
pub async fn unannounce(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TermRequest>,
) -> Result<Json<AnnouncedResponse>, ApiError> {
    let announced = state.unannounce_term(&req.term).await?;
    Ok(Json(AnnouncedResponse {
        success: true,
        announced,
    }))
}

/// POST /api/admin/reset
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.reset_session().await;
    Json(serde_json::json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::types::GameRules;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn terms(n: usize) -> Vec<Term> {
        (0..n).map(|i| format!("term-{}", i)).collect()
    }

    fn app(secret: Option<&str>) -> (Router, Arc<AppState>) {
        let auth = match secret {
            Some(s) => AuthConfig::with_secret(s),
            None => AuthConfig::disabled(),
        };
        let state = Arc::new(AppState::with_config(GameRules::default(), terms(20), auth));
        (router(state.clone()), state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (GameError::EmptyTerm, StatusCode::BAD_REQUEST),
            (GameError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                GameError::AlreadyAnnounced("x".to_string()),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_game_state_is_public() {
        let (app, state) = app(Some("secret"));
        state.announce_term("term-2").await.unwrap();

        let response = app
            .oneshot(
                Request::get("/api/game-state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["terms"].as_array().unwrap().len(), 20);
        assert_eq!(json["announced"], serde_json::json!(["term-2"]));
        assert_eq!(json["winners"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_admin_requires_credential() {
        let (app, state) = app(Some("secret"));

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/admin/announce")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"term":"term-1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.snapshot().await.announced.is_empty());

        let response = app
            .oneshot(
                Request::post("/api/admin/announce")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::from(r#"{"term":"term-1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["announced"], serde_json::json!(["term-1"]));
    }

    #[tokio::test]
    async fn test_admin_rejections_map_to_status() {
        let (app, _state) = app(None);

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/admin/terms/99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INDEX_OUT_OF_RANGE");
        assert_eq!(json["success"], false);

        let announce = || {
            Request::post("/api/admin/announce")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"term":"term-4"}"#))
                .unwrap()
        };
        let response = app.clone().oneshot(announce()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.oneshot(announce()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_admin_term_management() {
        let (app, state) = app(None);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/admin/terms")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"term":"synergy"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.active_terms().await.len(), 21);

        let response = app
            .oneshot(
                Request::delete("/api/admin/terms/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["terms"][0], "term-1");
        assert_eq!(json["terms"].as_array().unwrap().len(), 20);
    }
}
