//! Eye and arm control endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiState, auth::require_api_key};
use crate::Error;
use crate::controller::EyesStatus;
use crate::display::{compose_pair, encode_png};
use crate::eyes::{Animation, BlinkTarget, Mood, Position};

/// Pixels between the two eyes in the preview image
const PREVIEW_GAP: u32 = 8;

/// Build eyes router: reads are open, control needs the API key
pub fn router(state: Arc<ApiState>) -> Router {
    let control = Router::new()
        .route("/api/eyes/mood", post(set_mood))
        .route("/api/eyes/look", post(look))
        .route("/api/eyes/blink", post(blink))
        .route("/api/eyes/animate", post(animate))
        .route("/api/eyes/curious", post(set_curious))
        .route("/api/express", post(express))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/api/eyes", get(status))
        .route("/api/eyes/frame.png", get(frame))
        .merge(control)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MoodRequest {
    pub mood: String,
}

#[derive(Debug, Deserialize)]
pub struct LookRequest {
    pub position: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlinkRequest {
    /// "both", "left" or "right"
    #[serde(default)]
    pub eye: Option<BlinkTarget>,
}

#[derive(Debug, Deserialize)]
pub struct AnimateRequest {
    pub animation: String,
}

#[derive(Debug, Deserialize)]
pub struct CuriousRequest {
    pub enabled: bool,
}

/// Acknowledgement for a queued command
#[derive(Debug, Serialize)]
pub struct CommandAck {
    pub accepted: &'static str,
    pub value: String,
}

impl CommandAck {
    fn new(accepted: &'static str, value: impl ToString) -> (StatusCode, Json<Self>) {
        (
            StatusCode::ACCEPTED,
            Json(Self {
                accepted,
                value: value.to_string(),
            }),
        )
    }
}

/// Response for `/api/express`
#[derive(Debug, Serialize)]
pub struct ExpressResponse {
    pub mood: Mood,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture: Option<&'static str>,
}

/// Current eye state
async fn status(State(state): State<Arc<ApiState>>) -> Result<Json<EyesStatus>, ApiError> {
    ensure_running(&state)?;
    Ok(Json(state.eyes.status()))
}

/// Both eyes side by side as a PNG
async fn frame(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    ensure_running(&state)?;
    let status = state.eyes.status();
    let image = compose_pair(&status.left, &status.right, PREVIEW_GAP);
    let png = encode_png(&image)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn set_mood(
    State(state): State<Arc<ApiState>>,
    req: Result<Json<MoodRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    let mood: Mood = req.mood.parse()?;
    state.eyes.set_mood(mood)?;
    tracing::info!(mood = %mood, "mood set via api");
    Ok(CommandAck::new("mood", mood))
}

async fn look(
    State(state): State<Arc<ApiState>>,
    req: Result<Json<LookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    let position: Position = req.position.parse()?;
    state.eyes.look(position)?;
    Ok(CommandAck::new("look", position))
}

async fn blink(
    State(state): State<Arc<ApiState>>,
    req: Result<Option<Json<BlinkRequest>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let target = req?.and_then(|Json(r)| r.eye).unwrap_or_default();
    state.eyes.blink(target)?;
    let value = match target {
        BlinkTarget::Both => "both",
        BlinkTarget::Left => "left",
        BlinkTarget::Right => "right",
    };
    Ok(CommandAck::new("blink", value))
}

async fn animate(
    State(state): State<Arc<ApiState>>,
    req: Result<Json<AnimateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    let animation: Animation = req.animation.parse()?;
    state.eyes.animate(animation)?;
    Ok(CommandAck::new("animate", req.animation.trim().to_lowercase()))
}

async fn set_curious(
    State(state): State<Arc<ApiState>>,
    req: Result<Json<CuriousRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    state.eyes.set_curious(req.enabled)?;
    Ok(CommandAck::new("curious", req.enabled))
}

/// Set the eye mood and play the matching arm gesture
async fn express(
    State(state): State<Arc<ApiState>>,
    req: Result<Json<MoodRequest>, JsonRejection>,
) -> Result<Json<ExpressResponse>, ApiError> {
    let Json(req) = req?;
    let mood: Mood = req.mood.parse()?;
    state.eyes.set_mood(mood)?;

    let gesture = match &state.arms {
        Some(arms) => match arms.gesture(mood) {
            Ok(()) => Some(crate::arms::Gesture::for_mood(mood).name()),
            Err(e) => {
                tracing::warn!(error = %e, "arms unavailable, expressing with eyes only");
                None
            }
        },
        None => None,
    };

    tracing::info!(mood = %mood, gesture = ?gesture, "expressing");
    Ok(Json(ExpressResponse { mood, gesture }))
}

fn ensure_running(state: &ApiState) -> Result<(), ApiError> {
    if state.eyes.is_running() {
        Ok(())
    } else {
        Err(ApiError::Unavailable("eyes controller is not running".to_string()))
    }
}

/// API errors
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidMood(m) => Self::BadRequest(format!("unknown mood: {m}")),
            Error::InvalidPosition(p) => Self::BadRequest(format!("unknown position: {p}")),
            Error::Eyes(msg) => Self::BadRequest(msg),
            Error::Controller(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
