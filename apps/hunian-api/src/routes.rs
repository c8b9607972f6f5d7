use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use hunian_service::{Error, RetrievalMode, TurnRequest};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuestionHookRequest {
	pub sender_id: String,
	pub sender_name: String,
	pub question: String,
	pub method: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionHookResponse {
	pub code: u16,
	pub status: &'static str,
	pub method: &'static str,
	pub answer: String,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/question_hook", post(question_hook))
		.with_state(state)
}

async fn health() -> Json<Value> {
	Json(json!({ "status": "Chatbot Ready" }))
}

async fn question_hook(
	State(state): State<AppState>,
	Json(payload): Json<QuestionHookRequest>,
) -> Result<Json<QuestionHookResponse>, ApiError> {
	let mode = match payload.method.as_deref() {
		None => RetrievalMode::default(),
		Some(raw) => RetrievalMode::parse(raw).ok_or_else(|| {
			ApiError::new(
				StatusCode::BAD_REQUEST,
				"invalid_request",
				"method must be one of api, vector or hybrid.",
			)
		})?,
	};
	let request = TurnRequest::new(payload.sender_id, payload.question)
		.with_user_name(payload.sender_name)
		.with_mode(mode);
	let report = state.assistant.handle_turn(request).await?;

	Ok(Json(QuestionHookResponse {
		code: StatusCode::OK.as_u16(),
		status: "ok",
		method: report.method.as_str(),
		answer: report.answer,
	}))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let (status, message) = match &err {
			Error::InvalidRequest { message } =>
				return Self::new(StatusCode::BAD_REQUEST, err.kind(), message.clone()),
			Error::MalformedFilter { .. } =>
				(StatusCode::BAD_GATEWAY, "The search request could not be understood."),
			Error::Provider { .. } => (StatusCode::BAD_GATEWAY, "An upstream service is unavailable."),
			Error::Storage { .. } | Error::Qdrant { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "Storage is unavailable."),
		};

		tracing::error!(error = %err, kind = err.kind(), "Turn failed.");

		Self::new(status, err.kind(), message)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
