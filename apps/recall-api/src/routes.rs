use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use recall_domain::stage::ReviewAction;
use recall_service::{
	CreateNoteRequest, DeleteNoteRequest, DeleteNoteResponse, Error, NoteView, QueueStats,
	ReconcileReport, ReviewNoteRequest, ReviewNoteResponse, SubscribeLink,
	TestNotificationResponse,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/notes", post(create_note).get(list_notes))
		.route("/v1/notes/{note_id}", delete(delete_note))
		.route("/v1/notes/{note_id}/review", patch(review_note))
		.route("/v1/notifications/subscribe_link", get(subscribe_link))
		.route("/v1/notifications/test", post(test_notification))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/queue", get(queue_status))
		.route("/v1/admin/reconcile", post(reconcile))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct UserQuery {
	user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
	user_id: Uuid,
	action: ReviewAction,
}

#[derive(Debug, Deserialize)]
struct TestNotificationBody {
	user_id: Uuid,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_note(
	State(state): State<AppState>,
	Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteView>), ApiError> {
	let response = state.service.create_note(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn list_notes(
	State(state): State<AppState>,
	Query(query): Query<UserQuery>,
) -> Result<Json<Vec<NoteView>>, ApiError> {
	let response = state.service.list_notes(query.user_id).await?;

	Ok(Json(response))
}

async fn review_note(
	State(state): State<AppState>,
	Path(note_id): Path<Uuid>,
	Json(payload): Json<ReviewBody>,
) -> Result<Json<ReviewNoteResponse>, ApiError> {
	let req = ReviewNoteRequest { user_id: payload.user_id, note_id, action: payload.action };
	let response = state.service.review_note(req).await?;

	Ok(Json(response))
}

async fn delete_note(
	State(state): State<AppState>,
	Path(note_id): Path<Uuid>,
	Query(query): Query<UserQuery>,
) -> Result<Json<DeleteNoteResponse>, ApiError> {
	let req = DeleteNoteRequest { user_id: query.user_id, note_id };
	let response = state.service.delete_note(req).await?;

	Ok(Json(response))
}

async fn subscribe_link(
	State(state): State<AppState>,
	Query(query): Query<UserQuery>,
) -> Result<Json<SubscribeLink>, ApiError> {
	let response = state.service.subscribe_link(query.user_id).await?;

	Ok(Json(response))
}

async fn test_notification(
	State(state): State<AppState>,
	Json(payload): Json<TestNotificationBody>,
) -> Result<Json<TestNotificationResponse>, ApiError> {
	let response = state.service.send_test_notification(payload.user_id).await?;

	Ok(Json(response))
}

async fn queue_status(State(state): State<AppState>) -> Result<Json<QueueStats>, ApiError> {
	let response = state.service.queue_status().await?;

	Ok(Json(response))
}

async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileReport>, ApiError> {
	let response = state.service.reconcile().await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::NotFound { message } => ApiError::new(StatusCode::NOT_FOUND, "not_found", message),
			Error::Forbidden { message } => ApiError::new(StatusCode::FORBIDDEN, "forbidden", message),
			Error::QueueUnavailable { message } =>
				ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "queue_unavailable", message),
			Error::Delivery { message } =>
				ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "delivery_failed", message),
			Error::Repository { message } => {
				tracing::error!(error = %message, "Repository error.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"repository_error",
					"Internal server error.",
				)
			},
			Error::Configuration { message } =>
				ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", message),
			Error::Payload { message } =>
				ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "invalid_payload", message),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
