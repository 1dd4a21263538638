use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
	pub user_id: Uuid,
	pub ntfy_topic: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Note {
	pub note_id: Uuid,
	pub user_id: Uuid,
	pub name: String,
	pub text: String,
	pub link: Option<String>,
	pub current_stage: String,
	pub next_review: OffsetDateTime,
	pub last_review: Option<OffsetDateTime>,
	pub completed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ReviewHistoryEntry {
	pub history_id: Uuid,
	pub note_id: Uuid,
	pub action: String,
	pub old_stage: String,
	pub new_stage: String,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ReviewJob {
	pub job_key: String,
	pub job_id: Uuid,
	pub kind: String,
	pub note_id: Option<Uuid>,
	pub payload: Value,
	pub status: String,
	pub attempts: i32,
	pub max_attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Insert or replace request for the job slot identified by `job_key`.
#[derive(Clone, Debug)]
pub struct NewReviewJob {
	pub job_key: String,
	pub kind: String,
	pub note_id: Option<Uuid>,
	pub payload: Value,
	pub max_attempts: i32,
	pub available_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct JobStatusCount {
	pub status: String,
	pub count: i64,
}
