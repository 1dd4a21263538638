use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	NoteRepository, Result,
	delay_queue::{self, DelayQueue, JobPayload},
};
use recall_domain::stage::ReviewStage;
use recall_storage::models::ReviewJob;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScheduleRequest {
	pub note_id: Uuid,
	pub due_at: OffsetDateTime,
	pub stage: ReviewStage,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScheduleOutcome {
	Scheduled { delay_ms: i64, replaced: bool },
	/// Completed notes are never enqueued; any existing job was cancelled.
	Skipped { cancelled: bool },
}

/// Keeps the delay queue consistent with the notes' next-review state.
#[derive(Clone)]
pub struct Scheduler {
	pub(crate) queue: Arc<DelayQueue>,
	pub(crate) notes: Arc<dyn NoteRepository>,
}
impl Scheduler {
	pub fn new(queue: Arc<DelayQueue>, notes: Arc<dyn NoteRepository>) -> Self {
		Self { queue, notes }
	}

	pub fn queue(&self) -> &DelayQueue {
		&self.queue
	}

	pub async fn schedule(&self, req: ScheduleRequest) -> Result<ScheduleOutcome> {
		self.schedule_at(req, OffsetDateTime::now_utc()).await
	}

	/// Replaces whatever job the note had with one due at `max(now, due_at)`.
	pub async fn schedule_at(
		&self,
		req: ScheduleRequest,
		now: OffsetDateTime,
	) -> Result<ScheduleOutcome> {
		if req.stage.is_completed() {
			let cancelled = self.cancel(req.note_id).await?;

			return Ok(ScheduleOutcome::Skipped { cancelled });
		}

		let enqueued = self.queue.add(&JobPayload::review(req.note_id), req.due_at, now).await?;

		tracing::info!(
			event = "job_scheduled",
			note_id = %req.note_id,
			job_key = %enqueued.job_key,
			stage = req.stage.as_str(),
			delay_ms = enqueued.delay_ms,
			replaced = enqueued.replaced,
			"Review job scheduled."
		);

		Ok(ScheduleOutcome::Scheduled { delay_ms: enqueued.delay_ms, replaced: enqueued.replaced })
	}

	/// Removes the note's job. Returns whether one existed.
	pub async fn cancel(&self, note_id: Uuid) -> Result<bool> {
		let job_key = delay_queue::review_job_key(note_id);
		let existed = self.queue.remove(&job_key).await?;

		if existed {
			tracing::info!(event = "job_cancelled", note_id = %note_id, job_key = %job_key, "Review job cancelled.");
		}

		Ok(existed)
	}

	pub async fn job(&self, note_id: Uuid) -> Result<Option<ReviewJob>> {
		self.queue.job(&delay_queue::review_job_key(note_id)).await
	}
}
