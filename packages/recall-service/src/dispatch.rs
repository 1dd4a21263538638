use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture, Error, NoteRepository, NotificationTransport, Result,
	delay_queue::{JobHandler, JobPayload},
};
use recall_domain::{reminder, stage::ReviewStage, urgency::UrgencyTier};
use recall_providers::Notification;
use recall_storage::models::Note;

/// Result of one dispatch. Everything except `Sent` means the job reference was stale and
/// is consumed without notifying.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
	Sent { tier: UrgencyTier, priority: u8 },
	NoteMissing,
	Completed,
	NotDue,
	OwnerMissing,
	NoTopic,
}
impl DispatchOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Sent { .. } => "sent",
			Self::NoteMissing => "note_missing",
			Self::Completed => "completed",
			Self::NotDue => "not_due",
			Self::OwnerMissing => "owner_missing",
			Self::NoTopic => "no_topic",
		}
	}
}

pub struct ReviewDispatcher {
	notes: Arc<dyn NoteRepository>,
	transport: Arc<dyn NotificationTransport>,
	app_base_url: String,
}
impl ReviewDispatcher {
	pub fn new(
		notes: Arc<dyn NoteRepository>,
		transport: Arc<dyn NotificationTransport>,
		app_base_url: impl Into<String>,
	) -> Self {
		Self { notes, transport, app_base_url: app_base_url.into() }
	}

	/// Re-validates the note and sends its reminder. Transport failures surface as
	/// [`Error::Delivery`] so the queue can retry.
	pub async fn dispatch(&self, note_id: Uuid, now: OffsetDateTime) -> Result<DispatchOutcome> {
		let Some(note) = self.notes.find_note_by_id(note_id).await? else {
			tracing::info!(note_id = %note_id, "Note missing for review job. Dropping.");

			return Ok(DispatchOutcome::NoteMissing);
		};

		if is_completed(&note)? {
			tracing::info!(note_id = %note_id, "Note already completed. Dropping stale review job.");

			return Ok(DispatchOutcome::Completed);
		}
		if note.next_review > now {
			tracing::info!(note_id = %note_id, next_review = %note.next_review, "Note not due yet. Dropping stale review job.");

			return Ok(DispatchOutcome::NotDue);
		}

		let Some(owner) = self.notes.find_owner(note.user_id).await? else {
			tracing::warn!(note_id = %note_id, user_id = %note.user_id, "Note owner missing. Dropping review job.");

			return Ok(DispatchOutcome::OwnerMissing);
		};
		let Some(topic) = owner.ntfy_topic.as_deref() else {
			tracing::info!(note_id = %note_id, user_id = %note.user_id, "Owner has no notification topic. Skipping.");

			return Ok(DispatchOutcome::NoTopic);
		};
		let reminder = reminder::compose_at(&note.name, note.next_review, now);
		let notification = notification_for(&note, topic, &reminder, &self.app_base_url);

		self.transport.send(&notification).await.map_err(|err| match err {
			Error::Delivery { .. } => err,
			other => Error::Delivery { message: other.to_string() },
		})?;

		tracing::info!(
			note_id = %note_id,
			tier = reminder.tier.as_str(),
			priority = reminder.priority,
			"Review reminder sent."
		);

		Ok(DispatchOutcome::Sent { tier: reminder.tier, priority: reminder.priority })
	}
}
impl JobHandler for ReviewDispatcher {
	fn handle<'a>(
		&'a self,
		payload: &'a JobPayload,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			match payload {
				JobPayload::ReviewNotification { note_id } => {
					let outcome = self.dispatch(*note_id, now).await?;

					tracing::debug!(note_id = %note_id, outcome = outcome.as_str(), "Dispatch finished.");

					Ok(())
				},
			}
		})
	}
}

pub fn notification_for(
	note: &Note,
	topic: &str,
	reminder: &reminder::ReviewReminder,
	app_base_url: &str,
) -> Notification {
	Notification {
		topic: topic.to_string(),
		title: reminder.title.clone(),
		message: reminder.body.clone(),
		priority: reminder.priority,
		tags: reminder.tags.clone(),
		click: Some(format!("{}/notes/{}", app_base_url.trim_end_matches('/'), note.note_id)),
	}
}

fn is_completed(note: &Note) -> Result<bool> {
	if note.completed_at.is_some() {
		return Ok(true);
	}

	let stage = note
		.current_stage
		.parse::<ReviewStage>()
		.map_err(|err| Error::Repository { message: err.to_string() })?;

	Ok(stage.is_completed())
}
