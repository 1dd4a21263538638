use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	DelayQueue, Error, JobStore, NoteRepository, NotificationTransport, QueueStats,
	ReconcileReport, Result, ReviewDispatcher, ScheduleOutcome, ScheduleRequest, Scheduler,
	dispatch,
};
use recall_config::Config;
use recall_domain::{
	reminder,
	stage::{self, ReviewAction, ReviewStage},
};
use recall_storage::{
	db::Db,
	models::{Note, ReviewHistoryEntry},
	notes, users,
};

const QUEUE_STATUS_LIMIT: i64 = 50;
const TOPIC_PREFIX: &str = "review_";
const TOPIC_SUFFIX_LEN: usize = 16;

#[derive(Clone, Debug, Deserialize)]
pub struct CreateNoteRequest {
	pub user_id: Uuid,
	pub name: String,
	pub text: String,
	#[serde(default)]
	pub link: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReviewNoteRequest {
	pub user_id: Uuid,
	pub note_id: Uuid,
	pub action: ReviewAction,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeleteNoteRequest {
	pub user_id: Uuid,
	pub note_id: Uuid,
}

#[derive(Clone, Debug, Serialize)]
pub struct NoteView {
	pub note_id: Uuid,
	pub user_id: Uuid,
	pub name: String,
	pub text: String,
	pub link: Option<String>,
	pub current_stage: String,
	#[serde(with = "crate::time_serde")]
	pub next_review: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub last_review: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<Note> for NoteView {
	fn from(note: Note) -> Self {
		Self {
			note_id: note.note_id,
			user_id: note.user_id,
			name: note.name,
			text: note.text,
			link: note.link,
			current_stage: note.current_stage,
			next_review: note.next_review,
			last_review: note.last_review,
			completed_at: note.completed_at,
			created_at: note.created_at,
			updated_at: note.updated_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ReviewNoteResponse {
	pub note: NoteView,
	pub old_stage: ReviewStage,
	pub new_stage: ReviewStage,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct DeleteNoteResponse {
	pub note_id: Uuid,
	pub deleted: bool,
}

/// What a client needs to subscribe to the user's push topic.
#[derive(Clone, Debug, Serialize)]
pub struct SubscribeLink {
	pub server: String,
	pub username: String,
	pub password: String,
	pub topic: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TestNotificationResponse {
	pub sent: bool,
	pub note_id: Uuid,
	pub message: String,
}

pub struct RecallService {
	pub cfg: Config,
	pub db: Db,
	pub scheduler: Scheduler,
	pub transport: Arc<dyn NotificationTransport>,
}
impl RecallService {
	pub fn new(cfg: Config, db: Db, transport: Arc<dyn NotificationTransport>) -> Self {
		let store: Arc<dyn JobStore> = Arc::new(db.clone());
		let repository: Arc<dyn NoteRepository> = Arc::new(db.clone());
		let queue = Arc::new(DelayQueue::from_config(store, &cfg.queue));
		let scheduler = Scheduler::new(queue, repository);

		Self { cfg, db, scheduler, transport }
	}

	pub fn dispatcher(&self) -> ReviewDispatcher {
		ReviewDispatcher::new(
			Arc::new(self.db.clone()),
			self.transport.clone(),
			self.cfg.service.app_base_url.clone(),
		)
	}

	pub async fn create_note(&self, req: CreateNoteRequest) -> Result<NoteView> {
		let now = OffsetDateTime::now_utc();
		let name = req.name.trim();
		let text = req.text.trim();
		let link = req.link.as_deref().map(str::trim).filter(|link| !link.is_empty());

		if name.is_empty() || text.is_empty() {
			return Err(Error::InvalidRequest {
				message: "name and text must be non-empty.".to_string(),
			});
		}
		if let Some(link) = link
			&& !(link.starts_with("http://") || link.starts_with("https://"))
		{
			return Err(Error::InvalidRequest {
				message: "link must be an http or https URL.".to_string(),
			});
		}

		let note = Note {
			note_id: Uuid::new_v4(),
			user_id: req.user_id,
			name: name.to_string(),
			text: text.to_string(),
			link: link.map(str::to_string),
			current_stage: ReviewStage::TenMinutes.as_str().to_string(),
			next_review: stage::initial_next_review(now),
			last_review: None,
			completed_at: None,
			created_at: now,
			updated_at: now,
		};
		let mut tx = self.db.pool.begin().await?;

		users::ensure_user(&mut *tx, req.user_id, now).await?;
		notes::insert_note(&mut *tx, &note).await?;

		tx.commit().await?;

		self.schedule_best_effort(ScheduleRequest {
			note_id: note.note_id,
			due_at: note.next_review,
			stage: ReviewStage::TenMinutes,
		})
		.await;

		Ok(note.into())
	}

	pub async fn review_note(&self, req: ReviewNoteRequest) -> Result<ReviewNoteResponse> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let mut note = self.owned_note(&mut tx, req.user_id, req.note_id).await?;
		let current = note
			.current_stage
			.parse::<ReviewStage>()
			.map_err(|err| Error::Repository { message: err.to_string() })?;
		let transition = stage::apply_review(current, req.action, now);

		note.current_stage = transition.new_stage.as_str().to_string();
		note.next_review = transition.next_review;
		note.last_review = Some(now);
		note.completed_at = transition.completed_at;
		note.updated_at = now;

		notes::update_note_review(&mut *tx, &note).await?;
		notes::insert_review_history(
			&mut *tx,
			&ReviewHistoryEntry {
				history_id: Uuid::new_v4(),
				note_id: note.note_id,
				action: req.action.as_str().to_string(),
				old_stage: transition.old_stage.as_str().to_string(),
				new_stage: transition.new_stage.as_str().to_string(),
				created_at: now,
			},
		)
		.await?;

		// Scheduled while the row lock is held, so concurrent reviews of one note schedule in
		// commit order. Completed stages cancel inside schedule().
		self.schedule_best_effort(ScheduleRequest {
			note_id: note.note_id,
			due_at: note.next_review,
			stage: transition.new_stage,
		})
		.await;

		tx.commit().await?;

		tracing::info!(
			note_id = %note.note_id,
			action = req.action.as_str(),
			old_stage = transition.old_stage.as_str(),
			new_stage = transition.new_stage.as_str(),
			"Note reviewed."
		);

		Ok(ReviewNoteResponse {
			note: note.into(),
			old_stage: transition.old_stage,
			new_stage: transition.new_stage,
		})
	}

	pub async fn delete_note(&self, req: DeleteNoteRequest) -> Result<DeleteNoteResponse> {
		let mut tx = self.db.pool.begin().await?;
		let note = self.owned_note(&mut tx, req.user_id, req.note_id).await?;
		let deleted = notes::delete_note(&mut *tx, note.note_id).await?;

		tx.commit().await?;

		if let Err(err) = self.scheduler.cancel(note.note_id).await {
			tracing::warn!(note_id = %note.note_id, error = %err, "Failed to cancel review job. Reconciliation will prune it.");
		}

		Ok(DeleteNoteResponse { note_id: note.note_id, deleted })
	}

	pub async fn list_notes(&self, user_id: Uuid) -> Result<Vec<NoteView>> {
		let notes = notes::list_notes_for_user(&self.db.pool, user_id).await?;

		Ok(notes.into_iter().map(NoteView::from).collect())
	}

	/// Returns the shared subscriber credentials and the user's topic, creating the topic
	/// on first use.
	pub async fn subscribe_link(&self, user_id: Uuid) -> Result<SubscribeLink> {
		let now = OffsetDateTime::now_utc();

		users::ensure_user(&self.db.pool, user_id, now).await?;

		let topic = users::assign_ntfy_topic(&self.db.pool, user_id, &generate_topic()).await?;
		let notifier = &self.cfg.notifier;
		let server = notifier
			.base_url
			.trim_start_matches("https://")
			.trim_start_matches("http://")
			.to_string();

		Ok(SubscribeLink {
			server,
			username: notifier.username.clone(),
			password: notifier.password.clone(),
			topic,
		})
	}

	/// Sends an on-time reminder for the user's newest note straight through the transport.
	pub async fn send_test_notification(&self, user_id: Uuid) -> Result<TestNotificationResponse> {
		let user = users::find_user(&self.db.pool, user_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "User not found.".to_string() })?;
		let topic = user.ntfy_topic.ok_or_else(|| Error::InvalidRequest {
			message: "User has no notification topic. Request a subscribe link first.".to_string(),
		})?;
		let note = notes::latest_note_for_user(&self.db.pool, user_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "No notes found.".to_string() })?;
		let reminder = reminder::compose(&note.name, 0);
		let notification =
			dispatch::notification_for(&note, &topic, &reminder, &self.cfg.service.app_base_url);

		self.transport.send(&notification).await?;

		Ok(TestNotificationResponse {
			sent: true,
			note_id: note.note_id,
			message: format!("Notification sent for note: {}", note.name),
		})
	}

	pub async fn queue_status(&self) -> Result<QueueStats> {
		self.scheduler.queue().stats(QUEUE_STATUS_LIMIT).await
	}

	pub async fn reconcile(&self) -> Result<ReconcileReport> {
		self.scheduler.reconcile().await
	}

	async fn owned_note(
		&self,
		tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
		user_id: Uuid,
		note_id: Uuid,
	) -> Result<Note> {
		let note = notes::find_note_for_update(&mut **tx, note_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Note not found.".to_string() })?;

		if note.user_id != user_id {
			return Err(Error::Forbidden { message: "Note belongs to another user.".to_string() });
		}

		Ok(note)
	}

	async fn schedule_best_effort(&self, req: ScheduleRequest) -> Option<ScheduleOutcome> {
		match self.scheduler.schedule(req).await {
			Ok(outcome) => Some(outcome),
			Err(err) => {
				tracing::warn!(note_id = %req.note_id, error = %err, "Failed to schedule review job. Reconciliation will repair it.");

				None
			},
		}
	}
}

fn generate_topic() -> String {
	let suffix: String = Uuid::new_v4().simple().to_string().chars().take(TOPIC_SUFFIX_LEN).collect();

	format!("{TOPIC_PREFIX}{suffix}")
}
