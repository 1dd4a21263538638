pub mod delay_queue;
pub mod dispatch;
pub mod notes;
pub mod postgres;
pub mod reconcile;
pub mod scheduler;
pub mod time_serde;

mod error;

pub use delay_queue::{
	DelayQueue, Enqueued, FailedAttempt, JobHandler, JobOutcome, JobPayload, JobRun, JobView,
	QueueStats, RetryPolicy,
};
pub use dispatch::{DispatchOutcome, ReviewDispatcher};
pub use error::{Error, Result};
pub use notes::{
	CreateNoteRequest, DeleteNoteRequest, DeleteNoteResponse, NoteView, RecallService,
	ReviewNoteRequest, ReviewNoteResponse, SubscribeLink, TestNotificationResponse,
};
pub use reconcile::ReconcileReport;
pub use scheduler::{ScheduleOutcome, ScheduleRequest, Scheduler};

use std::{future::Future, pin::Pin};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use recall_providers::Notification;
use recall_storage::{
	models::{JobStatusCount, NewReviewJob, Note, ReviewJob, User},
	notes::PendingNoteFilter,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to notes and their owners. Notes are always re-read, never cached.
pub trait NoteRepository
where
	Self: Send + Sync,
{
	fn find_note_by_id<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<Option<Note>>>;

	fn find_pending_notes<'a>(
		&'a self,
		filter: PendingNoteFilter,
	) -> BoxFuture<'a, Result<Vec<Note>>>;

	fn find_owner<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<User>>>;
}

/// Durable job slots keyed by `job_key`.
///
/// `complete`, `retry` and `fail` only touch the row while it still carries the given
/// `job_id`, so they report `false` once a newer upsert replaced the job.
pub trait JobStore
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, job: &'a NewReviewJob, now: OffsetDateTime)
	-> BoxFuture<'a, Result<bool>>;

	fn remove<'a>(&'a self, job_key: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn get<'a>(&'a self, job_key: &'a str) -> BoxFuture<'a, Result<Option<ReviewJob>>>;

	fn claim_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease: Duration,
	) -> BoxFuture<'a, Result<Option<ReviewJob>>>;

	fn complete<'a>(&'a self, job_key: &'a str, job_id: Uuid) -> BoxFuture<'a, Result<bool>>;

	fn retry<'a>(
		&'a self,
		attempt: &'a FailedAttempt,
		available_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn fail<'a>(&'a self, attempt: &'a FailedAttempt) -> BoxFuture<'a, Result<bool>>;

	fn list<'a>(&'a self, limit: i64) -> BoxFuture<'a, Result<Vec<ReviewJob>>>;

	/// `PENDING` and `RETRY` jobs last written before `cutoff`.
	fn waiting_before<'a>(&'a self, cutoff: OffsetDateTime)
	-> BoxFuture<'a, Result<Vec<ReviewJob>>>;

	fn stats<'a>(&'a self) -> BoxFuture<'a, Result<Vec<JobStatusCount>>>;
}

pub trait NotificationTransport
where
	Self: Send + Sync,
{
	fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<()>>;
}
