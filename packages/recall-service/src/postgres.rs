//! Postgres-backed implementations of the service seams.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, FailedAttempt, JobStore, NoteRepository, NotificationTransport, Result,
};
use recall_providers::{Notification, NtfyClient};
use recall_storage::{
	db::Db,
	jobs,
	models::{JobStatusCount, NewReviewJob, Note, ReviewJob, User},
	notes::{self, PendingNoteFilter},
	users,
};

impl NoteRepository for Db {
	fn find_note_by_id<'a>(&'a self, note_id: Uuid) -> BoxFuture<'a, Result<Option<Note>>> {
		Box::pin(async move { Ok(notes::find_note(&self.pool, note_id).await?) })
	}

	fn find_pending_notes<'a>(
		&'a self,
		filter: PendingNoteFilter,
	) -> BoxFuture<'a, Result<Vec<Note>>> {
		Box::pin(async move { Ok(notes::find_pending_notes(&self.pool, filter).await?) })
	}

	fn find_owner<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<User>>> {
		Box::pin(async move { Ok(users::find_user(&self.pool, user_id).await?) })
	}
}

impl JobStore for Db {
	fn upsert<'a>(
		&'a self,
		job: &'a NewReviewJob,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { jobs::upsert_job(&self.pool, job, now).await.map_err(Error::queue) })
	}

	fn remove<'a>(&'a self, job_key: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { jobs::delete_job(&self.pool, job_key).await.map_err(Error::queue) })
	}

	fn get<'a>(&'a self, job_key: &'a str) -> BoxFuture<'a, Result<Option<ReviewJob>>> {
		Box::pin(async move { jobs::get_job(&self.pool, job_key).await.map_err(Error::queue) })
	}

	fn claim_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease: Duration,
	) -> BoxFuture<'a, Result<Option<ReviewJob>>> {
		Box::pin(async move {
			jobs::claim_next_due_job(self, now, lease.whole_seconds()).await.map_err(Error::queue)
		})
	}

	fn complete<'a>(&'a self, job_key: &'a str, job_id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			jobs::delete_job_version(&self.pool, job_key, job_id).await.map_err(Error::queue)
		})
	}

	fn retry<'a>(
		&'a self,
		attempt: &'a FailedAttempt,
		available_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			jobs::mark_job_retry(
				self,
				&attempt.job_key,
				attempt.job_id,
				attempt.attempts,
				&attempt.error,
				available_at,
				attempt.now,
			)
			.await
			.map_err(Error::queue)
		})
	}

	fn fail<'a>(&'a self, attempt: &'a FailedAttempt) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			jobs::mark_job_failed(
				self,
				&attempt.job_key,
				attempt.job_id,
				attempt.attempts,
				&attempt.error,
				attempt.now,
			)
			.await
			.map_err(Error::queue)
		})
	}

	fn list<'a>(&'a self, limit: i64) -> BoxFuture<'a, Result<Vec<ReviewJob>>> {
		Box::pin(async move { jobs::list_jobs(self, limit).await.map_err(Error::queue) })
	}

	fn waiting_before<'a>(
		&'a self,
		cutoff: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<ReviewJob>>> {
		Box::pin(async move {
			jobs::list_waiting_jobs_before(self, cutoff).await.map_err(Error::queue)
		})
	}

	fn stats<'a>(&'a self) -> BoxFuture<'a, Result<Vec<JobStatusCount>>> {
		Box::pin(async move { jobs::count_jobs_by_status(self).await.map_err(Error::queue) })
	}
}

impl NotificationTransport for NtfyClient {
	fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(NtfyClient::send(self, notification).await?) })
	}
}
