use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{JobStatusCount, NewReviewJob, ReviewJob},
};

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_RETRY: &str = "RETRY";
pub const STATUS_FAILED: &str = "FAILED";

const JOB_COLUMNS: &str = "\
job_key,
	job_id,
	kind,
	note_id,
	payload,
	status,
	attempts,
	max_attempts,
	last_error,
	available_at,
	created_at,
	updated_at";

/// Inserts the job or replaces the one already holding `job_key`, in a single statement.
///
/// A replaced job gets a fresh `job_id`, a zero attempt counter and `PENDING` status, so a
/// stale worker that still holds the previous `job_id` cannot complete or fail it. Returns
/// whether a job was replaced.
pub async fn upsert_job<'e, E>(executor: E, job: &NewReviewJob, now: OffsetDateTime) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let replaced: bool = sqlx::query_scalar(
		"\
INSERT INTO review_jobs (
	job_key,
	job_id,
	kind,
	note_id,
	payload,
	status,
	attempts,
	max_attempts,
	last_error,
	available_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, 'PENDING', 0, $6, NULL, $7, $8, $8)
ON CONFLICT (job_key) DO UPDATE
SET
	job_id = EXCLUDED.job_id,
	kind = EXCLUDED.kind,
	note_id = EXCLUDED.note_id,
	payload = EXCLUDED.payload,
	status = 'PENDING',
	attempts = 0,
	max_attempts = EXCLUDED.max_attempts,
	last_error = NULL,
	available_at = EXCLUDED.available_at,
	updated_at = EXCLUDED.updated_at
RETURNING (xmax::text <> '0')",
	)
	.bind(job.job_key.as_str())
	.bind(Uuid::new_v4())
	.bind(job.kind.as_str())
	.bind(job.note_id)
	.bind(&job.payload)
	.bind(job.max_attempts)
	.bind(job.available_at)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(replaced)
}

pub async fn delete_job<'e, E>(executor: E, job_key: &str) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM review_jobs WHERE job_key = $1")
		.bind(job_key)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

/// Deletes the job only if it still carries `job_id`.
pub async fn delete_job_version<'e, E>(executor: E, job_key: &str, job_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM review_jobs WHERE job_key = $1 AND job_id = $2")
		.bind(job_key)
		.bind(job_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get_job<'e, E>(executor: E, job_key: &str) -> Result<Option<ReviewJob>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT\n\t{JOB_COLUMNS}\nFROM review_jobs\nWHERE job_key = $1");
	let job = sqlx::query_as::<_, ReviewJob>(&sql).bind(job_key).fetch_optional(executor).await?;

	Ok(job)
}

/// Claims the earliest due job and leases it until `now + lease_seconds`.
///
/// `ACTIVE` rows are claimable again once their lease has expired, which covers a worker that
/// died mid-delivery.
pub async fn claim_next_due_job(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<ReviewJob>> {
	let mut tx = db.pool.begin().await?;
	let sql = format!(
		"\
SELECT
	{JOB_COLUMNS}
FROM review_jobs
WHERE status IN ('PENDING','RETRY','ACTIVE') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED"
	);
	let row = sqlx::query_as::<_, ReviewJob>(&sql).bind(now).fetch_optional(&mut *tx).await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + time::Duration::seconds(lease_seconds);

		sqlx::query(
			"UPDATE review_jobs SET status = 'ACTIVE', available_at = $1, updated_at = $2 WHERE job_key = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.job_key.as_str())
		.execute(&mut *tx)
		.await?;

		job.status = STATUS_ACTIVE.to_string();
		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_job_retry(
	db: &Db,
	job_key: &str,
	job_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE review_jobs
SET status = 'RETRY',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE job_key = $5 AND job_id = $6",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(job_key)
	.bind(job_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn mark_job_failed(
	db: &Db,
	job_key: &str,
	job_id: Uuid,
	attempts: i32,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE review_jobs
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	updated_at = $3
WHERE job_key = $4 AND job_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(now)
	.bind(job_key)
	.bind(job_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn list_jobs(db: &Db, limit: i64) -> Result<Vec<ReviewJob>> {
	let sql = format!(
		"\
SELECT
	{JOB_COLUMNS}
FROM review_jobs
ORDER BY available_at ASC
LIMIT $1"
	);
	let jobs = sqlx::query_as::<_, ReviewJob>(&sql).bind(limit).fetch_all(&db.pool).await?;

	Ok(jobs)
}

/// Waiting jobs (`PENDING` or `RETRY`) last written before `cutoff`.
pub async fn list_waiting_jobs_before(db: &Db, cutoff: OffsetDateTime) -> Result<Vec<ReviewJob>> {
	let sql = format!(
		"\
SELECT
	{JOB_COLUMNS}
FROM review_jobs
WHERE status IN ('PENDING','RETRY') AND updated_at < $1
ORDER BY available_at ASC"
	);
	let jobs = sqlx::query_as::<_, ReviewJob>(&sql).bind(cutoff).fetch_all(&db.pool).await?;

	Ok(jobs)
}

pub async fn count_jobs_by_status(db: &Db) -> Result<Vec<JobStatusCount>> {
	let counts = sqlx::query_as::<_, JobStatusCount>(
		"SELECT status, count(*) AS count FROM review_jobs GROUP BY status ORDER BY status",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(counts)
}
