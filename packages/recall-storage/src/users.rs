use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, models::User};

pub async fn ensure_user<'e, E>(executor: E, user_id: Uuid, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"INSERT INTO users (user_id, created_at) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
	)
	.bind(user_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn find_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<User>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, User>(
		"SELECT user_id, ntfy_topic, created_at FROM users WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(user)
}

/// Stores `topic` unless the user already has one, and returns the topic in effect.
pub async fn assign_ntfy_topic<'e, E>(executor: E, user_id: Uuid, topic: &str) -> Result<String>
where
	E: PgExecutor<'e>,
{
	let assigned: Option<Option<String>> = sqlx::query_scalar(
		"\
UPDATE users
SET ntfy_topic = COALESCE(ntfy_topic, $2)
WHERE user_id = $1
RETURNING ntfy_topic",
	)
	.bind(user_id)
	.bind(topic)
	.fetch_optional(executor)
	.await?;

	assigned.flatten().ok_or_else(|| Error::NotFound(format!("user {user_id}")))
}
