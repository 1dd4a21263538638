use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{Note, ReviewHistoryEntry},
};

const NOTE_COLUMNS: &str = "\
note_id,
	user_id,
	name,
	text,
	link,
	current_stage,
	next_review,
	last_review,
	completed_at,
	created_at,
	updated_at";

/// Filter for [`find_pending_notes`]. Pending notes always have `completed_at IS NULL`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PendingNoteFilter {
	/// Only notes whose `next_review` is strictly before this instant.
	pub due_before: Option<OffsetDateTime>,
}

pub async fn insert_note<'e, E>(executor: E, note: &Note) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO notes (
	note_id,
	user_id,
	name,
	text,
	link,
	current_stage,
	next_review,
	last_review,
	completed_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
	)
	.bind(note.note_id)
	.bind(note.user_id)
	.bind(note.name.as_str())
	.bind(note.text.as_str())
	.bind(note.link.as_deref())
	.bind(note.current_stage.as_str())
	.bind(note.next_review)
	.bind(note.last_review)
	.bind(note.completed_at)
	.bind(note.created_at)
	.bind(note.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn find_note<'e, E>(executor: E, note_id: Uuid) -> Result<Option<Note>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT\n\t{NOTE_COLUMNS}\nFROM notes\nWHERE note_id = $1");
	let note = sqlx::query_as::<_, Note>(&sql).bind(note_id).fetch_optional(executor).await?;

	Ok(note)
}

/// Like [`find_note`], but holds the row lock until the surrounding transaction ends.
pub async fn find_note_for_update<'e, E>(executor: E, note_id: Uuid) -> Result<Option<Note>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT\n\t{NOTE_COLUMNS}\nFROM notes\nWHERE note_id = $1\nFOR UPDATE");
	let note = sqlx::query_as::<_, Note>(&sql).bind(note_id).fetch_optional(executor).await?;

	Ok(note)
}

/// Notes that are not completed, ordered by `next_review` ascending.
pub async fn find_pending_notes<'e, E>(executor: E, filter: PendingNoteFilter) -> Result<Vec<Note>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT
	{NOTE_COLUMNS}
FROM notes
WHERE completed_at IS NULL
	AND ($1::timestamptz IS NULL OR next_review < $1)
ORDER BY next_review ASC, note_id ASC"
	);
	let notes =
		sqlx::query_as::<_, Note>(&sql).bind(filter.due_before).fetch_all(executor).await?;

	Ok(notes)
}

pub async fn list_notes_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Note>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT
	{NOTE_COLUMNS}
FROM notes
WHERE user_id = $1
ORDER BY created_at DESC, note_id DESC"
	);
	let notes = sqlx::query_as::<_, Note>(&sql).bind(user_id).fetch_all(executor).await?;

	Ok(notes)
}

pub async fn latest_note_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<Note>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT
	{NOTE_COLUMNS}
FROM notes
WHERE user_id = $1
ORDER BY created_at DESC, note_id DESC
LIMIT 1"
	);
	let note = sqlx::query_as::<_, Note>(&sql).bind(user_id).fetch_optional(executor).await?;

	Ok(note)
}

pub async fn update_note_review<'e, E>(executor: E, note: &Note) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE notes
SET
	current_stage = $1,
	next_review = $2,
	last_review = $3,
	completed_at = $4,
	updated_at = $5
WHERE note_id = $6",
	)
	.bind(note.current_stage.as_str())
	.bind(note.next_review)
	.bind(note.last_review)
	.bind(note.completed_at)
	.bind(note.updated_at)
	.bind(note.note_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn delete_note<'e, E>(executor: E, note_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM notes WHERE note_id = $1").bind(note_id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn insert_review_history<'e, E>(executor: E, entry: &ReviewHistoryEntry) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO review_history (
	history_id,
	note_id,
	action,
	old_stage,
	new_stage,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(entry.history_id)
	.bind(entry.note_id)
	.bind(entry.action.as_str())
	.bind(entry.old_stage.as_str())
	.bind(entry.new_stage.as_str())
	.bind(entry.created_at)
	.execute(executor)
	.await?;

	Ok(())
}
