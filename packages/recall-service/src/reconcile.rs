use std::collections::HashSet;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, ScheduleRequest, Scheduler};
use recall_domain::stage::ReviewStage;
use recall_storage::{
	jobs::STATUS_PENDING,
	models::{Note, ReviewJob},
	notes::PendingNoteFilter,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ReconcileReport {
	pub pending: usize,
	pub overdue: usize,
	pub future: usize,
	pub failed: usize,
	/// Jobs left as they are because they already fired for the note's current review.
	pub retained: usize,
	pub pruned: usize,
}

impl Scheduler {
	pub async fn reconcile(&self) -> Result<ReconcileReport> {
		self.reconcile_at(OffsetDateTime::now_utc()).await
	}

	/// Re-derives queue state from the pending notes.
	///
	/// Overdue notes are scheduled with zero delay and future notes at their `next_review`.
	/// A job that already fired for the note's current `next_review` (retrying, leased or
	/// exhausted) keeps its attempts and error. Waiting jobs written before `now` whose note is
	/// no longer pending are pruned. Per-note failures are counted, not fatal.
	pub async fn reconcile_at(&self, now: OffsetDateTime) -> Result<ReconcileReport> {
		let notes = self.notes.find_pending_notes(PendingNoteFilter::default()).await?;
		let mut report = ReconcileReport { pending: notes.len(), ..ReconcileReport::default() };
		let mut pending_ids = HashSet::with_capacity(notes.len());

		for note in &notes {
			pending_ids.insert(note.note_id);

			let stage = match note.current_stage.parse::<ReviewStage>() {
				Ok(stage) => stage,
				Err(err) => {
					report.failed += 1;

					tracing::warn!(note_id = %note.note_id, error = %err, "Skipping note with unknown stage.");

					continue;
				},
			};

			match self.job(note.note_id).await {
				Ok(Some(job)) if fired_for_current_review(&job, note) => {
					report.retained += 1;

					tracing::debug!(
						note_id = %note.note_id,
						job_key = %job.job_key,
						status = %job.status,
						attempts = job.attempts,
						"Keeping job that already fired for this review."
					);

					continue;
				},
				Ok(_) => {},
				Err(err) => {
					report.failed += 1;

					tracing::warn!(note_id = %note.note_id, error = %err, "Failed to read review job.");

					continue;
				},
			}

			let overdue = note.next_review < now;
			let due_at = if overdue { now } else { note.next_review };
			let req = ScheduleRequest { note_id: note.note_id, due_at, stage };

			match self.schedule_at(req, now).await {
				Ok(_) if overdue => report.overdue += 1,
				Ok(_) => report.future += 1,
				Err(err) => {
					report.failed += 1;

					tracing::warn!(note_id = %note.note_id, error = %err, "Failed to reschedule note.");
				},
			}
		}

		report.pruned = self.prune_stale_jobs(&pending_ids, now).await?;

		tracing::info!(
			event = "reconciliation_summary",
			pending = report.pending,
			overdue = report.overdue,
			future = report.future,
			failed = report.failed,
			retained = report.retained,
			pruned = report.pruned,
			"Reconciliation finished."
		);

		Ok(report)
	}

	async fn prune_stale_jobs(&self, pending_ids: &HashSet<Uuid>, now: OffsetDateTime) -> Result<usize> {
		let mut pruned = 0;

		for job in self.queue.store.waiting_before(now).await? {
			let keep = job.note_id.is_some_and(|note_id| pending_ids.contains(&note_id));

			if keep {
				continue;
			}
			// Version-checked so a schedule() racing with the pass is never undone.
			if self.queue.store.complete(&job.job_key, job.job_id).await? {
				pruned += 1;

				tracing::info!(event = "job_cancelled", job_key = %job.job_key, note_id = ?job.note_id, "Pruned job for a note that is no longer pending.");
			}
		}

		Ok(pruned)
	}
}

/// A job claimed at or after the note's `next_review` belongs to the current review. Rows written
/// before it are left over from an earlier stage and get replaced.
fn fired_for_current_review(job: &ReviewJob, note: &Note) -> bool {
	job.status != STATUS_PENDING && job.updated_at >= note.next_review
}
