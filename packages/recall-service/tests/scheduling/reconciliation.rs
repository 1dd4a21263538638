use time::Duration;
use uuid::Uuid;

use crate::scheduling::{Harness, ScriptedTransport, note, t0};
use recall_domain::stage::ReviewStage;
use recall_service::{JobOutcome, JobPayload, ReconcileReport, ScheduleRequest};
use recall_storage::{
	jobs::{STATUS_FAILED, STATUS_PENDING, STATUS_RETRY},
	models::ReviewJob,
};

fn failed_job(note_id: Uuid) -> ReviewJob {
	let payload = JobPayload::review(note_id);

	ReviewJob {
		job_key: payload.job_key(),
		job_id: Uuid::new_v4(),
		kind: payload.kind().to_string(),
		note_id: Some(note_id),
		payload: serde_json::to_value(payload).expect("payload"),
		status: STATUS_FAILED.to_string(),
		attempts: 3,
		max_attempts: 3,
		last_error: Some("Delivery failed".to_string()),
		available_at: t0() - Duration::days(1),
		created_at: t0() - Duration::days(1),
		updated_at: t0() - Duration::days(1),
	}
}

#[tokio::test]
async fn reconciliation_converges_queue_to_pending_notes() {
	let harness = Harness::new(ScriptedTransport::default());
	let overdue = harness.seed_note("Lifetimes", ReviewStage::OneDay, t0() - Duration::hours(30));
	let future = harness.seed_note("Traits", ReviewStage::SevenDays, t0() + Duration::days(3));
	let completed = harness.seed_note("Macros", ReviewStage::Completed, t0() + Duration::days(900));
	let deleted = Uuid::new_v4();
	let earlier = t0() - Duration::hours(2);

	// Stale jobs from before a restart: one for a deleted note, one for the completed note.
	for note_id in [deleted, completed.note_id] {
		let req = ScheduleRequest { note_id, due_at: earlier, stage: ReviewStage::OneDay };

		harness.scheduler.schedule_at(req, earlier).await.expect("schedule");
	}

	let report = harness.scheduler.reconcile_at(t0()).await.expect("reconcile");

	assert_eq!(
		report,
		ReconcileReport { pending: 2, overdue: 1, future: 1, failed: 0, retained: 0, pruned: 2 }
	);

	let mut jobs = harness.jobs.all();

	jobs.sort_by_key(|job| job.available_at);

	assert_eq!(jobs.len(), 2);
	assert_eq!(jobs[0].note_id, Some(overdue.note_id));
	assert_eq!(jobs[0].available_at, t0());
	assert_eq!(jobs[1].note_id, Some(future.note_id));
	assert_eq!(jobs[1].available_at, future.next_review);
}

#[tokio::test]
async fn running_reconciliation_twice_is_harmless() {
	let harness = Harness::new(ScriptedTransport::default());

	harness.seed_note("Iterators", ReviewStage::TenMinutes, t0() - Duration::minutes(1));
	harness.seed_note("Closures", ReviewStage::OneMonth, t0() + Duration::days(12));

	let first = harness.scheduler.reconcile_at(t0()).await.expect("reconcile");
	let mut before: Vec<_> =
		harness.jobs.all().into_iter().map(|job| (job.job_key, job.available_at)).collect();
	let second =
		harness.scheduler.reconcile_at(t0() + Duration::seconds(1)).await.expect("reconcile");
	let mut after: Vec<_> =
		harness.jobs.all().into_iter().map(|job| (job.job_key, job.available_at)).collect();

	before.sort();
	after.sort();

	assert_eq!(first.pending, 2);
	assert_eq!(second.pending, 2);
	assert_eq!(second.pruned, 0);
	assert_eq!(before.len(), after.len());

	for ((before_key, _), (after_key, _)) in before.iter().zip(&after) {
		assert_eq!(before_key, after_key);
	}
}

#[tokio::test]
async fn failed_jobs_are_retained_for_inspection() {
	let harness = Harness::new(ScriptedTransport::default());
	let deleted = Uuid::new_v4();

	harness.jobs.insert_raw(failed_job(deleted));

	let report = harness.scheduler.reconcile_at(t0()).await.expect("reconcile");

	assert_eq!(report.pruned, 0);

	let jobs = harness.jobs.all();

	assert_eq!(jobs.len(), 1);
	assert_eq!(jobs[0].status, STATUS_FAILED);
}

#[tokio::test]
async fn reconciliation_repairs_a_missing_job() {
	let harness = Harness::new(ScriptedTransport::default());
	let note = harness.seed_note("Generics", ReviewStage::OneDay, t0() + Duration::hours(5));

	assert!(harness.scheduler.job(note.note_id).await.expect("job").is_none());

	harness.scheduler.reconcile_at(t0()).await.expect("reconcile");

	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job repaired");

	assert_eq!(job.available_at, note.next_review);
}

#[tokio::test]
async fn overdue_note_dispatches_with_its_lateness_tier_after_reconciliation() {
	let harness = Harness::new(ScriptedTransport::default());
	let note = harness.seed_note("Pinning", ReviewStage::ThreeMonths, t0() - Duration::days(3));

	harness.scheduler.reconcile_at(t0()).await.expect("reconcile");
	harness.queue().process_next(t0(), &harness.dispatcher).await.expect("process");

	let sent = harness.transport.sent();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].priority, 5);
	assert!(sent[0].title.contains(&note.name));
	assert!(sent[0].tags.contains(&"rotating_light".to_string()));
}

#[tokio::test]
async fn exhausted_job_survives_repeated_reconciliation() {
	let harness = Harness::new(ScriptedTransport::failing(usize::MAX));
	let note = harness.seed_note("Borrowing", ReviewStage::OneDay, t0() - Duration::minutes(1));
	let req = ScheduleRequest {
		note_id: note.note_id,
		due_at: note.next_review,
		stage: ReviewStage::OneDay,
	};

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	let mut last = None;

	for now in [t0(), t0() + Duration::seconds(2), t0() + Duration::seconds(6)] {
		last = harness.queue().process_next(now, &harness.dispatcher).await.expect("process");
	}

	assert_eq!(last.map(|run| run.outcome), Some(JobOutcome::Exhausted { attempts: 3 }));

	for minute in 1..=5 {
		let now = t0() + Duration::minutes(minute);
		let report = harness.scheduler.reconcile_at(now).await.expect("reconcile");

		assert_eq!(report.retained, 1);
		assert_eq!(report.overdue, 0);
		assert!(harness.queue().process_next(now, &harness.dispatcher).await.expect("process").is_none());
	}

	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job retained");

	assert_eq!(job.status, STATUS_FAILED);
	assert_eq!(job.attempts, 3);
	assert!(job.last_error.is_some());
	assert_eq!(harness.transport.calls(), 3);
}

#[tokio::test]
async fn reconciliation_keeps_a_retrying_job_on_its_backoff() {
	let harness = Harness::new(ScriptedTransport::failing(usize::MAX));
	let note = harness.seed_note("Slices", ReviewStage::SevenDays, t0() - Duration::hours(1));
	let req = ScheduleRequest {
		note_id: note.note_id,
		due_at: note.next_review,
		stage: ReviewStage::SevenDays,
	};

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");
	harness.queue().process_next(t0(), &harness.dispatcher).await.expect("process");

	let report =
		harness.scheduler.reconcile_at(t0() + Duration::seconds(1)).await.expect("reconcile");
	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job");

	assert_eq!(report.retained, 1);
	assert_eq!(job.status, STATUS_RETRY);
	assert_eq!(job.attempts, 1);
	assert_eq!(job.available_at, t0() + Duration::seconds(2));
}

#[tokio::test]
async fn failure_from_an_earlier_stage_is_replaced() {
	let harness = Harness::new(ScriptedTransport::default());
	let note = harness.seed_note("Modules", ReviewStage::OneMonth, t0() + Duration::days(4));

	// Exhausted a day ago, before the note was reviewed onto its current stage.
	harness.jobs.insert_raw(failed_job(note.note_id));

	let report = harness.scheduler.reconcile_at(t0()).await.expect("reconcile");
	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job");

	assert_eq!(report.retained, 0);
	assert_eq!(report.future, 1);
	assert_eq!(job.status, STATUS_PENDING);
	assert_eq!(job.attempts, 0);
	assert_eq!(job.available_at, note.next_review);
}

#[tokio::test]
async fn one_bad_note_does_not_abort_the_pass() {
	let harness = Harness::new(ScriptedTransport::default());
	let overdue = harness.seed_note("Ownership", ReviewStage::OneDay, t0() - Duration::hours(3));
	let future = harness.seed_note("Drop", ReviewStage::OneYear, t0() + Duration::days(40));
	let mut broken = note(overdue.user_id, "Unsafe", ReviewStage::OneDay, t0() - Duration::hours(1));

	broken.current_stage = "SOMETIMES".to_string();

	harness.notes.insert(broken.clone());

	let report = harness.scheduler.reconcile_at(t0()).await.expect("reconcile");

	assert_eq!(
		report,
		ReconcileReport { pending: 3, overdue: 1, future: 1, failed: 1, retained: 0, pruned: 0 }
	);
	assert!(harness.scheduler.job(overdue.note_id).await.expect("job").is_some());
	assert!(harness.scheduler.job(future.note_id).await.expect("job").is_some());
	assert!(harness.scheduler.job(broken.note_id).await.expect("job").is_none());
}
