use time::Duration;

use crate::scheduling::{Harness, LEASE_SECONDS, ScriptedTransport, t0};
use recall_domain::stage::{self, ReviewStage};
use recall_service::{JobOutcome, JobStore, ScheduleRequest};

#[tokio::test]
async fn new_note_is_notified_once_when_its_first_review_comes_due() {
	let harness = Harness::new(ScriptedTransport::default());
	let next_review = stage::initial_next_review(t0());
	let note = harness.seed_note("Ownership rules", ReviewStage::TenMinutes, next_review);
	let req =
		ScheduleRequest { note_id: note.note_id, due_at: next_review, stage: ReviewStage::TenMinutes };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	let early = harness
		.queue()
		.process_next(t0() + Duration::minutes(9), &harness.dispatcher)
		.await
		.expect("process");

	assert!(early.is_none());
	assert_eq!(harness.transport.calls(), 0);

	let run = harness
		.queue()
		.process_next(t0() + Duration::minutes(10), &harness.dispatcher)
		.await
		.expect("process")
		.expect("due");

	assert_eq!(run.outcome, JobOutcome::Completed);
	assert_eq!(run.note_id, Some(note.note_id));

	let sent = harness.transport.sent();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].priority, 4);
	assert!(sent[0].title.contains("Ownership rules"));
	assert!(harness.jobs.all().is_empty());

	let again = harness
		.queue()
		.process_next(t0() + Duration::hours(1), &harness.dispatcher)
		.await
		.expect("process");

	assert!(again.is_none());
	assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test]
async fn expired_lease_is_redelivered() {
	let harness = Harness::new(ScriptedTransport::default());
	let note = harness.seed_note("Drop order", ReviewStage::OneDay, t0());
	let req = ScheduleRequest { note_id: note.note_id, due_at: t0(), stage: ReviewStage::OneDay };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	// A worker claims the job and dies before recording anything.
	let lease = Duration::seconds(LEASE_SECONDS);
	let claimed = harness.jobs.claim_due(t0(), lease).await.expect("claim").expect("due");
	let during_lease = harness
		.queue()
		.process_next(t0() + Duration::seconds(1), &harness.dispatcher)
		.await
		.expect("process");

	assert!(during_lease.is_none());

	let run = harness
		.queue()
		.process_next(t0() + lease, &harness.dispatcher)
		.await
		.expect("process")
		.expect("lease expired");

	assert_eq!(run.job_id, claimed.job_id);
	assert_eq!(run.outcome, JobOutcome::Completed);
	assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test]
async fn queue_stats_count_jobs_by_status() {
	let harness = Harness::new(ScriptedTransport::failing(1));
	let failing = harness.seed_note("Fails once", ReviewStage::OneDay, t0());
	let waiting = harness.seed_note("Waits", ReviewStage::OneDay, t0() + Duration::days(1));

	for note in [&failing, &waiting] {
		let req = ScheduleRequest {
			note_id: note.note_id,
			due_at: note.next_review,
			stage: ReviewStage::OneDay,
		};

		harness.scheduler.schedule_at(req, t0()).await.expect("schedule");
	}

	harness.queue().process_next(t0(), &harness.dispatcher).await.expect("process");

	let stats = harness.queue().stats(10).await.expect("stats");

	assert_eq!(stats.pending, 1);
	assert_eq!(stats.retry, 1);
	assert_eq!(stats.active, 0);
	assert_eq!(stats.failed, 0);
	assert_eq!(stats.jobs.len(), 2);
}
