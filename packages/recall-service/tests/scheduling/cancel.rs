use time::Duration;
use uuid::Uuid;

use crate::scheduling::{Harness, ScriptedTransport, t0};
use recall_domain::stage::ReviewStage;
use recall_service::ScheduleRequest;

#[tokio::test]
async fn cancel_is_idempotent() {
	let harness = Harness::new(ScriptedTransport::default());
	let note_id = Uuid::new_v4();

	assert!(!harness.scheduler.cancel(note_id).await.expect("cancel"));

	let req =
		ScheduleRequest { note_id, due_at: t0() + Duration::days(30), stage: ReviewStage::OneMonth };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	assert!(harness.scheduler.cancel(note_id).await.expect("cancel"));
	assert!(!harness.scheduler.cancel(note_id).await.expect("cancel"));
	assert!(harness.scheduler.job(note_id).await.expect("job").is_none());
}

#[tokio::test]
async fn cancel_only_touches_its_own_note() {
	let harness = Harness::new(ScriptedTransport::default());
	let kept = Uuid::new_v4();
	let dropped = Uuid::new_v4();

	for note_id in [kept, dropped] {
		let req = ScheduleRequest { note_id, due_at: t0(), stage: ReviewStage::OneDay };

		harness.scheduler.schedule_at(req, t0()).await.expect("schedule");
	}

	assert!(harness.scheduler.cancel(dropped).await.expect("cancel"));
	assert!(harness.scheduler.job(kept).await.expect("job").is_some());
}

#[tokio::test]
async fn cancelled_job_never_fires() {
	let harness = Harness::new(ScriptedTransport::default());
	let note = harness.seed_note("Borrowing", ReviewStage::TenMinutes, t0());
	let req = ScheduleRequest { note_id: note.note_id, due_at: t0(), stage: ReviewStage::TenMinutes };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");
	harness.scheduler.cancel(note.note_id).await.expect("cancel");

	let run = harness
		.queue()
		.process_next(t0() + Duration::minutes(1), &harness.dispatcher)
		.await
		.expect("process");

	assert!(run.is_none());
	assert_eq!(harness.transport.calls(), 0);
}
