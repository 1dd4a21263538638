use time::{Duration, OffsetDateTime};

use crate::scheduling::{Harness, ScriptedTransport, t0};
use recall_domain::stage::ReviewStage;
use recall_service::{
	BoxFuture, JobHandler, JobOutcome, JobPayload, Result, ScheduleRequest, Scheduler,
};
use recall_storage::jobs::{STATUS_FAILED, STATUS_PENDING, STATUS_RETRY};

#[tokio::test]
async fn failing_twice_then_succeeding_takes_three_attempts_with_exponential_backoff() {
	let harness = Harness::new(ScriptedTransport::failing(2));
	let note = harness.seed_note("Traits", ReviewStage::OneDay, t0());
	let req = ScheduleRequest { note_id: note.note_id, due_at: t0(), stage: ReviewStage::OneDay };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	let first = harness
		.queue()
		.process_next(t0(), &harness.dispatcher)
		.await
		.expect("process")
		.expect("due");
	let first_retry = t0() + Duration::seconds(2);

	assert_eq!(first.outcome, JobOutcome::Retrying { attempts: 1, retry_at: first_retry });

	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job kept");

	assert_eq!(job.status, STATUS_RETRY);
	assert!(job.last_error.is_some());

	// Not due before the backoff elapses.
	let early = harness
		.queue()
		.process_next(first_retry - Duration::milliseconds(1), &harness.dispatcher)
		.await
		.expect("process");

	assert!(early.is_none());

	let second = harness
		.queue()
		.process_next(first_retry, &harness.dispatcher)
		.await
		.expect("process")
		.expect("due");
	let second_retry = first_retry + Duration::seconds(4);

	assert_eq!(second.outcome, JobOutcome::Retrying { attempts: 2, retry_at: second_retry });

	let third = harness
		.queue()
		.process_next(second_retry, &harness.dispatcher)
		.await
		.expect("process")
		.expect("due");

	assert_eq!(third.outcome, JobOutcome::Completed);
	assert_eq!(harness.transport.calls(), 3);
	assert_eq!(harness.transport.sent().len(), 1);
	assert!(harness.scheduler.job(note.note_id).await.expect("job").is_none());
}

#[tokio::test]
async fn exhausted_jobs_are_retained_as_failed() {
	let harness = Harness::new(ScriptedTransport::failing(usize::MAX));
	let note = harness.seed_note("Unsafe", ReviewStage::OneDay, t0());
	let req = ScheduleRequest { note_id: note.note_id, due_at: t0(), stage: ReviewStage::OneDay };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	let mut now = t0();
	let mut outcomes = Vec::new();

	while let Some(run) =
		harness.queue().process_next(now, &harness.dispatcher).await.expect("process")
	{
		if let JobOutcome::Retrying { retry_at, .. } = run.outcome {
			now = retry_at;
		}

		outcomes.push(run.outcome);
	}

	assert_eq!(outcomes.len(), 3);
	assert_eq!(outcomes[2], JobOutcome::Exhausted { attempts: 3 });
	assert_eq!(harness.transport.calls(), 3);

	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job retained");

	assert_eq!(job.status, STATUS_FAILED);
	assert_eq!(job.attempts, 3);
	assert!(job.last_error.as_deref().is_some_and(|err| err.contains("Delivery failed")));

	// Nothing is claimable afterwards, however late.
	let later = harness
		.queue()
		.process_next(now + Duration::days(1), &harness.dispatcher)
		.await
		.expect("process");

	assert!(later.is_none());

	// A fresh schedule replaces the failed job.
	harness.scheduler.schedule_at(req, now).await.expect("schedule");

	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("job exists");

	assert_eq!(job.status, STATUS_PENDING);
	assert_eq!(job.attempts, 0);
}

/// Reschedules its own note while handling, like a review that lands mid-delivery.
struct ReschedulingHandler {
	scheduler: Scheduler,
}
impl JobHandler for ReschedulingHandler {
	fn handle<'a>(
		&'a self,
		payload: &'a JobPayload,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let JobPayload::ReviewNotification { note_id } = payload;
			let req = ScheduleRequest {
				note_id: *note_id,
				due_at: now + Duration::days(1),
				stage: ReviewStage::OneDay,
			};

			self.scheduler.schedule_at(req, now).await?;

			Ok(())
		})
	}
}

#[tokio::test]
async fn completion_of_a_replaced_job_keeps_the_replacement() {
	let harness = Harness::new(ScriptedTransport::default());
	let note = harness.seed_note("Async", ReviewStage::TenMinutes, t0());
	let req = ScheduleRequest { note_id: note.note_id, due_at: t0(), stage: ReviewStage::TenMinutes };

	harness.scheduler.schedule_at(req, t0()).await.expect("schedule");

	let handler = ReschedulingHandler { scheduler: harness.scheduler.clone() };
	let run = harness.queue().process_next(t0(), &handler).await.expect("process").expect("due");

	assert_eq!(run.outcome, JobOutcome::Superseded);

	let job = harness.scheduler.job(note.note_id).await.expect("job").expect("replacement kept");

	assert_eq!(job.status, STATUS_PENDING);
	assert_eq!(job.available_at, t0() + Duration::days(1));
	assert_ne!(job.job_id, run.job_id);
}
