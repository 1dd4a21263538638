use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::scheduling::{APP_BASE_URL, LEASE_SECONDS, ScriptedTransport, note};
use recall_config::{Config, Notifier, Postgres, Queue, Reconcile, Service, Storage};
use recall_domain::stage::{ReviewAction, ReviewStage};
use recall_service::{
	CreateNoteRequest, DelayQueue, JobOutcome, RecallService, RetryPolicy, ReviewDispatcher,
	ReviewNoteRequest, ScheduleRequest, Scheduler,
};
use recall_storage::{db::Db, notes, users};
use recall_testkit::TestDatabase;

#[tokio::test]
#[ignore = "Requires external Postgres. Set RECALL_PG_DSN to run."]
async fn postgres_queue_retries_then_delivers_once() {
	let Some(base_dsn) = recall_testkit::env_dsn() else {
		eprintln!("Skipping postgres_queue_retries_then_delivers_once; set RECALL_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	// Whole seconds, so Postgres' microsecond precision round-trips exactly.
	let now = OffsetDateTime::now_utc().replace_nanosecond(0).expect("valid nanosecond");
	let user_id = Uuid::new_v4();
	let note = note(user_id, "Interior mutability", ReviewStage::OneDay, now);

	users::ensure_user(&db.pool, user_id, now).await.expect("Failed to ensure user.");
	users::assign_ntfy_topic(&db.pool, user_id, "review_pgqueue000000")
		.await
		.expect("Failed to assign topic.");
	notes::insert_note(&db.pool, &note).await.expect("Failed to insert note.");

	let transport = Arc::new(ScriptedTransport::failing(1));
	let repository = Arc::new(db.clone());
	let queue = Arc::new(DelayQueue::new(
		Arc::new(db.clone()),
		RetryPolicy::default(),
		Duration::seconds(LEASE_SECONDS),
	));
	let scheduler = Scheduler::new(queue, repository.clone());
	let dispatcher = ReviewDispatcher::new(repository, transport.clone(), APP_BASE_URL);
	let req = ScheduleRequest { note_id: note.note_id, due_at: now, stage: ReviewStage::OneDay };

	scheduler.schedule_at(req, now).await.expect("Failed to schedule.");
	scheduler.schedule_at(req, now).await.expect("Failed to reschedule.");

	let first = scheduler
		.queue()
		.process_next(now, &dispatcher)
		.await
		.expect("Failed to process.")
		.expect("Expected a due job.");

	let JobOutcome::Retrying { attempts, retry_at } = first.outcome else {
		panic!("Expected a retry, got {:?}.", first.outcome);
	};

	assert_eq!(attempts, 1);

	let second = scheduler
		.queue()
		.process_next(retry_at, &dispatcher)
		.await
		.expect("Failed to process.")
		.expect("Expected the retry to be due.");

	assert_eq!(second.outcome, JobOutcome::Completed);
	assert_eq!(transport.calls(), 2);
	assert_eq!(transport.sent().len(), 1);
	assert!(scheduler.job(note.note_id).await.expect("Failed to load job.").is_none());

	let report = scheduler.reconcile_at(retry_at).await.expect("Failed to reconcile.");

	assert_eq!(report.pending, 1);
	assert!(scheduler.job(note.note_id).await.expect("Failed to load job.").is_some());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

fn service_config(dsn: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			app_base_url: APP_BASE_URL.to_string(),
		},
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 4 } },
		notifier: Notifier {
			base_url: "http://127.0.0.1:1".to_string(),
			username: "app-notifier".to_string(),
			password: "test-pass".to_string(),
			timeout_ms: 500,
		},
		queue: Queue::default(),
		reconcile: Reconcile::default(),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set RECALL_PG_DSN to run."]
async fn concurrent_reviews_of_one_note_both_apply() {
	let Some(base_dsn) = recall_testkit::env_dsn() else {
		eprintln!("Skipping concurrent_reviews_of_one_note_both_apply; set RECALL_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = service_config(test_db.dsn().to_string());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let service = RecallService::new(cfg, db.clone(), Arc::new(ScriptedTransport::default()));
	let user_id = Uuid::new_v4();
	let created = service
		.create_note(CreateNoteRequest {
			user_id,
			name: "Send and Sync".to_string(),
			text: "Marker traits for threads.".to_string(),
			link: None,
		})
		.await
		.expect("Failed to create note.");
	let review =
		ReviewNoteRequest { user_id, note_id: created.note_id, action: ReviewAction::Good };
	let (first, second) =
		tokio::join!(service.review_note(review.clone()), service.review_note(review));
	let mut new_stages = [
		first.expect("First review failed.").new_stage,
		second.expect("Second review failed.").new_stage,
	];

	new_stages.sort();

	assert_eq!(new_stages, [ReviewStage::OneDay, ReviewStage::SevenDays]);

	let stored = notes::find_note(&db.pool, created.note_id)
		.await
		.expect("Failed to load note.")
		.expect("Note should exist.");
	let history: i64 =
		sqlx::query_scalar("SELECT count(*) FROM review_history WHERE note_id = $1")
			.bind(created.note_id)
			.fetch_one(&db.pool)
			.await
			.expect("Failed to count history.");
	let job = service
		.scheduler
		.job(created.note_id)
		.await
		.expect("Failed to load job.")
		.expect("Reviewed note should keep a job.");

	assert_eq!(stored.current_stage, ReviewStage::SevenDays.as_str());
	assert_eq!(history, 2);
	assert_eq!(job.available_at, stored.next_review);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
