use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use time::macros::date;
use uuid::Uuid;

use mmp_config::{LlmProviderConfig, ProviderConfig};
use mmp_domain::{
	draft::{AgendaItemDraft, AttendeeDraft},
	status::ActionStatus,
};
use mmp_providers::chat::{ChatRequest, ContentPart};
use mmp_service::{
	ActionItemInput, ActionItemPatch, ActionItemQuery, AiGenerateRequest, AnalyzeScreenshotRequest,
	AudioUpload, BoxFuture, ClassifyRequest, Error, IdentifySpeakersRequest, LlmProvider,
	MeetingInput, MeetingListQuery, MeetingService, ProjectRequest, Providers, ReorderList,
	ReorderRequest, Result, ScreenshotUpload, TranscriptionProvider,
};
use mmp_storage::db::Db;
use mmp_testkit::TestDatabase;

/// Fails for every provider whose id is listed and answers `reply` for the rest.
struct ScriptedLlm {
	failing: Vec<&'static str>,
	reply: String,
	calls: Arc<Mutex<Vec<String>>>,
	images: Arc<AtomicUsize>,
}
impl ScriptedLlm {
	fn new(failing: &[&'static str], reply: impl Into<String>) -> Self {
		Self {
			failing: failing.to_vec(),
			reply: reply.into(),
			calls: Arc::new(Mutex::new(Vec::new())),
			images: Arc::new(AtomicUsize::new(0)),
		}
	}
}
impl LlmProvider for ScriptedLlm {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		request: &'a ChatRequest,
	) -> BoxFuture<'a, Result<String>> {
		self.calls.lock().expect("Failed to lock call log.").push(cfg.provider_id.clone());
		self.images.fetch_add(
			request.parts.iter().filter(|part| matches!(part, ContentPart::Image { .. })).count(),
			Ordering::SeqCst,
		);

		let fails = self.failing.contains(&cfg.provider_id.as_str());
		let reply = self.reply.clone();
		let provider_id = cfg.provider_id.clone();

		Box::pin(async move {
			if fails {
				return Err(Error::Provider { message: format!("{provider_id} is down.") });
			}

			Ok(reply)
		})
	}
}

struct SpyTranscription {
	calls: Arc<AtomicUsize>,
}
impl SpyTranscription {
	fn new() -> Self {
		Self { calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl TranscriptionProvider for SpyTranscription {
	fn transcribe<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		audio: &'a AudioUpload,
	) -> BoxFuture<'a, Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let size = audio.bytes.len();

		Box::pin(async move { Ok(format!("we reviewed {size} bytes of audio")) })
	}
}

async fn build_service(test_db: &TestDatabase, llm: ScriptedLlm) -> MeetingService {
	let cfg = test_db.config().expect("Failed to build test config.");
	let db = Db::connect(&cfg.storage.sqlite).await.expect("Failed to connect to SQLite.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	MeetingService::with_providers(
		cfg,
		db,
		Providers::new(Arc::new(llm), Arc::new(SpyTranscription::new())),
	)
}

fn action_item(description: &str, owner: &str, status: &str) -> ActionItemInput {
	ActionItemInput {
		description: description.to_string(),
		owner: owner.to_string(),
		status: Some(status.to_string()),
		..Default::default()
	}
}

fn sample_input() -> MeetingInput {
	MeetingInput {
		project_name: "Apollo".to_string(),
		meeting_date: "2026-03-02".to_string(),
		purpose: "Launch readiness review".to_string(),
		agenda_items: vec![
			AgendaItemDraft { item: "Budget".to_string(), notes: "On track".to_string() },
			AgendaItemDraft { item: "Timeline".to_string(), notes: String::new() },
			AgendaItemDraft { item: "Risks".to_string(), notes: "Vendor delay".to_string() },
		],
		attendees: vec![
			AttendeeDraft { name: "Ann".to_string(), attended: true },
			AttendeeDraft { name: "Bo".to_string(), attended: false },
			AttendeeDraft { name: "Cy".to_string(), attended: true },
		],
		action_items: vec![
			action_item("Send the launch checklist", "Ann", "Pending"),
			action_item("Book the apollo demo room", "Bo", "In Progress"),
		],
		notes: "Launch moves to April.".to_string(),
	}
}

#[tokio::test]
async fn create_then_get_returns_the_same_meeting() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let fetched = service.get_meeting(created.meeting_id).await.expect("Failed to get meeting.");

	assert_eq!(fetched.project_name, "Apollo");
	assert_eq!(fetched.meeting_date, date!(2026 - 03 - 02));
	assert_eq!(fetched.agenda_items.len(), 3);
	assert_eq!(fetched.attendees.len(), 3);
	assert_eq!(fetched.action_items.len(), 2);
	assert_eq!(
		fetched.agenda_items.iter().map(|agenda| agenda.item.as_str()).collect::<Vec<_>>(),
		vec!["Budget", "Timeline", "Risks"]
	);
	assert_eq!(fetched.action_items[1].status, ActionStatus::InProgress);

	let listed = service
		.list_meetings(MeetingListQuery { project: Some("Apollo".to_string()), ..Default::default() })
		.await
		.expect("Failed to list meetings.");

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].meeting_id, created.meeting_id);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn invalid_status_is_reported_with_its_path() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let mut input = sample_input();

	input.action_items[0].status = Some("Done-ish".to_string());

	let err = service.create_meeting(input).await.expect_err("Expected a validation error.");

	match err {
		Error::InvalidRequest { fields, .. } => {
			assert_eq!(fields, vec!["$.action_items[0].status".to_string()]);
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	let listed =
		service.list_meetings(MeetingListQuery::default()).await.expect("Failed to list meetings.");

	assert!(listed.is_empty());

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn update_keeps_action_item_identity_and_completion_time() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let first_id = created.action_items[0].action_item_id;
	let completed = service
		.update_action_item(
			first_id,
			ActionItemPatch { status: Some("Completed".to_string()), ..Default::default() },
		)
		.await
		.expect("Failed to complete action item.");
	let completed_at = completed.completed_at.expect("Expected a completion time.");
	let mut input = sample_input();

	input.purpose = "Launch readiness review, round two".to_string();
	input.action_items[0].action_item_id = Some(first_id);
	input.action_items[0].status = Some("Completed".to_string());
	input.action_items.truncate(1);

	let updated =
		service.update_meeting(created.meeting_id, input).await.expect("Failed to update meeting.");

	assert_eq!(updated.purpose, "Launch readiness review, round two");
	assert_eq!(updated.action_items.len(), 1);
	assert_eq!(updated.action_items[0].action_item_id, first_id);
	assert_eq!(updated.action_items[0].completed_at, Some(completed_at));
	assert_eq!(updated.created_at, created.created_at);

	let versions =
		service.list_versions(created.meeting_id).await.expect("Failed to list versions.");

	assert_eq!(
		versions.iter().map(|version| version.version_number).collect::<Vec<_>>(),
		vec![3, 2, 1]
	);
	assert_eq!(versions[2].change_summary, "Created.");

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn reopening_an_item_clears_its_completion_time() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let item_id = created.action_items[0].action_item_id;

	service
		.update_action_item(
			item_id,
			ActionItemPatch { status: Some("Completed".to_string()), ..Default::default() },
		)
		.await
		.expect("Failed to complete action item.");

	let reopened = service
		.update_action_item(
			item_id,
			ActionItemPatch { status: Some("Pending".to_string()), ..Default::default() },
		)
		.await
		.expect("Failed to reopen action item.");

	assert_eq!(reopened.status, ActionStatus::Pending);
	assert!(reopened.completed_at.is_none());

	let err = service
		.update_action_item(item_id, ActionItemPatch::default())
		.await
		.expect_err("Expected an empty patch to be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn overdue_filter_only_returns_open_past_due_items() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let mut input = sample_input();

	input.action_items = vec![
		ActionItemInput {
			due_date: Some("2020-01-01".to_string()),
			..action_item("Late and open", "Ann", "Pending")
		},
		ActionItemInput {
			due_date: Some("2020-01-01".to_string()),
			..action_item("Late but done", "Ann", "Completed")
		},
		ActionItemInput {
			due_date: Some("2999-01-01".to_string()),
			..action_item("Far future", "Bo", "Pending")
		},
	];

	service.create_meeting(input).await.expect("Failed to create meeting.");

	let overdue = service
		.list_action_items(ActionItemQuery { overdue_only: true, ..Default::default() })
		.await
		.expect("Failed to list action items.");

	assert_eq!(overdue.len(), 1);
	assert_eq!(overdue[0].description, "Late and open");
	assert!(overdue[0].is_overdue);

	let by_owner = service
		.list_action_items(ActionItemQuery { owner: Some("Bo".to_string()), ..Default::default() })
		.await
		.expect("Failed to list action items.");

	assert_eq!(by_owner.len(), 1);
	assert!(!by_owner[0].is_overdue);

	let err = service
		.list_action_items(ActionItemQuery { status: Some("Later".to_string()), ..Default::default() })
		.await
		.expect_err("Expected an unknown status filter to be rejected.");

	assert!(matches!(err, Error::InvalidRequest { fields, .. } if fields == vec!["$.status"]));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn dependency_cycles_are_rejected() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let first = Uuid::new_v4();
	let second = Uuid::new_v4();
	let mut input = sample_input();

	input.action_items[0].action_item_id = Some(first);
	input.action_items[0].depends_on = vec![second];
	input.action_items[1].action_item_id = Some(second);
	input.action_items[1].depends_on = vec![first];

	let err = service.create_meeting(input.clone()).await.expect_err("Expected a cycle error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	input.action_items[1].depends_on.clear();

	let created = service.create_meeting(input).await.expect("Failed to create meeting.");

	assert_eq!(created.action_items[0].depends_on, vec![second]);
	assert!(created.action_items[1].depends_on.is_empty());

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn reorder_moves_one_entry_and_rejects_out_of_range() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let reordered = service
		.reorder(created.meeting_id, ReorderRequest { list: ReorderList::AgendaItems, from: 2, to: 0 })
		.await
		.expect("Failed to reorder agenda.");

	assert_eq!(
		reordered.agenda_items.iter().map(|agenda| agenda.item.as_str()).collect::<Vec<_>>(),
		vec!["Risks", "Budget", "Timeline"]
	);

	let err = service
		.reorder(created.meeting_id, ReorderRequest { list: ReorderList::Attendees, from: 0, to: 3 })
		.await
		.expect_err("Expected an out-of-range move to fail.");

	assert!(matches!(err, Error::InvalidRequest { fields, .. } if fields == vec!["$.to"]));

	let fetched = service.get_meeting(created.meeting_id).await.expect("Failed to get meeting.");

	assert_eq!(
		fetched.attendees.iter().map(|attendee| attendee.name.as_str()).collect::<Vec<_>>(),
		vec!["Ann", "Bo", "Cy"]
	);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn export_is_stable_and_imports_back() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let first = service.export_docx(created.meeting_id).await.expect("Failed to export.");
	let second = service.export_docx(created.meeting_id).await.expect("Failed to export.");

	assert_eq!(first.bytes, second.bytes);
	assert_eq!(first.etag, second.etag);
	assert_eq!(first.file_name, "meeting_minutes_Apollo_2026-03-02.docx");

	let draft = service.import_docx(&first.bytes).expect("Failed to import.");

	assert_eq!(draft.project_name, "Apollo");
	assert_eq!(draft.meeting_date, Some(date!(2026 - 03 - 02)));
	assert_eq!(draft.agenda_items.len(), 3);
	assert_eq!(draft.attendees.len(), 3);
	assert!(!draft.attendees[1].attended);
	assert_eq!(draft.action_items.len(), 2);
	assert_eq!(draft.action_items[1].status, ActionStatus::InProgress);

	let err = service.import_docx(b"not a document").expect_err("Expected a rejected import.");

	assert!(matches!(err, Error::InvalidRequest { fields, .. } if fields == vec!["$.file"]));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn failover_uses_the_next_provider_and_counts_both() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let llm = ScriptedLlm::new(
		&["primary"],
		r#"Here you go: {"project_name": "Apollo", "meeting_date": "2026-03-02",
		"agenda_items": [{"item": "Budget"}], "action_items": [{"task": "Ship it",
		"assignee": "Ann", "status": "done"}]}"#,
	);
	let calls = llm.calls.clone();
	let service = build_service(&test_db, llm).await;
	let draft = service
		.ai_generate(AiGenerateRequest {
			meeting_notes: "Budget is fine. Ann ships it.".to_string(),
			..Default::default()
		})
		.await
		.expect("Failed to generate draft.");

	assert_eq!(draft.project_name, "Apollo");
	assert_eq!(draft.action_items[0].owner, "Ann");
	assert_eq!(draft.action_items[0].status, ActionStatus::Completed);
	assert_eq!(
		*calls.lock().expect("Failed to lock call log."),
		vec!["primary".to_string(), "secondary".to_string()]
	);

	let stats = service.ai_stats();
	let primary = stats.iter().find(|entry| entry.provider_id == "primary").expect("primary stats");
	let secondary =
		stats.iter().find(|entry| entry.provider_id == "secondary").expect("secondary stats");

	assert_eq!((primary.requests, primary.errors, primary.successes), (1, 1, 0));
	assert!(primary.last_error.is_some());
	assert_eq!((secondary.requests, secondary.errors, secondary.successes), (1, 0, 1));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn exhausted_chain_reports_the_last_provider() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&["primary", "secondary"], "")).await;
	let err = service
		.extract_action_items("Ann sends the deck by Friday.")
		.await
		.expect_err("Expected every provider to fail.");

	match err {
		Error::Provider { message } => assert!(message.contains("secondary"), "{message}"),
		other => panic!("Unexpected error: {other:?}"),
	}

	let err = service.extract_action_items("   ").await.expect_err("Expected blank text to fail.");

	assert!(matches!(err, Error::InvalidRequest { fields, .. } if fields == vec!["$.text"]));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn keyword_classification_marks_one_primary_and_links_tasks() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let apollo = service
		.register_project(ProjectRequest {
			name: "Apollo".to_string(),
			description: String::new(),
			keywords: vec!["Launch".to_string(), "apollo".to_string(), "launch".to_string()],
		})
		.await
		.expect("Failed to register project.");

	assert_eq!(apollo.keywords, vec!["launch".to_string(), "apollo".to_string()]);

	service
		.register_project(ProjectRequest {
			name: "Gemini".to_string(),
			description: String::new(),
			keywords: vec!["payroll".to_string(), "budget".to_string()],
		})
		.await
		.expect("Failed to register project.");

	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let response = service
		.classify_meeting(created.meeting_id, ClassifyRequest::default())
		.await
		.expect("Failed to classify meeting.");

	assert_eq!(response.method, "keyword");
	assert_eq!(response.primary_project_id, Some(apollo.project_id));
	assert_eq!(response.matches.iter().filter(|found| found.is_primary).count(), 1);
	assert!(
		response.matches.iter().all(|found| (0.0..=1.0).contains(&found.confidence)),
		"{:?}",
		response.matches
	);
	assert_eq!(response.tasks_linked, 2);

	let fetched = service.get_meeting(created.meeting_id).await.expect("Failed to get meeting.");

	assert!(fetched.action_items.iter().all(|item| item.project_id == Some(apollo.project_id)));
	assert!(fetched.updated_at > created.updated_at);

	let versions =
		service.list_versions(created.meeting_id).await.expect("Failed to list versions.");

	assert_eq!(versions.len(), 2);
	assert_eq!(versions[0].version_number, 2);
	assert_eq!(versions[0].change_summary, "Classified by keyword.");

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn model_classification_falls_back_to_keywords_on_bad_answers() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "I think it is Apollo.")).await;

	service
		.register_project(ProjectRequest {
			name: "Apollo".to_string(),
			description: String::new(),
			keywords: vec!["launch".to_string()],
		})
		.await
		.expect("Failed to register project.");

	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let response = service
		.classify_meeting(created.meeting_id, ClassifyRequest { use_ai: true })
		.await
		.expect("Failed to classify meeting.");

	assert_eq!(response.method, "keyword");
	assert_eq!(response.matches.len(), 1);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn model_classification_uses_known_projects_only() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let setup = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let apollo = setup
		.register_project(ProjectRequest {
			name: "Apollo".to_string(),
			description: "Moon launch".to_string(),
			keywords: Vec::new(),
		})
		.await
		.expect("Failed to register project.");

	assert!(!apollo.keywords.is_empty());

	let reply = format!(
		r#"[{{"project_id": "{}", "confidence": 1.7, "keywords_matched": ["launch"],
		"reasoning": "Launch review."}}, {{"project_id": "{}", "confidence": 0.9}}]"#,
		apollo.project_id,
		Uuid::new_v4()
	);
	let service = build_service(&test_db, ScriptedLlm::new(&[], reply)).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let response = service
		.classify_meeting(created.meeting_id, ClassifyRequest { use_ai: true })
		.await
		.expect("Failed to classify meeting.");

	assert_eq!(response.method, "model");
	assert_eq!(response.matches.len(), 1);
	assert_eq!(response.matches[0].confidence, 1.0);
	assert!(response.matches[0].is_primary);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn duplicate_project_names_conflict() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let request = ProjectRequest {
		name: "Apollo".to_string(),
		description: String::new(),
		keywords: vec!["launch".to_string()],
	};
	let project =
		service.register_project(request.clone()).await.expect("Failed to register project.");
	let err = service.register_project(request).await.expect_err("Expected a conflict.");

	assert!(matches!(err, Error::Conflict { .. }));

	service.delete_project(project.project_id).await.expect("Failed to delete project.");

	let err = service
		.delete_project(project.project_id)
		.await
		.expect_err("Expected the second delete to miss.");

	assert!(matches!(err, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn summarize_stores_the_summary_and_a_version() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service =
		build_service(&test_db, ScriptedLlm::new(&[], "  The launch moves to April.  ")).await;
	let created = service.create_meeting(sample_input()).await.expect("Failed to create meeting.");
	let summarized =
		service.summarize_meeting(created.meeting_id).await.expect("Failed to summarize.");

	assert_eq!(summarized.summary.as_deref(), Some("The launch moves to April."));

	let versions =
		service.list_versions(created.meeting_id).await.expect("Failed to list versions.");

	assert_eq!(versions[0].change_summary, "Summarized.");
	assert_eq!(versions[0].snapshot["summary"], "The launch moves to April.");

	service.delete_meeting(created.meeting_id).await.expect("Failed to delete meeting.");

	let err = service.get_meeting(created.meeting_id).await.expect_err("Expected a miss.");

	assert!(matches!(err, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn screenshots_are_stored_and_sent_as_images() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let llm = ScriptedLlm::new(&[], r#"{"project_name": "Whiteboard", "agenda": ["Budget"]}"#);
	let images = llm.images.clone();
	let service = build_service(&test_db, llm).await;
	let err = service
		.upload_screenshot(ScreenshotUpload {
			file_name: "notes.txt".to_string(),
			content_type: "text/plain".to_string(),
			bytes: b"hello".to_vec(),
		})
		.await
		.expect_err("Expected a non-image upload to fail.");

	assert!(matches!(err, Error::InvalidRequest { fields, .. } if fields == vec!["$.file"]));

	let stored = service
		.upload_screenshot(ScreenshotUpload {
			file_name: "../board.png".to_string(),
			content_type: "image/png".to_string(),
			bytes: vec![0x89, b'P', b'N', b'G'],
		})
		.await
		.expect("Failed to upload screenshot.");

	assert_eq!(stored.original_name, "board.png");
	assert_eq!(stored.size_bytes, 4);

	let draft = service
		.analyze_screenshot(AnalyzeScreenshotRequest {
			screenshot_id: stored.screenshot_id,
			context: Some("Planning board".to_string()),
		})
		.await
		.expect("Failed to analyze screenshot.");

	assert_eq!(draft.project_name, "Whiteboard");
	assert_eq!(draft.agenda_items[0].item, "Budget");
	assert_eq!(images.load(Ordering::SeqCst), 1);

	let err = service
		.ai_generate(AiGenerateRequest {
			screenshot_ids: vec![Uuid::new_v4()],
			..Default::default()
		})
		.await
		.expect_err("Expected an unknown screenshot to fail.");

	assert!(matches!(err, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn speakers_are_identified_from_a_screenshot() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let llm = ScriptedLlm::new(
		&["primary"],
		r#"Visible tiles: {"speakers": ["Ann Lee", {"name": "Bo"}, "ann lee"]}"#,
	);
	let images = llm.images.clone();
	let calls = llm.calls.clone();
	let service = build_service(&test_db, llm).await;
	let stored = service
		.upload_screenshot(ScreenshotUpload {
			file_name: "call.png".to_string(),
			content_type: "image/png".to_string(),
			bytes: vec![0x89, b'P', b'N', b'G'],
		})
		.await
		.expect("Failed to upload screenshot.");
	let found = service
		.identify_speakers(IdentifySpeakersRequest { screenshot_id: stored.screenshot_id })
		.await
		.expect("Failed to identify speakers.");

	assert_eq!(found.screenshot_id, stored.screenshot_id);
	assert_eq!(found.speakers, vec!["Ann Lee".to_string(), "Bo".to_string()]);
	assert!(found.attendees.iter().all(|attendee| attendee.attended));
	assert_eq!(images.load(Ordering::SeqCst), 2);
	assert_eq!(
		*calls.lock().expect("Failed to lock call log."),
		vec!["primary".to_string(), "secondary".to_string()]
	);

	let err = service
		.identify_speakers(IdentifySpeakersRequest { screenshot_id: Uuid::new_v4() })
		.await
		.expect_err("Expected an unknown screenshot to fail.");

	assert!(matches!(err, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn failed_screenshot_insert_leaves_no_file_behind() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;

	sqlx::query("DROP TABLE screenshots")
		.execute(&service.db.pool)
		.await
		.expect("Failed to drop screenshots table.");

	let err = service
		.upload_screenshot(ScreenshotUpload {
			file_name: "board.png".to_string(),
			content_type: "image/png".to_string(),
			bytes: vec![0x89, b'P', b'N', b'G'],
		})
		.await
		.expect_err("Expected the insert to fail.");

	assert!(matches!(err, Error::Storage { .. }));

	let leftover = std::fs::read_dir(test_db.uploads_dir())
		.expect("Failed to read uploads directory.")
		.count();

	assert_eq!(leftover, 0);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
async fn transcription_counts_words_and_rejects_empty_audio() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let service = build_service(&test_db, ScriptedLlm::new(&[], "")).await;
	let response = service
		.transcribe(AudioUpload {
			file_name: "standup.m4a".to_string(),
			content_type: "audio/mp4".to_string(),
			bytes: vec![0; 16],
		})
		.await
		.expect("Failed to transcribe.");

	assert_eq!(response.provider_id, "whisper");
	assert_eq!(response.text, "we reviewed 16 bytes of audio");
	assert_eq!(response.word_count, 6);

	let err = service
		.transcribe(AudioUpload {
			file_name: "empty.m4a".to_string(),
			content_type: "audio/mp4".to_string(),
			bytes: Vec::new(),
		})
		.await
		.expect_err("Expected empty audio to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let whisper = service
		.ai_stats()
		.into_iter()
		.find(|entry| entry.provider_id == "whisper")
		.expect("whisper stats");

	assert_eq!((whisper.requests, whisper.successes), (1, 1));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
