use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use time::Duration;

use kith_domain::consent::ConsentErrorPolicy;
use kith_indexer::{ProcessorConfig, RateLimiter, UserProcessor};
use kith_providers::Profile;
use kith_service::{ReindexTarget, SearchMode, SearchRequest, SearchScope, SearchService};
use kith_storage::{EmbeddingStore, ReindexStore, models::JobStatus};
use kith_testkit::{
	CountingEmbedder, MemoryEmbeddingStore, MemoryQueryLog, MemoryReindexStore,
	StaticConsentClient, StaticDirectoryClient, StaticProfileClient, StubImageAnalyzer,
};

const DIM: usize = 8;

struct Fixture {
	service: Arc<SearchService>,
	store: Arc<MemoryEmbeddingStore>,
	query_log: Arc<MemoryQueryLog>,
	embedder: Arc<CountingEmbedder>,
	jobs: Arc<MemoryReindexStore>,
}

fn profile(user_id: &str, bio: &str) -> Profile {
	Profile {
		user_id: user_id.to_string(),
		display_name: format!("User {user_id}"),
		bio: bio.to_string(),
		..Profile::default()
	}
}

fn fixture(profiles: Vec<Profile>, directory: StaticDirectoryClient) -> Fixture {
	let store = Arc::new(MemoryEmbeddingStore::new());
	let embedder = Arc::new(CountingEmbedder::new(DIM));
	let query_log = Arc::new(MemoryQueryLog::new());
	let jobs = Arc::new(MemoryReindexStore::new());
	let processor = Arc::new(UserProcessor {
		store: store.clone(),
		profiles: Arc::new(StaticProfileClient::with(profiles)),
		consent: Arc::new(StaticConsentClient::allowing_all()),
		embedder: embedder.clone(),
		images: Arc::new(StubImageAnalyzer::default()),
		limiter: Arc::new(RateLimiter::new(StdDuration::ZERO)),
		cfg: ProcessorConfig {
			consent_enforced: true,
			consent_timeout: StdDuration::from_millis(200),
			consent_on_error: ConsentErrorPolicy::AllowOnError,
			image_analysis_enabled: true,
			max_retries: 0,
			retry_base_delay: StdDuration::ZERO,
		},
	});
	let service = Arc::new(SearchService {
		cfg: kith_config::Search {
			default_limit: 10,
			fulltext_weight: 0.3,
			vector_weight: 0.7,
			query_log_enabled: true,
			purge_interval_seconds: 3_600,
		},
		store: store.clone(),
		directory: Arc::new(directory),
		embedder: embedder.clone(),
		query_log: query_log.clone(),
		jobs: jobs.clone(),
		processor,
		page_size: 100,
		refresh_ttl_seconds: 86_400,
	});

	Fixture { service, store, query_log, embedder, jobs }
}

async fn index_users(fixture: &Fixture, user_ids: &[&str]) {
	for user_id in user_ids {
		fixture
			.service
			.update_user_embedding(user_id)
			.await
			.unwrap_or_else(|err| panic!("Failed to index {user_id}: {err}"));
	}
}

fn request(query: &str, mode: SearchMode) -> SearchRequest {
	SearchRequest { query: query.to_string(), mode, ..SearchRequest::default() }
}

#[tokio::test]
async fn empty_vector_query_uses_the_seed_and_succeeds() {
	let fixture = fixture(
		vec![profile("a", "Trail runner."), profile("b", "Pastry chef.")],
		StaticDirectoryClient::default(),
	);

	index_users(&fixture, &["a", "b"]).await;

	let response = fixture.service.search(request("   ", SearchMode::Vector)).await.unwrap();

	assert_eq!(response.items.len(), 2);
	assert_eq!(response.total_candidates, 2);

	for item in &response.items {
		assert!(!item.match_reasons.is_empty());
	}
}

#[tokio::test]
async fn fulltext_mode_rejects_an_empty_query() {
	let fixture = fixture(vec![profile("a", "Reads a lot.")], StaticDirectoryClient::default());

	index_users(&fixture, &["a"]).await;

	assert!(fixture.service.search(request("", SearchMode::Fulltext)).await.is_err());
}

#[tokio::test]
async fn friends_scope_with_no_friends_returns_nothing() {
	let directory = StaticDirectoryClient {
		friends: HashMap::from([("loner".to_string(), Vec::new())]),
		..StaticDirectoryClient::default()
	};
	let fixture = fixture(vec![profile("a", "Popular."), profile("b", "Also popular.")], directory);

	index_users(&fixture, &["a", "b"]).await;

	let mut req = request("popular", SearchMode::Fulltext);

	req.scope = Some(SearchScope::Friends);
	req.caller_id = Some("loner".to_string());

	let response = fixture.service.search(req).await.unwrap();

	assert!(response.items.is_empty());
	assert_eq!(response.total_candidates, 0);
}

#[tokio::test]
async fn friends_scope_restricts_to_the_friend_list() {
	let directory = StaticDirectoryClient {
		friends: HashMap::from([("me".to_string(), vec!["a".to_string()])]),
		..StaticDirectoryClient::default()
	};
	let fixture = fixture(
		vec![profile("a", "Plays chess."), profile("b", "Plays chess too.")],
		directory,
	);

	index_users(&fixture, &["a", "b"]).await;

	let mut req = request("chess", SearchMode::Fulltext);

	req.scope = Some(SearchScope::Friends);
	req.caller_id = Some("me".to_string());

	let response = fixture.service.search(req).await.unwrap();

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].user_id, "a");
}

#[tokio::test]
async fn exclude_user_id_removes_the_caller_from_results() {
	let fixture = fixture(
		vec![profile("me", "Loves jazz."), profile("other", "Loves jazz too.")],
		StaticDirectoryClient::default(),
	);

	index_users(&fixture, &["me", "other"]).await;

	let mut req = request("jazz", SearchMode::Fulltext);

	req.exclude_user_id = Some("me".to_string());

	let response = fixture.service.search(req).await.unwrap();

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].user_id, "other");
}

#[tokio::test]
async fn hybrid_search_is_deterministic() {
	let fixture = fixture(
		vec![
			profile("a", "Jazz pianist and climber."),
			profile("b", "Jazz listener."),
			profile("c", "Classical violinist."),
		],
		StaticDirectoryClient::default(),
	);

	index_users(&fixture, &["a", "b", "c"]).await;

	let first = fixture.service.search(request("jazz", SearchMode::Hybrid)).await.unwrap();
	let second = fixture.service.search(request("jazz", SearchMode::Hybrid)).await.unwrap();
	let order = |response: &kith_service::SearchResponse| {
		response.items.iter().map(|item| item.user_id.clone()).collect::<Vec<_>>()
	};

	assert!(!first.items.is_empty());
	assert_eq!(order(&first), order(&second));
}

#[tokio::test]
async fn visual_context_flags_image_backed_hits() {
	let store = Arc::new(MemoryEmbeddingStore::new());
	let embedder = Arc::new(CountingEmbedder::new(DIM));
	let query_log = Arc::new(MemoryQueryLog::new());
	let jobs = Arc::new(MemoryReindexStore::new());
	let mut climber = profile("a", "Weekend alpinist.");

	climber.image_refs = vec!["img-1".to_string()];

	let processor = Arc::new(UserProcessor {
		store: store.clone(),
		profiles: Arc::new(StaticProfileClient::with([climber])),
		consent: Arc::new(StaticConsentClient::allowing_all()),
		embedder: embedder.clone(),
		images: Arc::new(StubImageAnalyzer::describing("climbing a granite wall")),
		limiter: Arc::new(RateLimiter::new(StdDuration::ZERO)),
		cfg: ProcessorConfig {
			consent_enforced: false,
			consent_timeout: StdDuration::from_millis(200),
			consent_on_error: ConsentErrorPolicy::AllowOnError,
			image_analysis_enabled: true,
			max_retries: 0,
			retry_base_delay: StdDuration::ZERO,
		},
	});
	let service = SearchService {
		cfg: kith_config::Search {
			default_limit: 10,
			fulltext_weight: 0.3,
			vector_weight: 0.7,
			query_log_enabled: false,
			purge_interval_seconds: 3_600,
		},
		store,
		directory: Arc::new(StaticDirectoryClient::default()),
		embedder,
		query_log,
		jobs,
		processor,
		page_size: 100,
		refresh_ttl_seconds: 86_400,
	};

	service.update_user_embedding("a").await.unwrap();

	let mut req = request("climbing partner", SearchMode::Fulltext);

	req.include_visual_context = true;

	let response = service.search(req).await.unwrap();
	let context = response.items[0].visual_context.as_ref().expect("context requested");

	assert!(context.visual_match);
	assert_eq!(context.excerpt.as_deref(), Some("climbing a granite wall"));
}

#[tokio::test]
async fn vector_mode_writes_a_detached_query_log_entry() {
	let fixture = fixture(vec![profile("a", "Gardener.")], StaticDirectoryClient::default());

	index_users(&fixture, &["a"]).await;

	let response = fixture.service.search(request("garden", SearchMode::Vector)).await.unwrap();

	assert_eq!(response.items.len(), 1);

	// The write is detached; give it a moment to land.
	let mut entries = fixture.query_log.entries();

	for _ in 0..50 {
		if !entries.is_empty() {
			break;
		}

		tokio::time::sleep(StdDuration::from_millis(10)).await;

		entries = fixture.query_log.entries();
	}

	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].query, "garden");
	assert_eq!(entries[0].result_count, 1);
	assert_eq!(entries[0].results[0].rank, 1);
}

#[tokio::test]
async fn hybrid_mode_never_logs_queries() {
	let fixture = fixture(vec![profile("a", "Gardener.")], StaticDirectoryClient::default());

	index_users(&fixture, &["a"]).await;
	fixture.service.search(request("garden", SearchMode::Hybrid)).await.unwrap();
	tokio::time::sleep(StdDuration::from_millis(50)).await;

	assert!(fixture.query_log.entries().is_empty());
}

#[tokio::test]
async fn purge_expired_sweeps_dead_records() {
	let fixture = fixture(vec![profile("a", "Short-lived.")], StaticDirectoryClient::default());

	index_users(&fixture, &["a"]).await;

	// Force the record into the past, then sweep.
	let record = fixture.store.get("a").await.unwrap().unwrap();
	let vector = fixture.store.stored_vector("a").unwrap();
	let mut expired = record;

	expired.expires_at = time::OffsetDateTime::now_utc() - Duration::hours(1);
	fixture.store.upsert(&expired, &vector).await.unwrap();

	assert_eq!(fixture.service.purge_expired().await.unwrap(), 1);
	assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn reindex_all_resolves_through_directory_pagination() {
	let directory = StaticDirectoryClient {
		all: (0..7).map(|i| format!("u{i}")).collect(),
		..StaticDirectoryClient::default()
	};
	let mut fixture = fixture(Vec::new(), directory);

	// Shrink the page size so the resolution actually pages.
	Arc::get_mut(&mut fixture.service).unwrap().page_size = 3;

	let job = fixture.service.create_reindex_job(ReindexTarget::All, false).await.unwrap();

	assert_eq!(job.total, 7);
	assert_eq!(job.status, JobStatus::Queued);
	assert_eq!(
		fixture.jobs.get_job(job.job_id).await.unwrap().unwrap().total,
		7,
	);
}

#[tokio::test]
async fn update_and_delete_round_trip() {
	let fixture = fixture(vec![profile("a", "Here today.")], StaticDirectoryClient::default());

	assert!(!fixture.service.has_embedding("a").await.unwrap());
	fixture.service.update_user_embedding("a").await.unwrap();
	assert!(fixture.service.has_embedding("a").await.unwrap());
	assert_eq!(fixture.embedder.call_count(), 1);

	fixture.service.delete_user_embedding("a").await.unwrap();
	assert!(!fixture.service.has_embedding("a").await.unwrap());
}
