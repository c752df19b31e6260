use kith_domain::{consent::ConsentErrorPolicy, fusion, hash, reasons, text};

#[test]
fn hash_skip_contract_holds_for_rebuilt_text() {
	let first = text::build_source_text(&["Alice", "Climber from Utah"], Some("rock wall"));
	let second = text::build_source_text(&["Alice", "Climber from Utah"], Some("rock wall"));

	assert_eq!(hash::content_hash(&first), hash::content_hash(&second));
}

#[test]
fn empty_query_seed_is_nonempty_and_normal() {
	assert!(!text::EMPTY_QUERY_SEED.is_empty());
	assert_eq!(text::normalize_query(text::EMPTY_QUERY_SEED), text::EMPTY_QUERY_SEED);
}

#[test]
fn fused_scores_decrease_with_rank() {
	let fulltext: Vec<String> = ["a", "b", "c"].iter().map(|id| id.to_string()).collect();
	let vector: Vec<String> = ["a", "b", "c"].iter().map(|id| id.to_string()).collect();
	let fused = fusion::weighted_rrf(&fulltext, &vector, 0.3, 0.7, 10);

	assert_eq!(fused.len(), 3);
	assert!(fused[0].score > fused[1].score);
	assert!(fused[1].score > fused[2].score);
}

#[test]
fn visual_flow_end_to_end() {
	let source = text::build_source_text(
		&["Maya", "Travel photographer based in Lisbon"],
		Some("sunset over a mountain ridge, camera in hand"),
	);
	let query = text::normalize_query("  Mountain  PHOTOGRAPHY  ");
	let context = reasons::visual_context(&query, &source);

	assert!(context.visual_match);
	assert!(context.excerpt.expect("Expected an excerpt.").contains("mountain ridge"));
}

#[test]
fn consent_policy_round_trips_through_serde() {
	let allow: ConsentErrorPolicy = serde_json::from_str("\"allow_on_error\"").unwrap();

	assert_eq!(allow, ConsentErrorPolicy::AllowOnError);
	assert_eq!(serde_json::to_string(&ConsentErrorPolicy::DenyOnError).unwrap(), "\"deny_on_error\"");
}
