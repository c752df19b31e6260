/// Marker separating profile text from the image-derived description inside
/// a record's `source_text`. Search keys on it for visual-context answers.
pub const IMAGE_SECTION_MARKER: &str = "[photos]";

/// Seed text substituted for an empty query on vector searches, so browsing
/// without a query still returns a ranked population sample.
pub const EMPTY_QUERY_SEED: &str = "discover people";

/// Minimum length for a query term to count as a literal match.
pub const MIN_MATCH_TERM_LEN: usize = 3;

/// Trim, lowercase, and collapse internal whitespace.
pub fn normalize_query(query: &str) -> String {
	query.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Query terms eligible for literal matching.
pub fn query_terms(normalized_query: &str) -> Vec<&str> {
	normalized_query.split_whitespace().filter(|term| term.len() >= MIN_MATCH_TERM_LEN).collect()
}

/// Concatenate the structured profile fields, then append the image-derived
/// description behind the marker so it stays detectable later.
pub fn build_source_text(fields: &[&str], image_description: Option<&str>) -> String {
	let mut out = fields
		.iter()
		.map(|field| field.trim())
		.filter(|field| !field.is_empty())
		.collect::<Vec<_>>()
		.join("\n");

	if let Some(description) = image_description.map(str::trim).filter(|text| !text.is_empty()) {
		if !out.is_empty() {
			out.push('\n');
		}

		out.push_str(IMAGE_SECTION_MARKER);
		out.push(' ');
		out.push_str(description);
	}

	out
}

/// Whether the indexed text carries an image-derived section.
pub fn has_image_section(source_text: &str) -> bool {
	source_text.contains(IMAGE_SECTION_MARKER)
}

/// The short excerpt following the image marker, capped to `max_chars`.
pub fn image_excerpt(source_text: &str, max_chars: usize) -> Option<String> {
	let start = source_text.find(IMAGE_SECTION_MARKER)? + IMAGE_SECTION_MARKER.len();
	let rest = source_text[start..].trim_start();

	if rest.is_empty() {
		return None;
	}

	let excerpt = match rest.char_indices().nth(max_chars) {
		Some((idx, _)) => format!("{}...", rest[..idx].trim_end()),
		None => rest.to_string(),
	};

	Some(excerpt)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_whitespace_and_case() {
		assert_eq!(normalize_query("  Rock   Climbing \n Partner "), "rock climbing partner");
		assert_eq!(normalize_query(""), "");
	}

	#[test]
	fn query_terms_drop_short_words() {
		let normalized = normalize_query("go to a jazz bar");

		assert_eq!(query_terms(&normalized), vec!["jazz", "bar"]);
	}

	#[test]
	fn source_text_skips_empty_fields_and_appends_marker() {
		let text = build_source_text(&["Alice", "", "  ", "Climber from Utah"], Some("rock wall"));

		assert_eq!(text, "Alice\nClimber from Utah\n[photos] rock wall");
		assert!(has_image_section(&text));
	}

	#[test]
	fn source_text_without_images_has_no_marker() {
		let text = build_source_text(&["Alice"], None);

		assert_eq!(text, "Alice");
		assert!(!has_image_section(&text));
	}

	#[test]
	fn image_excerpt_truncates() {
		let long = "x".repeat(140);
		let text = build_source_text(&["Alice"], Some(&long));
		let excerpt = image_excerpt(&text, 100).expect("Expected an excerpt.");

		assert_eq!(excerpt.len(), 103);
		assert!(excerpt.ends_with("..."));
	}

	#[test]
	fn image_excerpt_returns_short_text_whole() {
		let text = build_source_text(&[], Some("surfing at dawn"));

		assert_eq!(image_excerpt(&text, 100).as_deref(), Some("surfing at dawn"));
		assert_eq!(image_excerpt("no marker here", 100), None);
	}
}
