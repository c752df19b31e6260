use crate::text;

/// Similarity band thresholds for human-readable labels.
const HIGH_SIMILARITY: f32 = 0.8;
const MODERATE_SIMILARITY: f32 = 0.6;

/// Vocabulary that marks a query as asking about something visually
/// observable: activities, professions, and settings that show up in photos.
const VISUAL_KEYWORDS: &[&str] = &[
	"hiking", "climbing", "surfing", "skiing", "cycling", "running", "swimming", "yoga", "dancing",
	"cooking", "painting", "photography", "photographer", "artist", "musician", "chef", "dancer",
	"athlete", "beach", "mountain", "mountains", "ocean", "forest", "outdoors", "outdoor", "gym",
	"studio", "stage", "travel", "traveling", "concert", "festival",
];

/// Maximum characters of image-derived text quoted back as context.
const VISUAL_EXCERPT_CHARS: usize = 100;

/// Visual-context assessment for one search hit.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisualContext {
	pub visual_match: bool,
	pub excerpt: Option<String>,
}

/// Human-readable reasons a candidate matched. Always non-empty: literal
/// term hits first, then exactly one similarity-band label.
pub fn match_reasons(normalized_query: &str, source_text: &str, score: f32) -> Vec<String> {
	let lowered = source_text.to_lowercase();
	let mut reasons: Vec<String> = text::query_terms(normalized_query)
		.into_iter()
		.filter(|term| lowered.contains(*term))
		.map(|term| format!("Profile mentions '{term}'"))
		.collect();

	reasons.push(similarity_label(score).to_string());

	reasons
}

pub fn similarity_label(score: f32) -> &'static str {
	if score >= HIGH_SIMILARITY {
		"High similarity to your search"
	} else if score >= MODERATE_SIMILARITY {
		"Moderate similarity to your search"
	} else {
		"Related profile content"
	}
}

/// Whether the query uses visual-domain vocabulary.
pub fn query_is_visual(normalized_query: &str) -> bool {
	normalized_query.split_whitespace().any(|term| VISUAL_KEYWORDS.contains(&term))
}

/// Flag a hit as a visual match when the query is visual and the indexed
/// text carries an image-derived section; quote a short excerpt as context.
pub fn visual_context(normalized_query: &str, source_text: &str) -> VisualContext {
	if !query_is_visual(normalized_query) || !text::has_image_section(source_text) {
		return VisualContext::default();
	}

	VisualContext {
		visual_match: true,
		excerpt: text::image_excerpt(source_text, VISUAL_EXCERPT_CHARS),
	}
}
