use std::collections::HashMap;

/// Standard reciprocal-rank fusion dampening constant.
pub const RRF_K: f32 = 60.0;

/// A fused candidate with its combined score.
#[derive(Clone, Debug, PartialEq)]
pub struct FusedHit {
	pub id: String,
	pub score: f32,
}

/// Merge two ranked id lists with weighted reciprocal-rank fusion.
///
/// Each id scores `weight / (RRF_K + rank)` per list it appears in (ranks are
/// 1-based). Ties break on the id itself so a fixed input always yields a
/// fixed output order.
pub fn weighted_rrf(
	fulltext: &[String],
	vector: &[String],
	fulltext_weight: f32,
	vector_weight: f32,
	limit: usize,
) -> Vec<FusedHit> {
	let mut scores: HashMap<&str, f32> = HashMap::new();

	for (rank, id) in fulltext.iter().enumerate() {
		*scores.entry(id.as_str()).or_insert(0.0) +=
			fulltext_weight / (RRF_K + (rank + 1) as f32);
	}
	for (rank, id) in vector.iter().enumerate() {
		*scores.entry(id.as_str()).or_insert(0.0) += vector_weight / (RRF_K + (rank + 1) as f32);
	}

	let mut fused: Vec<FusedHit> =
		scores.into_iter().map(|(id, score)| FusedHit { id: id.to_string(), score }).collect();

	fused.sort_by(|a, b| {
		b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.id.cmp(&b.id))
	});
	fused.truncate(limit);

	fused
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(raw: &[&str]) -> Vec<String> {
		raw.iter().map(|id| id.to_string()).collect()
	}

	#[test]
	fn agreement_across_lists_outranks_single_list_presence() {
		let fused = weighted_rrf(&ids(&["a", "b"]), &ids(&["b", "c"]), 0.3, 0.7, 10);

		assert_eq!(fused[0].id, "b");
	}

	#[test]
	fn weights_bias_the_merge() {
		let fulltext = ids(&["a"]);
		let vector = ids(&["b"]);
		let vector_heavy = weighted_rrf(&fulltext, &vector, 0.3, 0.7, 10);
		let fulltext_heavy = weighted_rrf(&fulltext, &vector, 0.7, 0.3, 10);

		assert_eq!(vector_heavy[0].id, "b");
		assert_eq!(fulltext_heavy[0].id, "a");
	}

	#[test]
	fn repeated_fusion_is_deterministic() {
		let fulltext = ids(&["a", "b", "c"]);
		let vector = ids(&["c", "a", "d"]);
		let first = weighted_rrf(&fulltext, &vector, 0.3, 0.7, 10);
		let second = weighted_rrf(&fulltext, &vector, 0.3, 0.7, 10);

		assert_eq!(first, second);
	}

	#[test]
	fn respects_limit() {
		let fused = weighted_rrf(&ids(&["a", "b", "c"]), &ids(&["d", "e"]), 0.5, 0.5, 2);

		assert_eq!(fused.len(), 2);
	}

	#[test]
	fn equal_scores_tie_break_on_id() {
		let fused = weighted_rrf(&ids(&["b"]), &ids(&["a"]), 0.5, 0.5, 10);

		assert_eq!(fused[0].id, "a");
		assert_eq!(fused[1].id, "b");
	}
}
