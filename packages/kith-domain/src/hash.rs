/// Digest of the text a profile embedding was generated from. Two equal
/// hashes mean re-embedding can be skipped.
pub fn content_hash(source_text: &str) -> String {
	blake3::hash(source_text.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_is_stable_and_text_sensitive() {
		let a = content_hash("alice | hiking, jazz");
		let b = content_hash("alice | hiking, jazz");
		let c = content_hash("alice | hiking, jazz, chess");

		assert_eq!(a, b);
		assert_ne!(a, c);
	}
}
