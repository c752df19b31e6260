use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

/// Per-phase outcome counters for one indexing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseCounters {
	pub indexed: u64,
	pub skipped_unchanged: u64,
	pub removed_consent: u64,
	pub failed: u64,
}
impl PhaseCounters {
	pub fn absorb(&mut self, other: PhaseCounters) {
		self.indexed += other.indexed;
		self.skipped_unchanged += other.skipped_unchanged;
		self.removed_consent += other.removed_consent;
		self.failed += other.failed;
	}
}

#[derive(Clone, Debug, Default)]
pub struct IndexingStats {
	pub running: bool,
	pub cycles_completed: u64,
	pub last_run_at: Option<OffsetDateTime>,
	pub last_run_duration_ms: Option<u64>,
	pub next_run_at: Option<OffsetDateTime>,
	pub next_full_index_at: Option<OffsetDateTime>,
	pub last_available: PhaseCounters,
	pub last_unavailable: PhaseCounters,
	pub total_available: PhaseCounters,
	pub total_unavailable: PhaseCounters,
}

/// All stats mutations go through this handle; readers get a copy.
#[derive(Clone, Default)]
pub struct StatsHandle {
	inner: Arc<Mutex<IndexingStats>>,
}
impl StatsHandle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn snapshot(&self) -> IndexingStats {
		self.lock().clone()
	}

	pub fn update(&self, f: impl FnOnce(&mut IndexingStats)) {
		f(&mut self.lock());
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, IndexingStats> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_is_a_copy() {
		let handle = StatsHandle::new();

		handle.update(|stats| {
			stats.running = true;
			stats.last_available.indexed = 3;
		});

		let snapshot = handle.snapshot();

		handle.update(|stats| stats.last_available.indexed = 9);

		assert!(snapshot.running);
		assert_eq!(snapshot.last_available.indexed, 3);
		assert_eq!(handle.snapshot().last_available.indexed, 9);
	}

	#[test]
	fn counters_absorb() {
		let mut total = PhaseCounters { indexed: 1, ..Default::default() };

		total.absorb(PhaseCounters {
			indexed: 2,
			skipped_unchanged: 4,
			removed_consent: 1,
			failed: 3,
		});

		assert_eq!(total.indexed, 3);
		assert_eq!(total.skipped_unchanged, 4);
		assert_eq!(total.removed_consent, 1);
		assert_eq!(total.failed, 3);
	}
}
