use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The one live embedding record a user may have. The vector itself is
/// write-only: it is handed to the store beside this record on upsert and
/// never read back; change detection runs on `content_hash` alone.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserEmbedding {
	pub user_id: String,
	pub source_text: String,
	pub content_hash: String,
	pub provider: String,
	pub model: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}

impl UserEmbedding {
	pub fn is_expired(&self, now: OffsetDateTime) -> bool {
		self.expires_at <= now
	}
}

/// One scored row from any of the search paths.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchHit {
	pub user_id: String,
	pub score: f32,
	pub source_text: String,
}

/// Restriction on which users a read may touch. `ids: Some(vec![])` means
/// "match nobody", not "no filter"; callers short-circuit that case.
#[derive(Clone, Debug, Default)]
pub struct CandidateFilter {
	pub ids: Option<Vec<String>>,
	pub exclude: Option<String>,
}

impl CandidateFilter {
	pub fn unrestricted() -> Self {
		Self::default()
	}

	pub fn for_ids(ids: Vec<String>) -> Self {
		Self { ids: Some(ids), exclude: None }
	}
}

/// Relative weights for reciprocal-rank fusion of the two search paths.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct FusionWeights {
	pub fulltext: f32,
	pub vector: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Queued,
	InProgress,
	Completed,
	Failed,
}

impl JobStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Queued => "queued",
			Self::InProgress => "in_progress",
			Self::Completed => "completed",
			Self::Failed => "failed",
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}
}

impl FromStr for JobStatus {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"queued" => Ok(Self::Queued),
			"in_progress" => Ok(Self::InProgress),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			other => Err(format!("Unknown job status: {other}.")),
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
	Queued,
	Completed,
	Failed,
}

impl ItemStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Queued => "queued",
			Self::Completed => "completed",
			Self::Failed => "failed",
		}
	}
}

impl FromStr for ItemStatus {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"queued" => Ok(Self::Queued),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			other => Err(format!("Unknown item status: {other}.")),
		}
	}
}

/// One bulk (re)embedding request and its durable progress.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReindexJob {
	pub job_id: Uuid,
	pub force: bool,
	pub status: JobStatus,
	pub total: u32,
	pub processed: u32,
	pub failed: u32,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub started_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub completed_at: Option<OffsetDateTime>,
	pub error_message: Option<String>,
}

impl ReindexJob {
	/// A job is done when every item has been accounted for.
	pub fn is_done(&self) -> bool {
		self.processed + self.failed == self.total
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReindexJobItem {
	pub job_id: Uuid,
	pub user_id: String,
	pub status: ItemStatus,
	pub error_message: Option<String>,
}

/// One recorded vector-mode search, written off the request path.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QueryLogEntry {
	pub query: String,
	pub vector: Vec<f32>,
	pub result_count: u32,
	pub duration_ms: u64,
	pub results: Vec<QueryLogResult>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QueryLogResult {
	pub user_id: String,
	pub rank: u32,
	pub score: f32,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn job_status_round_trips() {
		for status in [JobStatus::Queued, JobStatus::InProgress, JobStatus::Completed, JobStatus::Failed]
		{
			assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
		}

		assert!("unknown".parse::<JobStatus>().is_err());
	}

	#[test]
	fn terminal_statuses() {
		assert!(JobStatus::Completed.is_terminal());
		assert!(JobStatus::Failed.is_terminal());
		assert!(!JobStatus::Queued.is_terminal());
		assert!(!JobStatus::InProgress.is_terminal());
	}
}
