pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_reindex_jobs.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_reindex_jobs.sql")),
				"tables/002_reindex_job_items.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_reindex_job_items.sql")),
				"tables/003_search_query_log.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_search_query_log.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_expands_every_include() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS reindex_jobs"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS reindex_job_items"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS search_query_log"));
	}
}
