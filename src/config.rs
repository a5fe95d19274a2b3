use std::path::PathBuf;

use anyhow::bail;

use crate::chunker::MalformedRowPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub scratch_dir: PathBuf,
    pub segments: usize,
    pub create_batch_size: usize,
    pub update_batch_size: usize,
    pub test_rows: u64,
    pub malformed_rows: MalformedRowPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://films.db?mode=rwc".to_string());

        let scratch_dir = var("IMPORT_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("var/temp"));

        let segments: usize =
            var("IMPORT_SEGMENTS").and_then(|s| s.parse().ok()).unwrap_or(256);

        let create_batch_size: usize =
            var("IMPORT_CREATE_BATCH").and_then(|s| s.parse().ok()).unwrap_or(1000);

        let update_batch_size: usize =
            var("IMPORT_UPDATE_BATCH").and_then(|s| s.parse().ok()).unwrap_or(100);

        let test_rows: u64 = var("IMPORT_TEST_ROWS").and_then(|s| s.parse().ok()).unwrap_or(1000);

        let malformed_rows = match var("IMPORT_MALFORMED_ROWS").as_deref().map(str::trim) {
            None | Some("") | Some("skip") => MalformedRowPolicy::Skip,
            Some("abort") => MalformedRowPolicy::Abort,
            Some(other) => bail!("IMPORT_MALFORMED_ROWS must be `skip` or `abort`, got {other:?}"),
        };

        Ok(Self {
            database_url,
            scratch_dir,
            segments: segments.max(1),
            create_batch_size: create_batch_size.max(1),
            update_batch_size: update_batch_size.max(1),
            test_rows: test_rows.max(1),
            malformed_rows,
        })
    }
}
