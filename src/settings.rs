use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const ROOT_URL: &str = "https://paperswithcode.com/sota";
const DEFAULT_CONFIG_FILE: &str = "crawler";

/// What a stage does when a page fails to load or lacks its required element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the URL and continue with the next item.
    Skip,
    /// Stop the run.
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub root_url: String,
    pub out_dir: PathBuf,
    pub wait_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub user_agent: String,
    pub on_page_failure: FailurePolicy,
    pub selectors: Selectors,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root_url: ROOT_URL.to_string(),
            out_dir: PathBuf::from("data"),
            wait_timeout_secs: 10,
            page_load_timeout_secs: 30,
            poll_interval_ms: 500,
            user_agent: format!("sota_crawler/{}", env!("CARGO_PKG_VERSION")),
            on_page_failure: FailurePolicy::Skip,
            selectors: Selectors::default(),
        }
    }
}

impl Settings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// CSS selectors for the source site's markup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub area_title: String,
    pub link: String,
    pub task_container: String,
    pub task_title: String,
    pub task_link_group: String,
    pub subtask_card: String,
    pub subtask_title: String,
    pub benchmarks_section: String,
    pub no_data: String,
    pub preview_table: String,
    pub benchmark_table: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Selectors {
            area_title: ".task-group-title".into(),
            link: "a".into(),
            task_container: "div.container.content-buffer".into(),
            task_title: "div.col-md-12 h2".into(),
            task_link_group: "div.sota-all-tasks".into(),
            subtask_card: ".card".into(),
            subtask_title: "div.card-body h1".into(),
            benchmarks_section: "#benchmarks".into(),
            no_data: "div.sota-no-sota".into(),
            preview_table: "div.sota-table-preview.table-responsive table".into(),
            benchmark_table: "table.table-stripped.show-overflow-x".into(),
        }
    }
}

/// Defaults, then `crawler.toml` (or `path`), then `SOTA_*` environment variables.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("SOTA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<Settings>()
        .context("Invalid configuration")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_source_site() {
        let s = Settings::default();
        assert_eq!(s.root_url, ROOT_URL);
        assert_eq!(s.wait_timeout(), Duration::from_secs(10));
        assert_eq!(s.on_page_failure, FailurePolicy::Skip);
        assert_eq!(s.selectors.no_data, "div.sota-no-sota");
    }

    #[test]
    fn file_overrides_merge_with_defaults() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            f,
            "wait_timeout_secs = 3\non_page_failure = \"abort\"\n[selectors]\nno_data = \"div.empty\""
        )
        .unwrap();

        let s = load(Some(f.path())).unwrap();
        assert_eq!(s.wait_timeout_secs, 3);
        assert_eq!(s.on_page_failure, FailurePolicy::Abort);
        assert_eq!(s.selectors.no_data, "div.empty");
        assert_eq!(s.selectors.area_title, ".task-group-title");
        assert_eq!(s.page_load_timeout_secs, 30);
    }
}
