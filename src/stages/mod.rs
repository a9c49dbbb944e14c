//! The five crawl stages. Each consumes the previous stage's records, in order,
//! and returns its own records plus a `StageReport`.

pub mod areas;
pub mod benchmarks;
pub mod datasets;
pub mod subtasks;
pub mod tasks;

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::browser::{BrowserError, Locator};
use crate::settings::{FailurePolicy, Selectors, Settings};

/// Compiled selectors for every stage.
#[derive(Debug, Clone)]
pub struct Locators {
    pub area_title: Locator,
    pub link: Locator,
    pub task_container: Locator,
    pub task_title: Locator,
    pub task_link_group: Locator,
    pub subtask_card: Locator,
    pub subtask_title: Locator,
    pub benchmarks_section: Locator,
    pub no_data: Locator,
    pub preview_table: Locator,
    pub benchmark_table: Locator,
}

impl Locators {
    pub fn compile(s: &Selectors) -> Result<Self, BrowserError> {
        Ok(Locators {
            area_title: Locator::parse(&s.area_title)?,
            link: Locator::parse(&s.link)?,
            task_container: Locator::parse(&s.task_container)?,
            task_title: Locator::parse(&s.task_title)?,
            task_link_group: Locator::parse(&s.task_link_group)?,
            subtask_card: Locator::parse(&s.subtask_card)?,
            subtask_title: Locator::parse(&s.subtask_title)?,
            benchmarks_section: Locator::parse(&s.benchmarks_section)?,
            no_data: Locator::parse(&s.no_data)?,
            preview_table: Locator::parse(&s.preview_table)?,
            benchmark_table: Locator::parse(&s.benchmark_table)?,
        })
    }
}

/// Everything a stage needs besides the browser and its input records.
pub struct StageContext {
    pub locators: Locators,
    pub wait: Duration,
    pub policy: FailurePolicy,
    pub progress: bool,
}

impl StageContext {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(StageContext {
            locators: Locators::compile(&settings.selectors)?,
            wait: settings.wait_timeout(),
            policy: settings.on_page_failure,
            progress: true,
        })
    }

    fn progress_bar(&self, stage: &str, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:>10} [{elapsed_precise}] {bar:40} {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_prefix(stage.to_string());
        pb
    }

    /// Apply the failure policy to a page that could not be loaded or lacked
    /// its required element.
    fn page_failed(&self, report: &mut StageReport, url: &str, err: BrowserError) -> Result<()> {
        match self.policy {
            FailurePolicy::Skip => {
                warn!("{}: skipping {}: {}", report.stage, url, err);
                report.skipped += 1;
                Ok(())
            }
            FailurePolicy::Abort => Err(anyhow!(err).context(format!("{} stage failed on {}", report.stage, url))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    /// Input items processed.
    pub visited: usize,
    /// Items that produced no records because of a failure or absent data.
    pub skipped: usize,
    /// Records produced.
    pub emitted: usize,
}

impl StageReport {
    fn new(stage: &'static str) -> Self {
        StageReport {
            stage,
            visited: 0,
            skipped: 0,
            emitted: 0,
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {:>6} visited {:>6} skipped {:>7} records",
            self.stage, self.visited, self.skipped, self.emitted
        )
    }
}
