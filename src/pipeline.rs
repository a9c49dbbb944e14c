use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::browser::Browser;
use crate::export;
use crate::stages::{areas, benchmarks, datasets, subtasks, tasks, StageContext, StageReport};

/// What a completed crawl produced.
#[derive(Debug)]
pub struct CrawlSummary {
    pub reports: Vec<StageReport>,
    pub files: Vec<PathBuf>,
}

/// One crawl run. Owns the browser session for its whole lifetime.
pub struct Pipeline<B: Browser> {
    browser: B,
    ctx: StageContext,
    root_url: String,
    out_dir: PathBuf,
    area_limit: Option<usize>,
}

impl<B: Browser> Pipeline<B> {
    pub fn new(browser: B, ctx: StageContext, root_url: String, out_dir: PathBuf) -> Self {
        Pipeline {
            browser,
            ctx,
            root_url,
            out_dir,
            area_limit: None,
        }
    }

    pub fn with_area_limit(mut self, limit: Option<usize>) -> Self {
        self.area_limit = limit;
        self
    }

    /// Run all five stages, then close the browser whether or not they succeeded.
    pub async fn run(self) -> Result<CrawlSummary> {
        let Pipeline {
            mut browser,
            ctx,
            root_url,
            out_dir,
            area_limit,
        } = self;

        let mut run = Run {
            ctx: &ctx,
            out_dir: &out_dir,
            summary: CrawlSummary {
                reports: Vec::new(),
                files: Vec::new(),
            },
        };
        let crawled = run.crawl(&mut browser, &root_url, area_limit).await;
        let summary = run.summary;

        let closed = browser.close().await;
        match (crawled, closed) {
            (Ok(()), Ok(())) => Ok(summary),
            (Ok(()), Err(e)) => Err(e).context("Failed to close browser session"),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close browser session after abort: {}", close_err);
                }
                if !summary.files.is_empty() {
                    warn!("Crawl aborted; {} completed table(s) remain in {}", summary.files.len(), out_dir.display());
                }
                Err(e)
            }
        }
    }
}

struct Run<'a> {
    ctx: &'a StageContext,
    out_dir: &'a Path,
    summary: CrawlSummary,
}

impl Run<'_> {
    async fn crawl<B: Browser>(&mut self, browser: &mut B, root_url: &str, area_limit: Option<usize>) -> Result<()> {
        let (mut areas, mut report) = areas::collect(browser, self.ctx, root_url).await?;
        if let Some(n) = area_limit {
            if areas.len() > n {
                info!("Limiting crawl to the first {} of {} areas", n, areas.len());
                areas.truncate(n);
                report.emitted = areas.len();
            }
        }
        self.flush(&areas, report)?;

        let (tasks, report) = tasks::collect(browser, self.ctx, &areas).await?;
        self.flush(&tasks, report)?;

        let (subtasks, report) = subtasks::collect(browser, self.ctx, &tasks).await?;
        self.flush(&subtasks, report)?;

        let (datasets, report) = datasets::collect(browser, self.ctx, &subtasks).await?;
        self.flush(&datasets, report)?;

        let (benchmarks, report) = benchmarks::collect(browser, self.ctx, &datasets).await?;
        self.flush(&benchmarks, report)?;

        Ok(())
    }

    /// Persist a finished stage right away so a later abort keeps it.
    fn flush<R: crate::records::Row>(&mut self, records: &[R], report: StageReport) -> Result<()> {
        let path = export::write_table(self.out_dir, records)?;
        info!("{}", report);
        self.summary.reports.push(report);
        self.summary.files.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::Ordering;

    use crate::browser::fixture::StaticBrowser;
    use crate::settings::FailurePolicy;
    use crate::stages::testing::ctx;

    const ROOT: &str = "https://paperswithcode.com/sota";

    /// Methodology → Clustering (two links) → one subtask each → one preview
    /// table with two rows → two benchmark pages, one of them without a table.
    fn methodology_site() -> StaticBrowser {
        StaticBrowser::new()
            .fixture(ROOT, "scenario_root")
            .fixture("https://paperswithcode.com/area/methodology", "scenario_area")
            .fixture("https://paperswithcode.com/task/clustering", "scenario_task_clustering")
            .fixture("https://paperswithcode.com/task/graph-clustering", "scenario_task_graph_clustering")
            .fixture("https://paperswithcode.com/task/online-clustering", "scenario_subtask_online")
            .fixture("https://paperswithcode.com/task/community-detection", "subtask_no_data")
            .fixture("https://paperswithcode.com/sota/online-clustering-on-mnist", "scenario_benchmark_mnist")
            .page(
                "https://paperswithcode.com/sota/online-clustering-on-cifar-10",
                "<html><body><p>No results yet</p></body></html>",
            )
    }

    fn read(dir: &std::path::Path, table: &str) -> String {
        fs::read_to_string(dir.join(format!("{}.csv", table))).unwrap()
    }

    #[tokio::test]
    async fn sample_scenario_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let browser = methodology_site();
        let closes = browser.close_counter();

        let summary = Pipeline::new(browser, ctx(FailurePolicy::Skip), ROOT.into(), dir.path().into())
            .run()
            .await
            .unwrap();

        let emitted: Vec<usize> = summary.reports.iter().map(|r| r.emitted).collect();
        assert_eq!(emitted, vec![1, 2, 2, 2, 2]);
        assert_eq!(summary.files.len(), 5);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let datasets = read(dir.path(), "datasets");
        let lines: Vec<&str> = datasets.lines().collect();
        assert_eq!(lines[0], "Area,Task,Subtask,Benchmark_URL,Model,Score");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Methodology,Clustering,Online Clustering,https://paperswithcode.com/sota/online-clustering-on-mnist,"));
        assert!(lines[2].starts_with("Methodology,Clustering,Online Clustering,https://paperswithcode.com/sota/online-clustering-on-cifar-10,"));

        let benchmarks = read(dir.path(), "benchmarks");
        assert_eq!(benchmarks.lines().next(), Some("Area,Task,Subtask,Rank,Model,Accuracy"));
        assert_eq!(benchmarks.lines().count(), 3);
    }

    #[tokio::test]
    async fn rerun_is_byte_identical() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        for dir in [&first, &second] {
            Pipeline::new(methodology_site(), ctx(FailurePolicy::Skip), ROOT.into(), dir.path().into())
                .run()
                .await
                .unwrap();
        }
        for table in ["areas", "tasks", "subtasks", "datasets", "benchmarks"] {
            assert_eq!(read(first.path(), table), read(second.path(), table), "{table} differs");
        }
    }

    #[tokio::test]
    async fn abort_keeps_finished_tables_and_closes_browser() {
        let dir = tempfile::tempdir().unwrap();
        let browser = methodology_site();
        let closes = browser.close_counter();

        // Strict policy: the benchmark page without a table is fatal in stage 5.
        let err = Pipeline::new(browser, ctx(FailurePolicy::Abort), ROOT.into(), dir.path().into())
            .run()
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("online-clustering-on-cifar-10"));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        for table in ["areas", "tasks", "subtasks", "datasets"] {
            assert!(dir.path().join(format!("{table}.csv")).exists(), "{table} missing");
        }
        assert!(!dir.path().join("benchmarks.csv").exists());
    }

    #[tokio::test]
    async fn fatal_first_stage_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let browser = StaticBrowser::new();
        let closes = browser.close_counter();

        let result = Pipeline::new(browser, ctx(FailurePolicy::Skip), ROOT.into(), dir.path().into())
            .run()
            .await;
        assert!(result.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn area_limit_truncates_after_first_stage() {
        let dir = tempfile::tempdir().unwrap();
        let browser = StaticBrowser::new()
            .fixture(ROOT, "sota")
            .fixture("https://paperswithcode.com/area/computer-vision", "area_computer_vision");

        let summary = Pipeline::new(browser, ctx(FailurePolicy::Skip), ROOT.into(), dir.path().into())
            .with_area_limit(Some(1))
            .run()
            .await
            .unwrap();
        assert_eq!(summary.reports[0].emitted, 1);
        assert_eq!(read(dir.path(), "areas").lines().count(), 2);
        assert_eq!(summary.reports[1].visited, 1);
    }
}
