use anyhow::Result;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use super::{StageContext, StageReport};
use crate::browser::{Browser, Page};
use crate::records::{Columns, DatasetRecord, SubtaskRecord};
use crate::table;

/// How a single subtask page ended. Only `Emitted` produces records; the rest
/// are normal terminal states, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskOutcome {
    Emitted(usize),
    NavigationFailed,
    NoBenchmarkSection,
    NoLeaderboardData,
    NoPreviewTable,
}

/// Stage 4: leaderboard preview rows of every subtask. Subtasks without
/// leaderboards are common and always skipped, whatever the failure policy.
pub async fn collect<B: Browser>(
    browser: &mut B,
    ctx: &StageContext,
    subtasks: &[SubtaskRecord],
) -> Result<(Vec<DatasetRecord>, StageReport)> {
    let mut report = StageReport::new("datasets");
    let mut datasets = Vec::new();
    let pb = ctx.progress_bar(report.stage, subtasks.len());

    for subtask in subtasks {
        report.visited += 1;
        pb.inc(1);

        match visit(browser, ctx, subtask, &pb, &mut datasets).await {
            SubtaskOutcome::Emitted(n) => debug!("{}: {} datasets", subtask.subtask, n),
            other => {
                debug!("{}: {:?}", subtask.subtask_url, other);
                report.skipped += 1;
            }
        }
    }

    pb.finish_and_clear();
    report.emitted = datasets.len();
    info!(
        "Collected {} datasets from {} subtasks ({} without leaderboard)",
        datasets.len(),
        subtasks.len(),
        report.skipped
    );
    Ok((datasets, report))
}

async fn visit<B: Browser>(
    browser: &mut B,
    ctx: &StageContext,
    subtask: &SubtaskRecord,
    pb: &ProgressBar,
    out: &mut Vec<DatasetRecord>,
) -> SubtaskOutcome {
    if let Err(e) = browser.navigate(&subtask.subtask_url).await {
        pb.suspend(|| {
            if e.is_timeout() {
                warn!("Timeout occurred while accessing {}", subtask.subtask_url);
            } else {
                warn!("Failed to load {}: {}", subtask.subtask_url, e);
            }
        });
        return SubtaskOutcome::NavigationFailed;
    }

    let page = match browser.wait_for(&ctx.locators.benchmarks_section, ctx.wait).await {
        Ok(page) => page,
        Err(_) => return SubtaskOutcome::NoBenchmarkSection,
    };

    let (outcome, records) = parse(&page, ctx, subtask);
    out.extend(records);
    outcome
}

pub fn parse(page: &Page, ctx: &StageContext, subtask: &SubtaskRecord) -> (SubtaskOutcome, Vec<DatasetRecord>) {
    let loc = &ctx.locators;
    if page.contains(&loc.no_data) {
        return (SubtaskOutcome::NoLeaderboardData, Vec::new());
    }
    let Some(preview) = page.first(&loc.preview_table) else {
        return (SubtaskOutcome::NoPreviewTable, Vec::new());
    };

    let headers = table::headers(preview);
    let mut records = Vec::new();
    for row in table::body_rows(preview) {
        let Some(benchmark_url) = table::first_cell_link(row).and_then(|a| page.href(a)) else {
            debug!("Preview row without benchmark link on {}", page.url());
            continue;
        };
        let columns = Columns::zip(&headers, table::cell_texts(row));
        records.push(DatasetRecord::under(subtask, benchmark_url, columns));
    }
    (SubtaskOutcome::Emitted(records.len()), records)
}
