use anyhow::Result;
use tracing::{debug, info};

use super::{StageContext, StageReport};
use crate::browser::{first_in, text_of, Browser, Page};
use crate::records::{SubtaskRecord, TaskRecord};

/// Stage 3: one subtask record per card on each task page.
pub async fn collect<B: Browser>(
    browser: &mut B,
    ctx: &StageContext,
    tasks: &[TaskRecord],
) -> Result<(Vec<SubtaskRecord>, StageReport)> {
    let mut report = StageReport::new("subtasks");
    let mut subtasks = Vec::new();
    let pb = ctx.progress_bar(report.stage, tasks.len());

    for task in tasks {
        report.visited += 1;
        pb.inc(1);

        let loaded = match browser.navigate(&task.task_url).await {
            Ok(()) => browser.wait_for(&ctx.locators.subtask_card, ctx.wait).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(page) => subtasks.extend(parse(&page, ctx, task)),
            Err(e) => pb.suspend(|| ctx.page_failed(&mut report, &task.task_url, e))?,
        }
    }

    pb.finish_and_clear();
    report.emitted = subtasks.len();
    info!("Collected {} subtasks from {} tasks", subtasks.len(), tasks.len());
    Ok((subtasks, report))
}

pub fn parse(page: &Page, ctx: &StageContext, task: &TaskRecord) -> Vec<SubtaskRecord> {
    let loc = &ctx.locators;
    page.select(&loc.subtask_card)
        .filter_map(|card| {
            let title = first_in(card, &loc.subtask_title);
            let url = first_in(card, &loc.link).and_then(|a| page.href(a));
            match (title, url) {
                (Some(title), Some(url)) => Some(SubtaskRecord::under(task, text_of(title), url)),
                _ => {
                    debug!("Incomplete card on {}: {:?}", page.url(), text_of(card));
                    None
                }
            }
        })
        .collect()
}
