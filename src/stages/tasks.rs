use anyhow::Result;
use tracing::{debug, info};

use super::{StageContext, StageReport};
use crate::browser::{first_in, text_of, Browser, Page};
use crate::records::{AreaRecord, TaskRecord};

/// Stage 2: one task record per task link on each area page.
pub async fn collect<B: Browser>(
    browser: &mut B,
    ctx: &StageContext,
    areas: &[AreaRecord],
) -> Result<(Vec<TaskRecord>, StageReport)> {
    let mut report = StageReport::new("tasks");
    let mut tasks = Vec::new();
    let pb = ctx.progress_bar(report.stage, areas.len());

    for area in areas {
        report.visited += 1;
        pb.inc(1);

        let loaded = match browser.navigate(&area.area_url).await {
            Ok(()) => browser.wait_for(&ctx.locators.task_container, ctx.wait).await,
            Err(e) => Err(e),
        };
        let page = match loaded {
            Ok(page) => page,
            Err(e) => {
                pb.suspend(|| ctx.page_failed(&mut report, &area.area_url, e))?;
                continue;
            }
        };

        let found = parse(&page, ctx, area);
        debug!("{}: {} task links", area.area, found.len());
        tasks.extend(found);
    }

    pb.finish_and_clear();
    report.emitted = tasks.len();
    info!("Collected {} tasks from {} areas", tasks.len(), areas.len());
    Ok((tasks, report))
}

/// Each container contributes one record per link across all of its link
/// groups, all sharing the container's title. Duplicate links are kept.
pub fn parse(page: &Page, ctx: &StageContext, area: &AreaRecord) -> Vec<TaskRecord> {
    let loc = &ctx.locators;
    let mut tasks = Vec::new();

    for container in page.select(&loc.task_container) {
        let Some(title) = first_in(container, &loc.task_title) else {
            debug!("Task container without title on {}", page.url());
            continue;
        };
        let task = text_of(title);

        for group in container.select(loc.task_link_group.selector()) {
            for link in group.select(loc.link.selector()) {
                if let Some(url) = page.href(link) {
                    tasks.push(TaskRecord::under(area, task.clone(), url));
                }
            }
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::StaticBrowser;
    use crate::settings::FailurePolicy;
    use crate::stages::testing::ctx;

    fn area(name: &str, url: &str) -> AreaRecord {
        AreaRecord {
            area: name.into(),
            area_url: url.into(),
        }
    }

    const CV: &str = "https://paperswithcode.com/area/computer-vision";

    #[tokio::test]
    async fn fan_out_follows_link_count_not_container_count() {
        let mut browser = StaticBrowser::new().fixture(CV, "area_computer_vision");
        let areas = vec![area("Computer Vision", CV)];
        let (tasks, report) = collect(&mut browser, &ctx(FailurePolicy::Skip), &areas).await.unwrap();

        // Two containers with link groups (3 + 2 links, one repeated), one with a title only.
        assert_eq!(tasks.len(), 5);
        assert_eq!(report.emitted, 5);
        assert_eq!(tasks.iter().filter(|t| t.task == "Image Classification").count(), 3);
        assert_eq!(tasks.iter().filter(|t| t.task == "Object Detection").count(), 2);
        assert!(tasks.iter().all(|t| t.area == "Computer Vision"));
        assert_eq!(
            tasks.iter().filter(|t| t.task_url == "https://paperswithcode.com/task/image-classification").count(),
            2
        );
    }

    #[tokio::test]
    async fn area_name_comes_from_parent_not_page() {
        let mut browser = StaticBrowser::new().fixture(CV, "area_computer_vision");
        let areas = vec![area("Vision (renamed)", CV)];
        let (tasks, _) = collect(&mut browser, &ctx(FailurePolicy::Skip), &areas).await.unwrap();
        assert!(tasks.iter().all(|t| t.area == "Vision (renamed)"));
    }

    #[tokio::test]
    async fn failed_area_is_skipped_or_aborts_by_policy() {
        let missing = "https://paperswithcode.com/area/missing";
        let areas = vec![area("Missing", missing), area("Computer Vision", CV)];

        let mut browser = StaticBrowser::new().fixture(CV, "area_computer_vision");
        let (tasks, report) = collect(&mut browser, &ctx(FailurePolicy::Skip), &areas).await.unwrap();
        assert_eq!(tasks.len(), 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.visited, 2);

        let mut browser = StaticBrowser::new().fixture(CV, "area_computer_vision");
        let err = collect(&mut browser, &ctx(FailurePolicy::Abort), &areas).await.unwrap_err();
        assert!(format!("{:#}", err).contains(missing));
    }
}
