use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{StageContext, StageReport};
use crate::browser::{first_in, text_of, Browser, Page};
use crate::records::AreaRecord;

/// Stage 1. Any failure here aborts the run: without areas there is nothing to crawl.
pub async fn collect<B: Browser>(
    browser: &mut B,
    ctx: &StageContext,
    root_url: &str,
) -> Result<(Vec<AreaRecord>, StageReport)> {
    let mut report = StageReport::new("areas");

    browser
        .navigate(root_url)
        .await
        .with_context(|| format!("Failed to load area listing {}", root_url))?;
    let page = browser
        .wait_for(&ctx.locators.area_title, ctx.wait)
        .await
        .with_context(|| format!("No areas found on {}", root_url))?;

    let areas = parse(&page, ctx);
    report.visited = 1;
    report.emitted = areas.len();
    info!("Found {} areas on {}", areas.len(), root_url);
    Ok((areas, report))
}

pub fn parse(page: &Page, ctx: &StageContext) -> Vec<AreaRecord> {
    let loc = &ctx.locators;
    page.select(&loc.area_title)
        .filter_map(|title| {
            let Some(link) = first_in(title, &loc.link) else {
                debug!("Area title without link: {:?}", text_of(title));
                return None;
            };
            let area_url = page.href(link)?;
            Some(AreaRecord {
                area: text_of(link),
                area_url,
            })
        })
        .collect()
}
