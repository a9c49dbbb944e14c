use anyhow::Result;
use tracing::{debug, info};

use super::{StageContext, StageReport};
use crate::browser::{Browser, Page};
use crate::records::{BenchmarkRecord, Columns, DatasetRecord};
use crate::table;

/// Stage 5: every row of each dataset's full benchmark table.
pub async fn collect<B: Browser>(
    browser: &mut B,
    ctx: &StageContext,
    datasets: &[DatasetRecord],
) -> Result<(Vec<BenchmarkRecord>, StageReport)> {
    let mut report = StageReport::new("benchmarks");
    let mut benchmarks = Vec::new();
    let pb = ctx.progress_bar(report.stage, datasets.len());

    for dataset in datasets {
        report.visited += 1;
        pb.inc(1);

        let loaded = match browser.navigate(&dataset.benchmark_url).await {
            Ok(()) => browser.wait_for(&ctx.locators.benchmark_table, ctx.wait).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(page) => {
                let rows = parse(&page, ctx, dataset);
                debug!("{}: {} benchmark rows", dataset.benchmark_url, rows.len());
                benchmarks.extend(rows);
            }
            Err(e) => pb.suspend(|| ctx.page_failed(&mut report, &dataset.benchmark_url, e))?,
        }
    }

    pb.finish_and_clear();
    report.emitted = benchmarks.len();
    info!("Collected {} benchmark rows from {} datasets", benchmarks.len(), datasets.len());
    Ok((benchmarks, report))
}

pub fn parse(page: &Page, ctx: &StageContext, dataset: &DatasetRecord) -> Vec<BenchmarkRecord> {
    let Some(results) = page.first(&ctx.locators.benchmark_table) else {
        return Vec::new();
    };
    let headers = table::headers(results);
    table::body_rows(results)
        .into_iter()
        .map(|row| BenchmarkRecord::under(dataset, Columns::zip(&headers, table::cell_texts(row))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::StaticBrowser;
    use crate::settings::FailurePolicy;
    use crate::stages::testing::ctx;

    const IMAGENET: &str = "https://paperswithcode.com/sota/image-classification-on-imagenet";
    const CIFAR: &str = "https://paperswithcode.com/sota/image-classification-on-cifar-10";

    fn dataset(url: &str) -> DatasetRecord {
        DatasetRecord {
            area: "Computer Vision".into(),
            task: "Image Classification".into(),
            subtask: "Image Classification".into(),
            benchmark_url: url.into(),
            columns: Columns::zip(["Dataset"], vec!["ImageNet".to_string()]),
        }
    }

    #[tokio::test]
    async fn every_table_row_becomes_a_record() {
        let mut browser = StaticBrowser::new().fixture(IMAGENET, "benchmark_imagenet");
        let (rows, report) = collect(&mut browser, &ctx(FailurePolicy::Abort), &[dataset(IMAGENET)])
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(report.emitted, 3);
        assert_eq!(rows[0].columns.get("Rank"), Some("1"));
        assert_eq!(rows[0].columns.get("Model"), Some("CoCa (finetuned)"));
        assert_eq!(rows[0].columns.get("Top 1 Accuracy"), Some("91.0%"));
        assert!(rows.iter().all(|r| r.subtask == "Image Classification"));
        // Dataset columns are not carried into benchmark rows.
        assert!(rows.iter().all(|r| r.columns.get("Dataset").is_none()));
    }

    #[tokio::test]
    async fn missing_table_skips_by_default() {
        let mut browser = StaticBrowser::new()
            .page(CIFAR, "<html><body><p>No results</p></body></html>")
            .fixture(IMAGENET, "benchmark_imagenet");
        let (rows, report) = collect(&mut browser, &ctx(FailurePolicy::Skip), &[dataset(CIFAR), dataset(IMAGENET)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn missing_table_aborts_under_strict_policy() {
        let mut browser = StaticBrowser::new().page(CIFAR, "<html><body><p>No results</p></body></html>");
        let err = collect(&mut browser, &ctx(FailurePolicy::Abort), &[dataset(CIFAR)])
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("table.table-stripped.show-overflow-x"));
    }
}
