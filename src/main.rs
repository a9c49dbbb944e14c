mod browser;
mod export;
mod pipeline;
mod records;
mod settings;
mod stages;
mod summary;
mod table;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use browser::http::HttpBrowser;
use browser::Browser;
use pipeline::Pipeline;
use settings::{FailurePolicy, Settings};
use stages::StageContext;

#[derive(Parser)]
#[command(name = "sota_crawler", about = "Papers with Code state-of-the-art crawler")]
struct Cli {
    /// Configuration file (default: ./crawler.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl areas, tasks, subtasks, datasets and benchmarks into CSV files
    Run {
        #[arg(long)]
        root_url: Option<String>,
        /// Directory for the five CSV tables
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Only crawl the first N areas
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Abort on the first page that fails to load instead of skipping it
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = Backend::Http)]
        backend: Backend,
    },
    /// List the top-level areas without writing anything
    Areas {
        #[arg(long)]
        root_url: Option<String>,
    },
    /// Row counts of previously exported tables
    Summary {
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Plain HTTP fetches, parsed as served
    Http,
    /// Headless Chromium (requires the `chrome` feature)
    Chrome,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run {
            root_url,
            out_dir,
            limit,
            strict,
            backend,
        } => {
            if let Some(url) = root_url {
                settings.root_url = url;
            }
            if let Some(dir) = out_dir {
                settings.out_dir = dir;
            }
            if strict {
                settings.on_page_failure = FailurePolicy::Abort;
            }
            info!(
                root = %settings.root_url,
                out_dir = %settings.out_dir.display(),
                policy = ?settings.on_page_failure,
                "Starting crawl"
            );

            let summary = match backend {
                Backend::Http => crawl(http_browser(&settings)?, &settings, limit).await?,
                Backend::Chrome => crawl(chrome_browser(&settings).await?, &settings, limit).await?,
            };
            for report in &summary.reports {
                println!("{}", report);
            }
            for file in &summary.files {
                println!("  {}", file.display());
            }
            Ok(())
        }
        Commands::Areas { root_url } => {
            if let Some(url) = root_url {
                settings.root_url = url;
            }
            let ctx = StageContext::from_settings(&settings)?;
            let mut browser = http_browser(&settings)?;
            let listed = stages::areas::collect(&mut browser, &ctx, &settings.root_url).await;
            browser.close().await?;
            let (areas, _) = listed?;

            println!("{:>3} | {:<40} | {}", "#", "Area", "URL");
            println!("{}", "-".repeat(100));
            for (i, a) in areas.iter().enumerate() {
                println!("{:>3} | {:<40} | {}", i + 1, a.area, a.area_url);
            }
            Ok(())
        }
        Commands::Summary { out_dir } => {
            let dir = out_dir.unwrap_or(settings.out_dir);
            let s = summary::load(&dir)?;
            summary::print(&s);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn crawl<B: Browser>(
    browser: B,
    settings: &Settings,
    limit: Option<usize>,
) -> Result<pipeline::CrawlSummary> {
    let ctx = StageContext::from_settings(settings)?;
    Pipeline::new(browser, ctx, settings.root_url.clone(), settings.out_dir.clone())
        .with_area_limit(limit)
        .run()
        .await
}

fn http_browser(settings: &Settings) -> Result<HttpBrowser> {
    Ok(HttpBrowser::new(
        &settings.user_agent,
        settings.page_load_timeout(),
        settings.poll_interval(),
    )?)
}

#[cfg(feature = "chrome")]
async fn chrome_browser(settings: &Settings) -> Result<browser::chrome::ChromeBrowser> {
    Ok(browser::chrome::ChromeBrowser::launch(settings.page_load_timeout(), settings.poll_interval()).await?)
}

#[cfg(not(feature = "chrome"))]
async fn chrome_browser(_settings: &Settings) -> Result<HttpBrowser> {
    anyhow::bail!("this build has no Chromium backend; rebuild with `--features chrome`")
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
