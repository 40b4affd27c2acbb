use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_qa_harvester::checkpoint::CheckpointStore;
use forum_qa_harvester::config::Config;
use forum_qa_harvester::crawl::{CrawlTiming, Crawler, RunParams};
use forum_qa_harvester::diagnostics::Diagnostics;
use forum_qa_harvester::images::ImageFetcher;
use forum_qa_harvester::profile::SiteProfile;
use forum_qa_harvester::render::{ChromiumRenderer, PageRenderer};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting forum-qa-harvester");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let targets = config.targets().context("Failed to load targets")?;

    info!(
        targets = targets.len(),
        output_dir = %config.output_dir.display(),
        resume = config.resume,
        debug = config.debug,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                config.output_dir.display()
            )
        })?;

    let crawler = Crawler::new(
        SiteProfile::sap_community(),
        CrawlTiming::default().with_nav_timeout(config.nav_timeout),
        &config.output_dir,
        ImageFetcher::new().context("Failed to build image client")?,
        Diagnostics::new(config.debug, &config.diagnostics_dir),
    );

    if config.reset_progress {
        let store = CheckpointStore::new(&config.output_dir);
        for target in &targets {
            let base = crawler.base_name(&target.url);
            store
                .reset(&base)
                .await
                .with_context(|| format!("Failed to reset progress for {}", target.name))?;
        }
    }

    let mut renderer = ChromiumRenderer::launch(&config.chromium_config())
        .await
        .context("Failed to launch browser")?;

    let mut total_accepted = 0;
    let mut total_unaccepted = 0;

    for (i, target) in targets.iter().enumerate() {
        info!(
            target = %target.name,
            url = %target.url,
            pages = target.pages,
            "Crawling target {}/{}",
            i + 1,
            targets.len()
        );

        let params = RunParams {
            topic_url: target.url.clone(),
            max_pages: target.pages,
            max_questions: config.max_questions,
            resume: config.resume,
        };
        let outcome = crawler.run(&mut renderer, &params).await;

        if outcome.accepted.is_empty() && outcome.unaccepted.is_empty() {
            warn!(target = %target.name, stop = ?outcome.stop, "Target produced no threads");
        } else {
            info!(
                target = %target.name,
                accepted = outcome.accepted.len(),
                unaccepted = outcome.unaccepted.len(),
                processed = outcome.processed,
                stop = ?outcome.stop,
                "Target complete"
            );
        }
        total_accepted += outcome.accepted.len();
        total_unaccepted += outcome.unaccepted.len();
    }

    renderer.close().await.context("Failed to close browser")?;

    info!(
        accepted = total_accepted,
        unaccepted = total_unaccepted,
        "All targets complete"
    );

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_qa_harvester=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
