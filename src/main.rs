//! # News Search Crawler
//!
//! Runs a keyword search against a news site's web UI, walks the result
//! pages, and exports one normalized row per story card.
//!
//! ## Features
//!
//! - Drives the site search in Chromium: phrase, category filters, sort order
//! - Extracts title, description, link, image and date from each result card
//! - Resolves relative dates ("3 hours ago", "Yesterday", "February 2")
//!   against the day the run started
//! - Downloads card images as `image_<n>.jpeg`, concurrently per page
//! - Exports a CSV table (or JSON, or an Excel workbook), even when the crawl
//!   is cut short
//!
//! ## Usage
//!
//! ```sh
//! news_search_crawler -s obama -p 5 -o stories.csv
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Search**: Open the site and run the filtered, sorted search
//! 2. **Extract**: Turn each result card into a record, fetching its image
//! 3. **Paginate**: Advance until the page budget or the results run out
//! 4. **Output**: Write the accumulated records, partial or complete

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod accumulator;
mod assets;
mod browser;
mod cli;
mod dates;
mod extract;
mod models;
mod outputs;
mod pagination;
mod site;
mod utils;

use accumulator::ResultAccumulator;
use assets::AssetFetcher;
use browser::chromium::{ChromiumSession, SearchRequest};
use cli::Cli;
use models::{ExtractionContext, PageBudget};
use pagination::{crawl, PaginationController};
use site::{ConfigError, SiteProfile};
use utils::{ensure_writable_dir, ensure_writable_parent};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_search_crawler starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Validate configuration before touching the browser ----
    let search_phrase = args.search_phrase.trim().to_string();
    if search_phrase.is_empty() {
        error!("Search phrase is empty");
        return Err(ConfigError::EmptyPhrase.into());
    }

    let profile = match &args.site_profile {
        Some(path) => SiteProfile::load(path)?,
        None => SiteProfile::default(),
    };
    let selectors = profile.compile()?;
    let base_url = profile.base_url()?;

    if let Err(e) = ensure_writable_dir(&args.image_dir).await {
        error!(
            path = %args.image_dir.display(),
            error = %e,
            "Image directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    if let Err(e) = ensure_writable_parent(&args.output).await {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output location is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Run-scoped state ----
    let ctx = ExtractionContext::new(search_phrase.clone(), Local::now().date_naive());
    info!(
        phrase = %ctx.search_phrase,
        search_date = %ctx.search_date(),
        page_limit = args.page_limit,
        "Starting search run"
    );

    let fetcher = AssetFetcher::new(&args.image_dir, Some(base_url))?;
    let mut controller = PaginationController::new(
        ctx,
        selectors,
        fetcher,
        PageBudget::new(args.page_limit),
        usize::from(args.download_concurrency),
    );

    // Created before the browser so that even a failed launch leaves a
    // (header-only) table behind.
    let acc = ResultAccumulator::new(outputs::exporter_for(args.format, &args.output));

    let request = SearchRequest {
        phrase: search_phrase,
        categories: args.enabled_categories(),
        sort: args.sort.clone(),
    };
    let mut session = ChromiumSession::launch(
        profile,
        request,
        args.headless,
        Duration::from_millis(args.wait_timeout_ms),
    )
    .await?;

    let outcome = crawl(&mut controller, &mut session, acc).await;
    session.close().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    let summary = outcome?;
    info!(
        pages = summary.pages,
        records = summary.records,
        failed_downloads = summary.failed_downloads,
        stop = %summary.stop,
        output = %args.output.display(),
        "Done"
    );
    Ok(())
}
