//! The page loop: fetch cards, extract records, advance, repeat.
//!
//! ```text
//! Idle -> FetchingPage -> ExtractingResults -> AdvancingPage -+-> Done
//!              ^                                              |
//!              +----------------- next page ------------------+
//! ```
//!
//! [`PaginationController::run`] visits pages until the [`PageBudget`] runs out
//! or the pager has no next page. Records are pushed in page order, then card
//! order, exactly as the site ranked them. Nothing is reordered or deduplicated.
//!
//! Only driver-level failures end the loop early. [`crawl`] wraps the loop so
//! that whatever was collected before such a failure is still exported.

use crate::accumulator::ResultAccumulator;
use crate::assets::AssetFetcher;
use crate::browser::{BrowserSession, SessionError};
use crate::extract::{extract, ResultFragment};
use crate::models::{ExtractionContext, PageBudget, ResultRecord};
use crate::outputs::{ExportError, TableExporter};
use crate::site::CompiledSelectors;
use futures::stream::{self, StreamExt};
use std::fmt;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Why the loop stopped normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    NoNextPage,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted => f.write_str("page budget exhausted"),
            StopReason::NoNextPage => f.write_str("no further result pages"),
        }
    }
}

/// Totals for a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: u32,
    pub records: usize,
    pub failed_downloads: usize,
    pub stop: StopReason,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The crawl stopped early. `exported` rows were still written.
    #[error("crawl aborted after {pages} page(s), {exported} record(s) exported: {source}")]
    Session {
        pages: u32,
        exported: usize,
        #[source]
        source: SessionError,
    },
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Owns the run-scoped state: context, page budget and image fetcher.
pub struct PaginationController {
    ctx: ExtractionContext,
    selectors: CompiledSelectors,
    fetcher: AssetFetcher,
    budget: PageBudget,
    download_concurrency: usize,
    pages_visited: u32,
}

impl PaginationController {
    pub fn new(
        ctx: ExtractionContext,
        selectors: CompiledSelectors,
        fetcher: AssetFetcher,
        budget: PageBudget,
        download_concurrency: usize,
    ) -> Self {
        Self {
            ctx,
            selectors,
            fetcher,
            budget,
            download_concurrency: download_concurrency.max(1),
            pages_visited: 0,
        }
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    pub fn failed_downloads(&self) -> usize {
        self.fetcher.failures()
    }

    /// Drive `session` page by page, pushing every record into `acc`.
    #[instrument(level = "info", skip_all, fields(phrase = %self.ctx.search_phrase, budget = self.budget.remaining()))]
    pub async fn run<B, E>(
        &mut self,
        session: &mut B,
        acc: &mut ResultAccumulator<E>,
    ) -> Result<StopReason, SessionError>
    where
        B: BrowserSession,
        E: TableExporter,
    {
        session.goto_search_results().await?;

        loop {
            let page = self.pages_visited + 1;
            let fragments = session.current_page_fragments().await?;
            info!(page, cards = fragments.len(), "Fetched result page");

            for record in self.extract_page(&fragments).await {
                acc.push(record);
            }
            self.pages_visited = page;

            self.budget.consume();
            if self.budget.is_exhausted() {
                return Ok(StopReason::BudgetExhausted);
            }
            if !session.has_next_page().await? {
                return Ok(StopReason::NoNextPage);
            }
            session.advance_to_next_page().await?;
        }
    }

    /// Extract every card on a page, downloading images concurrently.
    ///
    /// `buffered` yields results in input order, so records keep card order.
    async fn extract_page(&self, fragments: &[ResultFragment]) -> Vec<ResultRecord> {
        stream::iter(fragments)
            .map(|fragment| extract(fragment, &self.ctx, &self.selectors, &self.fetcher))
            .buffered(self.download_concurrency)
            .collect()
            .await
    }
}

/// Run the page loop and export the results, even when the loop fails.
pub async fn crawl<B, E>(
    controller: &mut PaginationController,
    session: &mut B,
    mut acc: ResultAccumulator<E>,
) -> Result<CrawlSummary, CrawlError>
where
    B: BrowserSession,
    E: TableExporter,
{
    let outcome = controller.run(session, &mut acc).await;
    let exported = acc.finalize();
    let pages = controller.pages_visited();

    match (outcome, exported) {
        (Ok(stop), Ok(records)) => {
            let summary = CrawlSummary {
                pages,
                records,
                failed_downloads: controller.failed_downloads(),
                stop,
            };
            info!(
                pages,
                records,
                failed_downloads = summary.failed_downloads,
                stop = %stop,
                "Crawl finished"
            );
            Ok(summary)
        }
        (Ok(_), Err(e)) => Err(CrawlError::Export(e)),
        (Err(source), Ok(exported)) => {
            error!(pages, exported, error = %source, "Crawl aborted; partial results exported");
            Err(CrawlError::Session {
                pages,
                exported,
                source,
            })
        }
        (Err(source), Err(export_error)) => {
            error!(error = %export_error, "Export of partial results failed");
            Err(CrawlError::Session {
                pages,
                exported: 0,
                source,
            })
        }
    }
}
