//! Chromium-backed [`BrowserSession`] using chromiumoxide.
//!
//! Drives the site search the way a reader would: open the search overlay,
//! type the phrase, narrow the categories, pick a sort order, then page
//! through results with the pager's "next" link.
//!
//! Each step waits for the element it needs to appear, polling at
//! [`POLL_INTERVAL`] until the session's wait timeout runs out. Steps that
//! reload the results also wait for the page to actually change: a click can
//! return before its navigation starts, and the previous page's cards would
//! otherwise still match.

use super::{BrowserSession, SessionError};
use crate::cli::Category;
use crate::extract::ResultFragment;
use crate::site::SiteProfile;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What to search for and how to filter and sort it.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub phrase: String,
    pub categories: Vec<Category>,
    /// Option value of the sort dropdown.
    pub sort: String,
}

/// A live Chromium tab pointed at the site search.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    profile: SiteProfile,
    request: SearchRequest,
    wait_timeout: Duration,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank tab.
    #[instrument(level = "info", skip_all, fields(headless = headless))]
    pub async fn launch(
        profile: SiteProfile,
        request: SearchRequest,
        headless: bool,
        wait_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SessionError::Driver)?;

        let (browser, mut events) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!("Browser launched");

        Ok(Self {
            browser,
            handler,
            page,
            profile,
            request,
            wait_timeout,
        })
    }

    /// Close the browser and stop the event handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        self.handler.abort();
    }

    fn timeout(&self, selector: String) -> SessionError {
        SessionError::Timeout {
            selector,
            waited_ms: self.wait_timeout.as_millis() as u64,
        }
    }

    /// Poll until at least one element matches `selector`.
    async fn wait_for(&self, selector: &str) -> Result<Vec<Element>, SessionError> {
        poll_until(self.wait_timeout, POLL_INTERVAL, move || async move {
            match self.page.find_elements(selector).await {
                Ok(found) if !found.is_empty() => Some(found),
                Ok(_) => None,
                Err(e) => {
                    debug!(selector, error = %e, "Selector query failed; still waiting");
                    None
                }
            }
        })
        .await
        .ok_or_else(|| self.timeout(selector.to_string()))
    }

    /// Snapshot of the URL and first result card, taken before a reload.
    async fn marker(&self) -> Result<PageMarker, SessionError> {
        let url = self.page.url().await?;
        let first_card = match self.page.find_element(self.profile.results.card.as_str()).await {
            Ok(card) => card.outer_html().await?,
            Err(_) => None,
        };
        Ok(PageMarker { url, first_card })
    }

    /// Poll until the results differ from `before` and a card is present.
    async fn wait_for_change(&self, before: &PageMarker, action: &str) -> Result<(), SessionError> {
        poll_until(self.wait_timeout, POLL_INTERVAL, move || async move {
            match self.marker().await {
                Ok(now) if now.is_new_page_after(before) => Some(()),
                Ok(_) => None,
                Err(e) => {
                    debug!(action, error = %e, "Page snapshot failed; still waiting");
                    None
                }
            }
        })
        .await
        .ok_or_else(|| self.timeout(format!("{} (after {action})", self.profile.results.card)))
    }

    /// Like [`Self::wait_for_change`], but an unchanged page only warrants a
    /// warning. Re-applying a filter that is already in effect reloads nothing.
    async fn settle_after(&self, before: &PageMarker, action: &str) -> Result<(), SessionError> {
        match self.wait_for_change(before, action).await {
            Err(SessionError::Timeout { .. }) => {
                warn!(action, "Results did not change; continuing with the current page");
                Ok(())
            }
            other => other,
        }
    }

    async fn wait_for_first(&self, selector: &str) -> Result<Element, SessionError> {
        self.wait_for(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::MissingControl(selector.to_string()))
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        self.wait_for_first(selector).await?.click().await?;
        Ok(())
    }

    /// Run a script that returns a boolean.
    async fn eval_bool(&self, script: String) -> Result<bool, SessionError> {
        self.page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .map_err(|e| SessionError::Driver(format!("unexpected script result: {e}")))
    }

    async fn submit_phrase(&self) -> Result<(), SessionError> {
        let input = self.wait_for_first(&self.profile.search.input).await?;
        input.click().await?;
        input.type_str(&self.request.phrase).await?;
        input.press_key("Enter").await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    /// Tick each requested category checkbox. A missing checkbox is skipped.
    async fn apply_categories(&self) -> Result<(), SessionError> {
        let search = &self.profile.search;
        self.wait_for(&search.filters_panel).await?;
        self.click(&search.category_toggle).await?;
        self.wait_for(&search.category_items).await?;

        for category in &self.request.categories {
            let selector = self.profile.category_checkbox(*category);
            let script = format!(
                "(() => {{ const el = document.querySelector({}); \
                 if (!el) return false; if (!el.checked) el.click(); return true; }})()",
                js_string(&selector)
            );
            if self.eval_bool(script).await? {
                debug!(?category, "Category filter enabled");
            } else {
                warn!(?category, %selector, "Category filter not offered by the site; skipping");
            }
        }

        // The filter form only applies on resubmit.
        let before = self.marker().await?;
        let input = self.wait_for_first(&search.input).await?;
        input.press_key("Enter").await?;
        self.settle_after(&before, "category filter").await
    }

    async fn apply_sort(&self) -> Result<(), SessionError> {
        let select = &self.profile.search.sort_select;
        self.wait_for(select).await?;
        let before = self.marker().await?;
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             el.value = {}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            js_string(select),
            js_string(&self.request.sort)
        );
        if !self.eval_bool(script).await? {
            return Err(SessionError::MissingControl(select.clone()));
        }
        self.settle_after(&before, "sort").await
    }
}

impl BrowserSession for ChromiumSession {
    #[instrument(level = "info", skip_all, fields(phrase = %self.request.phrase))]
    async fn goto_search_results(&mut self) -> Result<(), SessionError> {
        self.page.goto(self.profile.base_url.as_str()).await?;
        self.page.wait_for_navigation().await?;

        self.click(&self.profile.search.open_button).await?;
        self.submit_phrase().await?;
        self.apply_categories().await?;
        self.wait_for(&self.profile.results.card).await?;
        self.apply_sort().await?;
        self.wait_for(&self.profile.results.card).await?;

        info!("Search results ready");
        Ok(())
    }

    async fn current_page_fragments(&mut self) -> Result<Vec<ResultFragment>, SessionError> {
        let cards = self.page.find_elements(&self.profile.results.card).await?;
        let mut fragments = Vec::with_capacity(cards.len());
        for card in cards {
            let html = card.inner_html().await?.unwrap_or_default();
            fragments.push(ResultFragment::new(html));
        }
        Ok(fragments)
    }

    async fn has_next_page(&mut self) -> Result<bool, SessionError> {
        let links = self
            .page
            .find_elements(&self.profile.search.next_page_link)
            .await?;
        Ok(!links.is_empty())
    }

    async fn advance_to_next_page(&mut self) -> Result<(), SessionError> {
        let next = &self.profile.search.next_page_link;
        let link = self
            .page
            .find_element(next.as_str())
            .await
            .map_err(|_| SessionError::MissingControl(next.clone()))?;
        let before = self.marker().await?;
        link.click().await?;
        self.wait_for_change(&before, "next page").await?;
        debug!("Advanced to next result page");
        Ok(())
    }
}

/// What identifies the currently loaded result page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageMarker {
    url: Option<String>,
    first_card: Option<String>,
}

impl PageMarker {
    /// A new page has cards, and either its URL or its first card differs.
    fn is_new_page_after(&self, before: &PageMarker) -> bool {
        self.first_card.is_some() && self != before
    }
}

/// Call `probe` every `interval` until it yields a value or `timeout` elapses.
///
/// `probe` always runs at least once.
async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if started.elapsed() >= timeout {
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Quote `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
