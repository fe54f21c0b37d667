//! Browser session abstraction for driving the site's search UI.
//!
//! The page loop only needs four capabilities from a browser. They are
//! described by [`BrowserSession`], so the loop can be driven by a real
//! Chromium instance ([`chromium::ChromiumSession`]) or by an in-memory double
//! in tests.
//!
//! Every call blocks the caller until the page reports it is ready. When the
//! expected element does not show up within the session's wait bound, the call
//! fails with [`SessionError::Timeout`].

pub mod chromium;

use crate::extract::ResultFragment;
use thiserror::Error;

/// Driver-level failures. Any of these ends the crawl.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("timed out after {waited_ms}ms waiting for {selector}")]
    Timeout { selector: String, waited_ms: u64 },
    #[error("required page control not found: {0}")]
    MissingControl(String),
    #[error("browser driver error: {0}")]
    Driver(String),
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        SessionError::Driver(e.to_string())
    }
}

/// What the page loop needs from a browser.
pub trait BrowserSession {
    /// Run the search and leave the browser on the first result page.
    async fn goto_search_results(&mut self) -> Result<(), SessionError>;

    /// Result cards on the current page, in the site's own order.
    async fn current_page_fragments(&mut self) -> Result<Vec<ResultFragment>, SessionError>;

    /// Whether the pager offers a next page.
    async fn has_next_page(&mut self) -> Result<bool, SessionError>;

    /// Move to the next result page and wait until it is ready.
    async fn advance_to_next_page(&mut self) -> Result<(), SessionError>;
}
