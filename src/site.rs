//! Site profile: where to search and how to find things on the page.
//!
//! Selectors are site-specific and change whenever the site is redesigned, so
//! they live in data rather than code. The built-in [`SiteProfile::default`]
//! targets AP News; any field can be overridden from a YAML file passed with
//! `--site-profile`.
//!
//! ```yaml
//! base_url: https://apnews.com
//! results:
//!   card: "div.SearchResultsModule-results div.PageList-items div.PageList-items-item"
//! ```
//!
//! Before a run starts, the profile is compiled into [`CompiledSelectors`]. A
//! malformed selector is a configuration error, reported before the browser is
//! launched.

use crate::cli::Category;
use scraper::Selector;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors raised while loading or validating run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read site profile {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse site profile: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid selector for {field} ({selector}): {reason}")]
    Selector {
        field: &'static str,
        selector: String,
        reason: String,
    },
    #[error("invalid base url {0}: {1}")]
    BaseUrl(String, url::ParseError),
    #[error("search phrase must not be empty")]
    EmptyPhrase,
}

/// Everything the crawler needs to know about one news site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub base_url: String,
    pub search: SearchControls,
    pub results: ResultSelectors,
    pub categories: CategoryValues,
}

/// Selectors for the search overlay, filters, sort control and pager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchControls {
    pub open_button: String,
    pub input: String,
    pub filters_panel: String,
    pub category_toggle: String,
    pub category_items: String,
    /// Checkbox `name` attribute shared by all category filters.
    pub category_input_name: String,
    pub sort_select: String,
    pub next_page_link: String,
}

/// Selectors for a result card and the fields inside it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResultSelectors {
    pub card: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub image: String,
    pub date: String,
}

/// Checkbox values for the site's category taxonomy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CategoryValues {
    pub live_blogs: String,
    pub stories: String,
    pub subsections: String,
    pub videos: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: "https://apnews.com".to_string(),
            search: SearchControls::default(),
            results: ResultSelectors::default(),
            categories: CategoryValues::default(),
        }
    }
}

impl Default for SearchControls {
    fn default() -> Self {
        Self {
            open_button: "button.SearchOverlay-search-button".to_string(),
            input: "input.SearchOverlay-search-input".to_string(),
            filters_panel: "div.SearchResultsModule-filters-content".to_string(),
            category_toggle: "div.SearchFilter-heading[data-toggle-trigger='search-filter']"
                .to_string(),
            category_items: "div.SearchFilter-items-wrapper".to_string(),
            category_input_name: "f2".to_string(),
            sort_select: "select.Select-input".to_string(),
            next_page_link: "div.Pagination div.Pagination-nextPage a".to_string(),
        }
    }
}

impl Default for ResultSelectors {
    fn default() -> Self {
        Self {
            card: "div.SearchResultsModule-results div.PageList-items div.PageList-items-item"
                .to_string(),
            title: "div.PagePromo-title a".to_string(),
            description: "div.PagePromo-description".to_string(),
            link: "div.PagePromo-content a".to_string(),
            image: "picture img.Image".to_string(),
            date: "div.PagePromo-content div.PagePromo-byline div.PagePromo-date span[data-date] span.Timestamp-template".to_string(),
        }
    }
}

impl Default for CategoryValues {
    fn default() -> Self {
        Self {
            live_blogs: "00000190-0dc5-d7b0-a1fa-dde7ec030000".to_string(),
            stories: "00000188-f942-d221-a78c-f9570e360000".to_string(),
            subsections: "00000189-9323-db0a-a7f9-9b7fb64a0000".to_string(),
            videos: "00000188-d597-dc35-ab8d-d7bf1ce10000".to_string(),
        }
    }
}

impl SiteProfile {
    /// Load a profile from YAML; missing keys fall back to the built-in defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let profile = Self::from_yaml(&raw)?;
        info!(base_url = %profile.base_url, "Loaded site profile");
        Ok(profile)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn base_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::BaseUrl(self.base_url.clone(), e))
    }

    /// CSS selector for the checkbox that enables `category`.
    pub fn category_checkbox(&self, category: Category) -> String {
        let value = match category {
            Category::LiveBlogs => &self.categories.live_blogs,
            Category::Stories => &self.categories.stories,
            Category::Subsections => &self.categories.subsections,
            Category::Videos => &self.categories.videos,
        };
        format!(
            "input[name='{}'][value='{}']",
            self.search.category_input_name, value
        )
    }

    /// Compile the per-card field selectors used by the extractor.
    ///
    /// Selectors only ever handed to the browser are parsed too, so a typo
    /// fails here instead of as a readiness timeout mid-run.
    pub fn compile(&self) -> Result<CompiledSelectors, ConfigError> {
        let s = &self.search;
        for (field, selector) in [
            ("search.open_button", &s.open_button),
            ("search.input", &s.input),
            ("search.filters_panel", &s.filters_panel),
            ("search.category_toggle", &s.category_toggle),
            ("search.category_items", &s.category_items),
            ("search.sort_select", &s.sort_select),
            ("search.next_page_link", &s.next_page_link),
            ("results.card", &self.results.card),
        ] {
            compile(field, selector)?;
        }

        let r = &self.results;
        Ok(CompiledSelectors {
            title: compile("results.title", &r.title)?,
            description: compile("results.description", &r.description)?,
            link: compile("results.link", &r.link)?,
            image: compile("results.image", &r.image)?,
            date: compile("results.date", &r.date)?,
        })
    }
}

/// Field selectors parsed once per run and reused for every fragment.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub title: Selector,
    pub description: Selector,
    pub link: Selector,
    pub image: Selector,
    pub date: Selector,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_compiles() {
        assert!(SiteProfile::default().compile().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let profile = SiteProfile::from_yaml(
            "base_url: https://example.com\nresults:\n  title: h3.headline\n",
        )
        .unwrap();
        assert_eq!(profile.base_url, "https://example.com");
        assert_eq!(profile.results.title, "h3.headline");
        assert_eq!(profile.results.link, ResultSelectors::default().link);
        assert_eq!(
            profile.search.next_page_link,
            SearchControls::default().next_page_link
        );
    }

    #[test]
    fn test_bad_selector_is_reported_with_field() {
        let mut profile = SiteProfile::default();
        profile.results.date = "div[[".to_string();
        match profile.compile() {
            Err(ConfigError::Selector { field, .. }) => assert_eq!(field, "results.date"),
            other => panic!("expected selector error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_browser_selector_is_rejected() {
        let mut profile = SiteProfile::default();
        profile.search.next_page_link = "a:::".to_string();
        assert!(matches!(
            profile.compile(),
            Err(ConfigError::Selector { field: "search.next_page_link", .. })
        ));
    }

    #[test]
    fn test_category_checkbox_selector() {
        let profile = SiteProfile::default();
        assert_eq!(
            profile.category_checkbox(Category::Stories),
            "input[name='f2'][value='00000188-f942-d221-a78c-f9570e360000']"
        );
    }

    #[test]
    fn test_bad_base_url() {
        let profile = SiteProfile {
            base_url: "not a url".to_string(),
            ..SiteProfile::default()
        };
        assert!(matches!(profile.base_url(), Err(ConfigError::BaseUrl(..))));
    }
}
