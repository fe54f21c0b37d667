//! Record extraction from a single search result card.
//!
//! A card arrives as a [`ResultFragment`] holding the card's inner HTML. It is
//! parsed with `scraper` and queried through the [`FragmentQuery`] trait. Every
//! field is optional: a missing element becomes the documented sentinel on the
//! record, and extraction never fails.
//!
//! Extraction is split in two so the page loop can download images for a whole
//! page concurrently:
//! 1. [`read_card`] parses the HTML and pulls raw field values. It is synchronous,
//!    and the parsed tree never outlives the call.
//! 2. [`build_record`] combines those values with the run context and the
//!    outcome of the image download.
//!
//! [`extract`] chains both steps for a single card, with the image download in between.

use crate::assets::AssetFetcher;
use crate::dates::normalize_date;
use crate::models::{
    ExtractionContext, ResultRecord, NO_DATE, NO_IMAGE, NO_LINK, NOT_AVAILABLE,
};
use crate::site::CompiledSelectors;
use crate::utils::truncate_for_log;
use scraper::{Html, Selector};
use std::future::Future;
use tracing::debug;

/// Words in a title that mark a story as being about money.
const MONEY_LEXICON: [&str; 3] = ["dollar", "dollars", "$"];

/// The markup of one result card, as handed over by the browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFragment {
    html: String,
}

impl ResultFragment {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    fn parse(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}

/// Field lookups against a parsed fragment.
///
/// Both methods look at the first element matching `selector` only.
pub trait FragmentQuery {
    /// Trimmed text content. `None` when the element is missing or its text is blank.
    fn query_text(&self, selector: &Selector) -> Option<String>;
    /// Value of attribute `attr`. `None` when the element or attribute is missing.
    fn query_attribute(&self, selector: &Selector, attr: &str) -> Option<String>;
}

impl FragmentQuery for Html {
    fn query_text(&self, selector: &Selector) -> Option<String> {
        let element = self.select(selector).next()?;
        let text = element.text().collect::<String>();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn query_attribute(&self, selector: &Selector, attr: &str) -> Option<String> {
        self.select(selector)
            .next()?
            .value()
            .attr(attr)
            .map(str::to_string)
    }
}

/// Raw values pulled out of a card, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub raw_date: Option<String>,
}

/// Parse a fragment and read each field it carries.
pub fn read_card(fragment: &ResultFragment, selectors: &CompiledSelectors) -> CardFields {
    let doc = fragment.parse();
    CardFields {
        title: doc.query_text(&selectors.title),
        description: doc.query_text(&selectors.description),
        link: doc.query_attribute(&selectors.link, "href"),
        image_url: doc.query_attribute(&selectors.image, "src"),
        raw_date: doc.query_text(&selectors.date),
    }
}

/// Assemble the final record.
///
/// `image_local_id` is the outcome of the image download. Pass `None` when the
/// card had no image.
pub fn build_record(
    fields: CardFields,
    ctx: &ExtractionContext,
    image_local_id: Option<String>,
) -> ResultRecord {
    let title = fields.title.unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let raw_date = fields.raw_date.unwrap_or_else(|| NO_DATE.to_string());

    ResultRecord {
        search_phrase: ctx.search_phrase.clone(),
        phrase_count: phrase_count(&title, &ctx.search_phrase),
        money_flag: mentions_money(&title),
        description: fields
            .description
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        image_local_id: image_local_id.unwrap_or_else(|| NO_IMAGE.to_string()),
        image_url: fields.image_url.unwrap_or_else(|| NO_IMAGE.to_string()),
        link: fields.link.unwrap_or_else(|| NO_LINK.to_string()),
        news_date: normalize_date(&raw_date, ctx.anchor_date),
        search_date: ctx.search_date(),
        title,
    }
}

/// Extract one card into a record, downloading its image if it has one.
///
/// Parsing and the image identifier reservation happen when this is called.
/// Only the download itself is deferred to the returned future, so a page's
/// cards can be awaited concurrently and still get identifiers in card order.
pub fn extract<'a>(
    fragment: &ResultFragment,
    ctx: &'a ExtractionContext,
    selectors: &CompiledSelectors,
    fetcher: &'a AssetFetcher,
) -> impl Future<Output = ResultRecord> + use<'a> {
    let fields = read_card(fragment, selectors);
    if fields.title.is_none() {
        debug!(html = %truncate_for_log(fragment.html(), 200), "Card has no title");
    }
    let download = fields.image_url.clone().map(|url| fetcher.fetch(url));

    async move {
        let local_id = match download {
            Some(download) => Some(download.await),
            None => None,
        };
        build_record(fields, ctx, local_id)
    }
}

/// Case-insensitive, non-overlapping occurrences of `phrase` in `title`.
pub fn phrase_count(title: &str, phrase: &str) -> usize {
    if phrase.is_empty() {
        return 0;
    }
    title
        .to_lowercase()
        .matches(&phrase.to_lowercase())
        .count()
}

/// Whether `title` contains any money word, ignoring case.
pub fn mentions_money(title: &str) -> bool {
    let lowered = title.to_lowercase();
    MONEY_LEXICON.iter().any(|word| lowered.contains(word))
}
