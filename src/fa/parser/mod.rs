//! HTML extraction for FurAffinity listing and submission pages.
//!
//! The rest of the crate only sees [`ListingPage`] and [`ItemPage`]; all
//! markup queries live in this module.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::fa::error::{FaError, FaResult};

pub(crate) use self::item::ItemPage;
pub(crate) use self::listing::ListingPage;

pub(crate) mod item;
pub(crate) mod listing;

lazy_static! {
    static ref NOTICE_SELECTOR: Selector = Selector::parse(".notice-message").unwrap();
    static ref DIV_SELECTOR: Selector = Selector::parse("div").unwrap();
    static ref ANCHOR_SELECTOR: Selector = Selector::parse("a").unwrap();
    static ref SPAN_SELECTOR: Selector = Selector::parse("span").unwrap();
}

/// Returns the text of the site's notice banner, if the page carries one.
///
/// Only the direct text of the banner's first `div` is kept; nested elements
/// (headings, links) are dropped, which leaves the message itself.
pub(crate) fn notice_message(document: &Html) -> Option<String> {
    let banner = document.select(&NOTICE_SELECTOR).next()?;
    let message = match banner.select(&DIV_SELECTOR).next() {
        Some(div) => div
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| &**text)
            .collect::<String>(),
        None => element_text(&banner),
    };
    Some(message.trim().to_string())
}

/// Concatenated text of an element and its descendants.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

/// Text of the first match of `selector` under `scope`, trimmed, or a
/// [`FaError::MissingField`] naming `field`.
pub(crate) fn required_text(scope: &ElementRef, selector: &Selector, field: &'static str) -> FaResult<String> {
    scope
        .select(selector)
        .next()
        .map(|el| element_text(&el).trim().to_string())
        .ok_or(FaError::MissingField(field))
}

/// Parses counters such as `1,204` into a number.
pub(crate) fn parse_count(value: &str, field: &'static str) -> FaResult<u64> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
    cleaned.parse::<u64>().map_err(|_| FaError::ParseError {
        field,
        value: value.trim().to_string(),
    })
}
