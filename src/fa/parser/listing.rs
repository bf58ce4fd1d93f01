use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::fa::parser::{ANCHOR_SELECTOR, notice_message};

lazy_static! {
    static ref AVATAR_SELECTOR: Selector = Selector::parse(".loggedin_user_avatar").unwrap();
    static ref NO_IMAGES_SELECTOR: Selector = Selector::parse("#no-images").unwrap();
    static ref FIGURE_SELECTOR: Selector = Selector::parse("figure").unwrap();
    static ref NEXT_BUTTON_SELECTOR: Selector = Selector::parse("a.button.standard.right").unwrap();
}

/// Everything the paginator needs from one gallery listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ListingPage {
    /// Account name behind the session, `None` when browsing logged out.
    pub(crate) logged_in_as: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) end_of_gallery: bool,
    /// Relative submission paths, in page order.
    pub(crate) items: Vec<String>,
    /// `href` of the "next" control, only present on token-paginated listings.
    pub(crate) next_href: Option<String>,
}

impl ListingPage {
    pub(crate) fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let logged_in_as = document
            .select(&AVATAR_SELECTOR)
            .next()
            .map(|avatar| avatar.value().attr("alt").unwrap_or_default().to_string());

        let mut items = Vec::new();
        for figure in document.select(&FIGURE_SELECTOR) {
            match figure
                .select(&ANCHOR_SELECTOR)
                .find_map(|anchor| anchor.value().attr("href"))
            {
                Some(href) => items.push(href.to_string()),
                None => warn!("Skipping a gallery thumbnail without a link"),
            }
        }

        let next_href = document
            .select(&NEXT_BUTTON_SELECTOR)
            .next()
            .and_then(|button| button.value().attr("href"))
            .map(str::to_string);

        ListingPage {
            logged_in_as,
            notice: notice_message(&document),
            end_of_gallery: document.select(&NO_IMAGES_SELECTOR).next().is_some(),
            items,
            next_href,
        }
    }
}
