use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::fa::error::{FaError, FaResult};
use crate::fa::models::CommentRecord;
use crate::fa::parser::{
    ANCHOR_SELECTOR, DIV_SELECTOR, SPAN_SELECTOR, element_text, notice_message, parse_count, required_text,
};

lazy_static! {
    static ref DOWNLOAD_SELECTOR: Selector = Selector::parse(".download a").unwrap();
    static ref TITLE_SELECTOR: Selector = Selector::parse(".submission-title p").unwrap();
    static ref AUTHOR_SELECTOR: Selector = Selector::parse(".submission-id-sub-container a strong").unwrap();
    static ref DATE_SELECTOR: Selector = Selector::parse(".popup_date").unwrap();
    static ref DESCRIPTION_SELECTOR: Selector = Selector::parse(".submission-description").unwrap();
    static ref INFO_SELECTOR: Selector = Selector::parse(".info").unwrap();
    static ref CATEGORY_SELECTOR: Selector = Selector::parse(".category-name").unwrap();
    static ref TYPE_SELECTOR: Selector = Selector::parse(".type-name").unwrap();
    static ref VIEWS_SELECTOR: Selector = Selector::parse(".views .font-large").unwrap();
    static ref FAVORITES_SELECTOR: Selector = Selector::parse(".favorites .font-large").unwrap();
    static ref RATING_SELECTOR: Selector = Selector::parse(".rating-box").unwrap();
    static ref TAGS_ROW_SELECTOR: Selector = Selector::parse(".tags-row").unwrap();
    static ref TAG_SELECTOR: Selector = Selector::parse(".tags").unwrap();
    static ref COMMENT_SELECTOR: Selector = Selector::parse(".comment_container").unwrap();
    static ref COMMENT_LINK_SELECTOR: Selector = Selector::parse(".comment-link").unwrap();
    static ref COMMENT_PARENT_SELECTOR: Selector = Selector::parse(".comment-parent").unwrap();
    static ref COMMENT_TEXT_SELECTOR: Selector = Selector::parse(".comment_text").unwrap();
    static ref COMMENT_USERNAME_SELECTOR: Selector = Selector::parse(".comment_username").unwrap();
}

/// Class of the element wrapping each comment.
const COMMENT_CONTAINER_CLASS: &str = "comment_container";

/// Fields extracted from a submission page.
///
/// The submission id is not part of this; it comes from the submission's
/// own path, not from anything in the markup.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemPage {
    /// Absolute `https` URL of the full-size asset.
    pub(crate) asset_url: String,
    pub(crate) author: String,
    pub(crate) date: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) kind: String,
    pub(crate) species: String,
    pub(crate) gender: String,
    pub(crate) views: u64,
    pub(crate) favorites: u64,
    pub(crate) rating: String,
    pub(crate) tags: Vec<String>,
    pub(crate) comments: Vec<CommentRecord>,
}

impl ItemPage {
    /// Parses a submission page.
    ///
    /// # Errors
    ///
    /// - [`FaError::SystemMessage`] if the page carries a notice banner
    /// - [`FaError::MissingField`] / [`FaError::ParseError`] if a required field is absent or malformed
    pub(crate) fn parse(html: &str) -> FaResult<Self> {
        let document = Html::parse_document(html);
        if let Some(message) = notice_message(&document) {
            return Err(FaError::SystemMessage(message));
        }
        let root = document.root_element();

        let href = root
            .select(&DOWNLOAD_SELECTOR)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .ok_or(FaError::MissingField("download"))?;

        let info = root.select(&INFO_SELECTOR).next().ok_or(FaError::MissingField("info"))?;

        Ok(ItemPage {
            asset_url: resolve_asset_url(href),
            author: required_text(&root, &AUTHOR_SELECTOR, "author")?,
            date: submission_date(&root)?,
            title: required_text(&root, &TITLE_SELECTOR, "title")?,
            description: required_text(&root, &DESCRIPTION_SELECTOR, "description")?.replace("\r\n", "\n"),
            category: required_text(&info, &CATEGORY_SELECTOR, "category")?,
            kind: required_text(&info, &TYPE_SELECTOR, "type")?,
            species: info_row(&info, 2, "species")?,
            gender: info_row(&info, 3, "gender")?,
            views: parse_count(&required_text(&root, &VIEWS_SELECTOR, "views")?, "views")?,
            favorites: parse_count(&required_text(&root, &FAVORITES_SELECTOR, "favorites")?, "favorites")?,
            rating: required_text(&root, &RATING_SELECTOR, "rating")?,
            tags: tags(&root),
            comments: comments(&root)?,
        })
    }
}

/// Turns the download anchor's `href` into an absolute URL.
///
/// The site emits scheme-relative links (`//d.furaffinity.net/...`).
pub(crate) fn resolve_asset_url(href: &str) -> String {
    if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{}{href}", crate::fa::BASE_URL)
    } else {
        href.to_string()
    }
}

fn has_comment_ancestor(element: &ElementRef) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| el.classes().any(|class| class == COMMENT_CONTAINER_CLASS))
    })
}

/// The submission's own date, skipping the dates attached to comments.
fn submission_date(root: &ElementRef) -> FaResult<String> {
    root.select(&DATE_SELECTOR)
        .filter(|el| !has_comment_ancestor(el))
        .find_map(|el| el.value().attr("title"))
        .map(str::to_string)
        .ok_or(FaError::MissingField("date"))
}

/// The `span` of the nth `div` inside the info block (species, gender).
fn info_row(info: &ElementRef, index: usize, field: &'static str) -> FaResult<String> {
    let row = info.select(&DIV_SELECTOR).nth(index).ok_or(FaError::MissingField(field))?;
    required_text(&row, &SPAN_SELECTOR, field)
}

fn tags(root: &ElementRef) -> Vec<String> {
    let Some(row) = root.select(&TAGS_ROW_SELECTOR).next() else {
        return Vec::new();
    };
    row.select(&TAG_SELECTOR)
        .filter_map(|tag| tag.select(&ANCHOR_SELECTOR).next())
        .map(|anchor| element_text(&anchor).trim().to_string())
        .collect()
}

/// Parses `#cid:12345` style comment anchors.
fn comment_id(anchor: &ElementRef, field: &'static str) -> FaResult<u64> {
    let href = anchor.value().attr("href").ok_or(FaError::MissingField(field))?;
    let id = href.rsplit(':').next().unwrap_or_default();
    id.parse::<u64>().map_err(|_| FaError::ParseError {
        field,
        value: href.to_string(),
    })
}

fn comments(root: &ElementRef) -> FaResult<Vec<CommentRecord>> {
    let mut comments = Vec::new();
    for container in root.select(&COMMENT_SELECTOR) {
        // Deleted and hidden comments have no permalink.
        let Some(link) = container.select(&COMMENT_LINK_SELECTOR).next() else {
            continue;
        };
        let parent_cid = match container.select(&COMMENT_PARENT_SELECTOR).next() {
            Some(parent) => Some(comment_id(&parent, "comment parent")?),
            None => None,
        };
        let date = container
            .select(&DATE_SELECTOR)
            .find_map(|el| el.value().attr("title"))
            .ok_or(FaError::MissingField("comment date"))?;
        comments.push(CommentRecord {
            cid: comment_id(&link, "comment link")?,
            parent_cid,
            content: required_text(&container, &COMMENT_TEXT_SELECTOR, "comment text")?,
            username: required_text(&container, &COMMENT_USERNAME_SELECTOR, "comment username")?,
            date: date.to_string(),
        });
    }
    Ok(comments)
}
