use std::fmt;

use crate::fa::BASE_URL;
use crate::fa::error::{FaError, FaResult};
use crate::fa::models::Category;
use crate::fa::parser::ListingPage;
use crate::fa::sender::Transport;

/// Position in a listing.
///
/// Galleries and scraps are numbered pages. Favorites are keyed by an opaque
/// token the site hands out in each page's "next" control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Cursor {
    Integer(u32),
    /// Everything after `{username}/` in the "next" link, e.g. `1538000000/next`.
    Token(String),
}

impl Cursor {
    /// Interprets the user supplied start position for a category.
    pub(crate) fn parse_start(category: Category, start: &str) -> FaResult<Self> {
        let start = start.trim().trim_matches('/');
        match start.parse::<u32>() {
            Ok(0) => Err(FaError::InvalidStart(start.to_string())),
            Ok(page) => Ok(Cursor::Integer(page)),
            Err(_) if category.uses_token_pagination() && !start.is_empty() => Ok(Cursor::Token(start.to_string())),
            Err(_) => Err(FaError::InvalidStart(start.to_string())),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Integer(page) => write!(f, "{page}"),
            Cursor::Token(token) => f.write_str(token),
        }
    }
}

/// Why a listing stopped producing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminalSignal {
    EndOfGallery,
}

/// The result of reading one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageOutcome {
    /// References found on the page, in page order, and where the next page is.
    /// `next_cursor` is `None` when this was the last page.
    Items {
        references: Vec<String>,
        next_cursor: Option<Cursor>,
    },
    End(TerminalSignal),
}

/// Who the session browses as, read from the first listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoginState {
    LoggedIn(String),
    Guest,
}

/// Walks a user's listing one page at a time.
pub(crate) struct Paginator {
    category: Category,
    username: String,
    folder: Option<String>,
    cursor: Option<Cursor>,
    /// `None` until the first page has been read.
    login: Option<LoginState>,
}

impl Paginator {
    pub(crate) fn new(category: Category, username: &str, folder: Option<&str>, start: Cursor) -> Self {
        Paginator {
            category,
            username: username.to_string(),
            folder: folder.map(|f| f.trim_matches('/').to_string()).filter(|f| !f.is_empty()),
            cursor: Some(start),
            login: None,
        }
    }

    /// The page the next call to [`Paginator::next_page`] will fetch.
    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn login(&self) -> Option<&LoginState> {
        self.login.as_ref()
    }

    /// Listing URL for a cursor.
    ///
    /// Tokens already carry everything after the username, so the folder is
    /// only inserted in front of page numbers.
    pub(crate) fn page_url(&self, cursor: &Cursor) -> String {
        let mut url = format!("{}/{}/{}", BASE_URL, self.category, self.username);
        if let (Cursor::Integer(_), Some(folder)) = (cursor, &self.folder) {
            url.push('/');
            url.push_str(folder);
        }
        url.push('/');
        url.push_str(&cursor.to_string());
        url
    }

    /// Fetches and interprets the current page.
    ///
    /// Returns [`PageOutcome::End`] without a request once a previous page
    /// turned out to be the last one.
    pub(crate) fn next_page<T: Transport>(&mut self, transport: &T) -> FaResult<PageOutcome> {
        let Some(cursor) = self.cursor.clone() else {
            return Ok(PageOutcome::End(TerminalSignal::EndOfGallery));
        };
        info!("Downloading page {}", console::style(&cursor).color256(39).italic());
        let html = transport.get_html(&self.page_url(&cursor))?;
        self.advance(&ListingPage::parse(&html))
    }

    /// Applies a parsed listing page to the paginator's state.
    pub(crate) fn advance(&mut self, page: &ListingPage) -> FaResult<PageOutcome> {
        if self.login.is_none() {
            let login = match &page.logged_in_as {
                Some(account) => {
                    info!("Logged in as {}", console::style(account).color256(39).italic());
                    LoginState::LoggedIn(account.clone())
                }
                None => {
                    warn!("Not logged in, NSFW content is inaccessible");
                    LoginState::Guest
                }
            };
            self.login = Some(login);
        }

        if let Some(message) = &page.notice {
            error!("System message: {}", message);
            self.cursor = None;
            return Err(FaError::SystemMessage(message.clone()));
        }

        if page.end_of_gallery {
            self.cursor = None;
            return Ok(PageOutcome::End(TerminalSignal::EndOfGallery));
        }

        // A page with neither submissions nor the end marker would otherwise be walked forever.
        if page.items.is_empty() {
            warn!("Page has no submissions and no end-of-gallery marker, stopping here");
            self.cursor = None;
            return Ok(PageOutcome::End(TerminalSignal::EndOfGallery));
        }

        let next_cursor = self.next_cursor(page)?;
        trace!("Found {} submissions, next page: {:?}", page.items.len(), next_cursor);
        self.cursor = next_cursor.clone();
        Ok(PageOutcome::Items {
            references: page.items.clone(),
            next_cursor,
        })
    }

    fn next_cursor(&self, page: &ListingPage) -> FaResult<Option<Cursor>> {
        if self.category.uses_token_pagination() {
            return match &page.next_href {
                Some(href) => self.token_from_href(href).map(Some),
                None => Ok(None),
            };
        }
        match &self.cursor {
            Some(Cursor::Integer(page)) => page
                .checked_add(1)
                .map(|next| Some(Cursor::Integer(next)))
                .ok_or_else(|| FaError::InvalidStart(page.to_string())),
            Some(Cursor::Token(token)) => Err(FaError::InvalidStart(token.clone())),
            None => Ok(None),
        }
    }

    /// Extracts the pagination token from a link like `/favorites/alice/1538000000/next`.
    fn token_from_href(&self, href: &str) -> FaResult<Cursor> {
        let needle = format!("{}/", self.username.to_ascii_lowercase());
        let position = href
            .to_ascii_lowercase()
            .rfind(&needle)
            .ok_or_else(|| FaError::ParseError {
                field: "next page",
                value: href.to_string(),
            })?;
        let token = href[position + needle.len()..].trim_matches('/');
        if token.is_empty() {
            return Err(FaError::ParseError {
                field: "next page",
                value: href.to_string(),
            });
        }
        Ok(Cursor::Token(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::fa::sender::mock::MockTransport;

    fn listing(items: &[&str]) -> ListingPage {
        ListingPage {
            items: items.iter().map(|s| s.to_string()).collect(),
            ..ListingPage::default()
        }
    }

    #[rstest]
    #[case(Category::Gallery, "1", Cursor::Integer(1))]
    #[case(Category::Scraps, "12", Cursor::Integer(12))]
    #[case(Category::Favorites, "1", Cursor::Integer(1))]
    #[case(Category::Favorites, "1538000000/next", Cursor::Token("1538000000/next".to_string()))]
    fn test_parse_start(#[case] category: Category, #[case] start: &str, #[case] expected: Cursor) {
        assert_eq!(Cursor::parse_start(category, start).unwrap(), expected);
    }

    #[rstest]
    #[case(Category::Gallery, "abc")]
    #[case(Category::Gallery, "0")]
    #[case(Category::Favorites, "")]
    fn test_parse_start_rejects(#[case] category: Category, #[case] start: &str) {
        assert!(matches!(Cursor::parse_start(category, start), Err(FaError::InvalidStart(_))));
    }

    #[test]
    fn test_page_urls() {
        let paginator = Paginator::new(Category::Gallery, "alice", Some("/folder/123/Sketches/"), Cursor::Integer(3));
        assert_eq!(
            paginator.page_url(&Cursor::Integer(3)),
            "https://www.furaffinity.net/gallery/alice/folder/123/Sketches/3"
        );

        let paginator = Paginator::new(Category::Favorites, "alice", None, Cursor::Integer(1));
        assert_eq!(
            paginator.page_url(&Cursor::Token("1538000000/next".to_string())),
            "https://www.furaffinity.net/favorites/alice/1538000000/next"
        );
    }

    #[test]
    fn test_numbered_pages_advance_by_one() {
        let mut paginator = Paginator::new(Category::Gallery, "alice", None, Cursor::Integer(4));
        let outcome = paginator.advance(&listing(&["/view/1/", "/view/2/"])).unwrap();
        assert_eq!(
            outcome,
            PageOutcome::Items {
                references: vec!["/view/1/".to_string(), "/view/2/".to_string()],
                next_cursor: Some(Cursor::Integer(5)),
            }
        );
        assert_eq!(paginator.cursor(), Some(&Cursor::Integer(5)));
    }

    #[test]
    fn test_favorites_follow_page_token() {
        let mut paginator = Paginator::new(Category::Favorites, "Alice", None, Cursor::Integer(1));
        let mut page = listing(&["/view/9/"]);
        page.next_href = Some("/favorites/alice/1538000000/next".to_string());
        paginator.advance(&page).unwrap();
        assert_eq!(paginator.cursor(), Some(&Cursor::Token("1538000000/next".to_string())));

        page.next_href = Some("/favorites/alice/1400000000/next".to_string());
        paginator.advance(&page).unwrap();
        assert_eq!(paginator.cursor(), Some(&Cursor::Token("1400000000/next".to_string())));
    }

    #[test]
    fn test_favorites_without_next_control_end() {
        let transport = MockTransport::new().page(
            "https://www.furaffinity.net/favorites/alice/1",
            "<figure><a href=\"/view/9/\"></a></figure>",
        );
        let mut paginator = Paginator::new(Category::Favorites, "alice", None, Cursor::Integer(1));

        let first = paginator.next_page(&transport).unwrap();
        assert_eq!(
            first,
            PageOutcome::Items {
                references: vec!["/view/9/".to_string()],
                next_cursor: None,
            }
        );
        assert_eq!(
            paginator.next_page(&transport).unwrap(),
            PageOutcome::End(TerminalSignal::EndOfGallery)
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_login_read_from_first_page_only() {
        let mut paginator = Paginator::new(Category::Gallery, "alice", None, Cursor::Integer(1));
        assert_eq!(paginator.login(), None);

        let mut page = listing(&["/view/1/"]);
        page.logged_in_as = Some("bob".to_string());
        paginator.advance(&page).unwrap();
        assert_eq!(paginator.login(), Some(&LoginState::LoggedIn("bob".to_string())));

        page.logged_in_as = None;
        paginator.advance(&page).unwrap();
        assert_eq!(paginator.login(), Some(&LoginState::LoggedIn("bob".to_string())));
    }

    #[test]
    fn test_guest_session() {
        let mut paginator = Paginator::new(Category::Scraps, "alice", None, Cursor::Integer(1));
        paginator.advance(&listing(&["/view/1/"])).unwrap();
        let mut page = listing(&["/view/2/"]);
        page.logged_in_as = Some("bob".to_string());
        paginator.advance(&page).unwrap();
        assert_eq!(paginator.login(), Some(&LoginState::Guest));
    }

    #[test]
    fn test_last_page_number_does_not_overflow() {
        let start = Cursor::parse_start(Category::Gallery, "4294967295").unwrap();
        let mut paginator = Paginator::new(Category::Gallery, "alice", None, start);
        assert!(matches!(
            paginator.advance(&listing(&["/view/1/"])),
            Err(FaError::InvalidStart(_))
        ));
    }

    #[test]
    fn test_no_images_ends_gallery() {
        let mut paginator = Paginator::new(Category::Scraps, "alice", None, Cursor::Integer(2));
        let page = ListingPage {
            end_of_gallery: true,
            ..ListingPage::default()
        };
        assert_eq!(
            paginator.advance(&page).unwrap(),
            PageOutcome::End(TerminalSignal::EndOfGallery)
        );
        assert_eq!(paginator.cursor(), None);
    }

    #[test]
    fn test_empty_page_without_marker_ends() {
        let mut paginator = Paginator::new(Category::Gallery, "alice", None, Cursor::Integer(7));
        assert_eq!(
            paginator.advance(&listing(&[])).unwrap(),
            PageOutcome::End(TerminalSignal::EndOfGallery)
        );
    }

    #[test]
    fn test_notice_banner_is_fatal() {
        let mut paginator = Paginator::new(Category::Gallery, "ghost", None, Cursor::Integer(1));
        let page = ListingPage {
            notice: Some("The user you are trying to view could not be found.".to_string()),
            items: vec!["/view/1/".to_string()],
            ..ListingPage::default()
        };
        match paginator.advance(&page) {
            Err(FaError::SystemMessage(message)) => {
                assert_eq!(message, "The user you are trying to view could not be found.")
            }
            other => panic!("expected a system message, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_next_control() {
        let mut paginator = Paginator::new(Category::Favorites, "alice", None, Cursor::Integer(1));
        let mut page = listing(&["/view/9/"]);
        page.next_href = Some("/favorites/bob/".to_string());
        assert!(matches!(
            paginator.advance(&page),
            Err(FaError::ParseError { field: "next page", .. })
        ));
    }
}
