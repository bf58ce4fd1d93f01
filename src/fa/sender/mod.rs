use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use scraper::Html;

use crate::fa::error::{FaError, FaResult};
use crate::fa::parser::notice_message;

pub(crate) mod cookies;
#[cfg(test)]
pub(crate) mod mock;

/// User agent sent when none is configured.
pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:68.7) Gecko/20100101 Firefox/68.7";

/// A streamed asset response. Non-200 statuses are returned, not raised.
pub(crate) struct AssetResponse<'a> {
    pub(crate) status: u16,
    pub(crate) content_length: Option<u64>,
    pub(crate) body: Box<dyn Read + 'a>,
}

/// The network seam shared by the paginator and the item fetcher.
pub(crate) trait Transport {
    /// Fetches a page as text.
    ///
    /// Transport failures are fatal. An error status is fatal too, unless the
    /// body carries a notice banner; see [`checked_page`].
    fn get_html(&self, url: &str) -> FaResult<String>;

    /// Starts an asset transfer.
    fn get_asset(&self, url: &str) -> FaResult<AssetResponse<'_>>;
}

/// Decides whether a page body is handed on to the parsers.
///
/// Successful pages always are. Pages with an error status are only handed on
/// when they carry a notice banner, so the site's own message is what the user
/// sees; anything else becomes [`FaError::HttpStatus`].
pub(crate) fn checked_page(url: &str, status: u16, body: String) -> FaResult<String> {
    if (200..300).contains(&status) {
        return Ok(body);
    }
    if notice_message(&Html::parse_document(&body)).is_some() {
        debug!("HTTP {} from {} carries a notice banner", status, url);
        return Ok(body);
    }
    Err(FaError::HttpStatus {
        status,
        url: url.to_string(),
    })
}

/// The HTTP session used for a whole run: one blocking client, one cookie store.
#[derive(Clone)]
pub(crate) struct RequestSender {
    client: Client,
    loaded_cookies: usize,
}

impl RequestSender {
    /// Creates a session, optionally seeded from a Netscape cookie file.
    pub(crate) fn new(user_agent: &str, cookie_file: Option<&Path>) -> FaResult<Self> {
        let (jar, loaded_cookies) = match cookie_file {
            Some(path) => {
                let (jar, count) = cookies::load_cookie_jar(path)?;
                (Arc::new(jar), count)
            }
            None => (Arc::new(Jar::default()), 0),
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_provider(jar)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .use_rustls_tls()
            .build()?;

        trace!("Session created with user agent \"{}\" and {} cookies", user_agent, loaded_cookies);
        Ok(RequestSender { client, loaded_cookies })
    }

    /// Number of cookies loaded from the cookie file.
    pub(crate) fn loaded_cookies(&self) -> usize {
        self.loaded_cookies
    }
}

impl Transport for RequestSender {
    fn get_html(&self, url: &str) -> FaResult<String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        checked_page(url, status, response.text()?)
    }

    fn get_asset(&self, url: &str) -> FaResult<AssetResponse<'_>> {
        debug!("GET {} (asset)", url);
        let response = self.client.get(url).send()?;
        Ok(AssetResponse {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}
