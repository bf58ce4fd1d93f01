//! In-memory transport for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor};

use crate::fa::error::{FaError, FaResult};
use crate::fa::sender::{AssetResponse, Transport, checked_page};

/// Serves canned pages and assets and records every URL requested.
#[derive(Default)]
pub(crate) struct MockTransport {
    pages: HashMap<String, (u16, String)>,
    assets: HashMap<String, (u16, Vec<u8>)>,
    requests: RefCell<Vec<String>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, url: &str, html: impl Into<String>) -> Self {
        self.page_with_status(url, 200, html)
    }

    pub(crate) fn page_with_status(mut self, url: &str, status: u16, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (status, html.into()));
        self
    }

    pub(crate) fn asset(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.assets.insert(url.to_string(), (status, body.to_vec()));
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub(crate) fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|requested| *requested == url).count()
    }

    fn not_found(url: &str) -> FaError {
        FaError::Io(io::Error::new(io::ErrorKind::NotFound, format!("no canned response for {url}")))
    }
}

impl Transport for MockTransport {
    fn get_html(&self, url: &str) -> FaResult<String> {
        self.requests.borrow_mut().push(url.to_string());
        let (status, html) = self.pages.get(url).cloned().ok_or_else(|| Self::not_found(url))?;
        checked_page(url, status, html)
    }

    fn get_asset(&self, url: &str) -> FaResult<AssetResponse<'_>> {
        self.requests.borrow_mut().push(url.to_string());
        let (status, body) = self.assets.get(url).ok_or_else(|| Self::not_found(url))?;
        Ok(AssetResponse {
            status: *status,
            content_length: Some(body.len() as u64),
            body: Box::new(Cursor::new(body.as_slice())),
        })
    }
}
