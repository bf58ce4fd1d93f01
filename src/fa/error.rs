use std::io;

use thiserror::Error;

/// Errors raised while crawling a gallery.
///
/// Everything here ends the run, with the exception of a non-200 asset
/// response, which never becomes an error and is reported as
/// [`DownloadOutcome::Failed`](crate::fa::models::DownloadOutcome::Failed) instead.
#[derive(Error, Debug)]
pub(crate) enum FaError {
    #[error("Category is not valid: {0} (expected gallery, scraps or favorites)")]
    InvalidCategory(String),

    #[error("Username contains non-valid characters: {0}")]
    InvalidUsername(String),

    #[error("Start page is not valid for this category: {0}")]
    InvalidStart(String),

    /// A notice banner rendered by the site, surfaced verbatim.
    #[error("{0}")]
    SystemMessage(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("failed to parse field '{field}', found value: {value}")]
    ParseError { field: &'static str, value: String },

    #[error("Got a HTTP {status} while fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cookie file error on line {line}: {reason}")]
    Cookies { line: usize, reason: String },
}

pub(crate) type FaResult<T> = Result<T, FaError>;
