use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::fa::error::{FaError, FaResult};

lazy_static! {
    /// Characters the site allows in usernames.
    static ref USERNAME_PATTERN: Regex = Regex::new(r"^[a-zA-Z0-9\-~._]+$").unwrap();
}

/// Rejects usernames the site could never serve, before any request is made.
pub(crate) fn validate_username(username: &str) -> FaResult<()> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(())
    } else {
        Err(FaError::InvalidUsername(username.to_string()))
    }
}

/// The listing a crawl walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Category {
    Gallery,
    Scraps,
    Favorites,
}

impl Category {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Category::Gallery => "gallery",
            Category::Scraps => "scraps",
            Category::Favorites => "favorites",
        }
    }

    /// Favorites are paginated by an opaque token instead of a page number.
    pub(crate) fn uses_token_pagination(&self) -> bool {
        matches!(self, Category::Favorites)
    }
}

impl FromStr for Category {
    type Err = FaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gallery" => Ok(Category::Gallery),
            "scraps" => Ok(Category::Scraps),
            "favorites" => Ok(Category::Favorites),
            _ => Err(FaError::InvalidCategory(s.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one submission, written next to the asset as JSON.
///
/// Field order is the key order of the written file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ItemRecord {
    pub(crate) id: u64,
    pub(crate) filename: String,
    pub(crate) author: String,
    pub(crate) date: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) species: String,
    pub(crate) gender: String,
    pub(crate) views: u64,
    pub(crate) favorites: u64,
    pub(crate) rating: String,
    pub(crate) tags: Vec<String>,
    pub(crate) comments: Vec<CommentRecord>,
}

/// A visible comment on a submission. `parent_cid` is `None` for top-level comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CommentRecord {
    pub(crate) cid: u64,
    pub(crate) parent_cid: Option<u64>,
    pub(crate) content: String,
    pub(crate) username: String,
    pub(crate) date: String,
}

/// What happened to a single item's asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// The asset request answered with something other than 200.
    Failed { status: u16 },
    /// Skip mode was on and the asset already existed.
    Skipped { path: PathBuf },
}
