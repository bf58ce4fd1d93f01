//! Loading of browser-exported (Netscape format) cookie files.

use std::fs::read_to_string;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Url;
use reqwest::cookie::Jar;

use crate::fa::error::{FaError, FaResult};

/// Prefix curl and browser extensions put in front of HttpOnly cookie lines.
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One line of a Netscape cookie file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NetscapeCookie {
    pub(crate) domain: String,
    pub(crate) include_subdomains: bool,
    pub(crate) path: String,
    pub(crate) secure: bool,
    /// Unix timestamp, `0` for session cookies.
    pub(crate) expires: u64,
    pub(crate) name: String,
    pub(crate) value: String,
}

impl NetscapeCookie {
    pub(crate) fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires < now
    }

    /// The cookie in `Set-Cookie` header form.
    pub(crate) fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            header.push_str("; Domain=");
            header.push_str(&self.domain);
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }

    /// The URL the cookie is registered against.
    fn origin(&self) -> String {
        format!("https://{}{}", self.domain.trim_start_matches('.'), self.path)
    }
}

fn parse_flag(value: &str, line: usize) -> FaResult<bool> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(FaError::Cookies {
            line,
            reason: format!("expected TRUE or FALSE, found \"{value}\""),
        }),
    }
}

/// Parses the contents of a Netscape cookie file.
pub(crate) fn parse_cookie_file(contents: &str) -> FaResult<Vec<NetscapeCookie>> {
    let mut cookies = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim_end_matches('\r');
        let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => rest,
            None if line.trim().is_empty() || line.starts_with('#') => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return Err(FaError::Cookies {
                line: line_number,
                reason: format!("expected 7 tab separated fields, found {}", fields.len()),
            });
        }

        cookies.push(NetscapeCookie {
            domain: fields[0].to_string(),
            include_subdomains: parse_flag(fields[1], line_number)?,
            path: fields[2].to_string(),
            secure: parse_flag(fields[3], line_number)?,
            expires: fields[4].parse().map_err(|_| FaError::Cookies {
                line: line_number,
                reason: format!("invalid expiry \"{}\"", fields[4]),
            })?,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
        });
    }
    Ok(cookies)
}

/// Reads a cookie file into a jar, skipping expired cookies.
///
/// Returns the jar and the number of cookies added to it.
pub(crate) fn load_cookie_jar(path: &Path) -> FaResult<(Jar, usize)> {
    let contents = read_to_string(path)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();

    let jar = Jar::default();
    let mut added = 0;
    for cookie in parse_cookie_file(&contents)? {
        if cookie.is_expired(now) {
            trace!("Skipping expired cookie \"{}\" for {}", cookie.name, cookie.domain);
            continue;
        }
        let url = Url::parse(&cookie.origin()).map_err(|e| FaError::Cookies {
            line: 0,
            reason: format!("invalid cookie domain \"{}\": {}", cookie.domain, e),
        })?;
        jar.add_cookie_str(&cookie.to_set_cookie(), &url);
        added += 1;
    }

    info!("Loaded {} cookies from {}", added, path.display());
    Ok((jar, added))
}
