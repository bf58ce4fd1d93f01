use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Error, bail};
use serde::{Deserialize, Serialize};
use serde_json::from_str;

use crate::fa::sender::DEFAULT_USER_AGENT;

pub(crate) mod directory;

/// Name of the settings file looked up in the working directory.
pub(crate) const CONFIG_NAME: &str = "fa_downloader.json";

/// Settings read from the optional JSON settings file.
///
/// Every key may be left out. Command line flags take precedence over these.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Config {
    /// User agent sent with every request.
    #[serde(rename = "userAgent", default = "default_user_agent")]
    user_agent: String,
    /// Where assets are saved.
    #[serde(rename = "outputDirectory", default = "default_output_directory")]
    output_directory: String,
    /// Where metadata files are saved, defaults to the output directory.
    #[serde(rename = "metadataDirectory", default)]
    metadata_directory: Option<String>,
    /// Netscape cookie file exported from a logged in browser.
    #[serde(rename = "cookieFile", default)]
    cookie_file: Option<String>,
    /// Pause after each downloaded asset.
    #[serde(rename = "delaySeconds", default)]
    delay_seconds: f64,
    #[serde(rename = "skipExisting", default)]
    skip_existing: bool,
    #[serde(rename = "tree", default)]
    tree: bool,
    #[serde(rename = "showProgress", default = "default_show_progress")]
    show_progress: bool,
}

fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_output_directory() -> String { ".".to_string() }
fn default_show_progress() -> bool { true }

impl Config {
    pub(crate) fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) fn output_directory(&self) -> &str {
        &self.output_directory
    }

    pub(crate) fn metadata_directory(&self) -> Option<&str> {
        self.metadata_directory.as_deref()
    }

    pub(crate) fn cookie_file(&self) -> Option<&str> {
        self.cookie_file.as_deref()
    }

    pub(crate) fn skip_existing(&self) -> bool {
        self.skip_existing
    }

    pub(crate) fn tree(&self) -> bool {
        self.tree
    }

    pub(crate) fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// The configured delay between downloads.
    pub(crate) fn delay(&self) -> Result<Duration, Error> {
        delay_from_secs(self.delay_seconds)
    }

    /// Loads the settings file.
    ///
    /// An explicitly given path must exist. Without one, [`CONFIG_NAME`] in the
    /// working directory is used when present and defaults otherwise.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(path) => path,
            None if Path::new(CONFIG_NAME).exists() => Path::new(CONFIG_NAME),
            None => {
                trace!("{}: does not exist, using defaults", CONFIG_NAME);
                return Ok(Config::default());
            }
        };

        let contents = read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        trace!("Loaded settings from {}", path.display());
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_agent: default_user_agent(),
            output_directory: default_output_directory(),
            metadata_directory: None,
            cookie_file: None,
            delay_seconds: 0.0,
            skip_existing: false,
            tree: false,
            show_progress: default_show_progress(),
        }
    }
}

/// Converts a delay in seconds, rejecting negative and non-finite values.
pub(crate) fn delay_from_secs(seconds: f64) -> Result<Duration, Error> {
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("Delay must be a non-negative number of seconds, found {}", seconds);
    }
    Ok(Duration::from_secs_f64(seconds))
}
