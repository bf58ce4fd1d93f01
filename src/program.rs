use std::env::current_dir;
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{CommandFactory, Parser};
use console::Term;

use crate::fa::FaWebConnector;
use crate::fa::fetcher::ItemFetcher;
use crate::fa::grabber::{Cursor, Paginator};
use crate::fa::io::directory::DirectoryManager;
use crate::fa::io::{Config, delay_from_secs};
use crate::fa::models::{Category, validate_username};
use crate::fa::sender::RequestSender;

/// The name of the cargo package.
const NAME: &str = env!("CARGO_PKG_NAME");

/// The version of the cargo package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The authors who created the package.
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

const EXAMPLES: &str = "\
Examples:
  fa_downloader gallery koul
  fa_downloader -o koulsArt gallery koul
  fa_downloader -o mylasFavs favorites mylafox

You can also log in to FurAffinity in a web browser and load cookies to download restricted content:
  fa_downloader -c cookies.txt gallery letodoesart

DISCLAIMER: It is your own responsibility to check whether batch downloading is allowed by FurAffinity terms of service and to abide by them.";

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "fa_downloader",
    version,
    about = "Downloads the entire gallery/scraps/favorites of a furaffinity user",
    after_help = EXAMPLES
)]
pub(crate) struct Cli {
    /// The category to download, gallery/scraps/favorites
    #[arg(default_value = "gallery")]
    category: String,

    /// Username of the furaffinity user
    username: Option<String>,

    /// Gallery folder to download instead of the whole gallery, e.g. "folder/123/Sketches"
    #[arg(short = 'f', long = "folder")]
    folder: Option<String>,

    /// Output directory
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Metadata directory, defaults to the output directory
    #[arg(short = 'm', long = "metadir")]
    metadir: Option<PathBuf>,

    /// Path to a Netscape cookies file
    #[arg(short = 'c', long = "cookies")]
    cookies: Option<PathBuf>,

    /// Your browser's user agent, may be required, depending on your luck
    #[arg(short = 'u', long = "user-agent")]
    user_agent: Option<String>,

    /// Page number to start from (favorites also accept a page token)
    #[arg(short = 's', long = "start", default_value = "1")]
    start: String,

    /// Don't redownload files that already exist in the output directory
    #[arg(short = 'r', long = "skip-existing")]
    skip_existing: bool,

    /// Put files in a subdirectory named after each author
    #[arg(short = 't', long = "tree")]
    tree: bool,

    /// Seconds to wait after each download
    #[arg(short = 'd', long = "delay")]
    delay: Option<f64>,

    /// Settings file, defaults to fa_downloader.json in the working directory
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Log debug output to the terminal
    #[arg(short = 'v', long = "verbose")]
    pub(crate) verbose: bool,
}

/// A program class that handles the flow of the downloader and steps of execution.
pub(crate) struct Program {
    cli: Cli,
}

impl Program {
    pub(crate) fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Runs the downloader program.
    pub(crate) fn run(&self) -> Result<(), Error> {
        Term::stdout().set_title("FurAffinity downloader");
        trace!("Starting {}...", NAME);
        trace!("Program Version: {}", VERSION);
        trace!("Program Authors: {}", AUTHORS);
        let working_dir = current_dir().context("Failed to get working directory")?;
        trace!("Program Working Directory: {}", working_dir.display());

        let Some(username) = self.cli.username.as_deref() else {
            Cli::command().print_help()?;
            return Ok(());
        };

        // Everything below is checked before the first request goes out.
        let category: Category = self.cli.category.parse()?;
        validate_username(username)?;
        let start = Cursor::parse_start(category, &self.cli.start)?;

        let config = Config::load(self.cli.config.as_deref())?;
        let output_dir = self
            .cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(config.output_directory()));
        let metadata_dir = self
            .cli
            .metadir
            .clone()
            .or_else(|| config.metadata_directory().map(PathBuf::from))
            .unwrap_or_else(|| output_dir.clone());
        let cookie_file = self
            .cli
            .cookies
            .clone()
            .or_else(|| config.cookie_file().map(PathBuf::from));
        let user_agent = self.cli.user_agent.as_deref().unwrap_or(config.user_agent());
        let delay = match self.cli.delay {
            Some(seconds) => delay_from_secs(seconds)?,
            None => config.delay()?,
        };
        let skip_existing = self.cli.skip_existing || config.skip_existing();
        let tree = self.cli.tree || config.tree();

        trace!("Category: {}, username: {}, start: {}", category, username, start);
        trace!("Skip existing: {}, tree: {}, delay: {:?}", skip_existing, tree, delay);

        let directories = DirectoryManager::new(output_dir, metadata_dir, tree);
        trace!(
            "Output: {}, metadata: {}",
            directories.output_dir().display(),
            directories.metadata_dir().display()
        );
        directories
            .create_directory_structure()
            .context("Failed to create output directories")?;

        let request_sender = RequestSender::new(user_agent, cookie_file.as_deref())?;
        if request_sender.loaded_cookies() == 0 {
            trace!("No cookies loaded, browsing as a guest");
        }

        let paginator = Paginator::new(category, username, self.cli.folder.as_deref(), start);
        let fetcher = ItemFetcher::new(directories, skip_existing, delay, config.show_progress());
        let mut connector = FaWebConnector::new(&request_sender, paginator, fetcher);
        let summary = connector.download_all()?;

        info!(
            "Finished downloading: {} downloaded ({} bytes), {} skipped, {} failed",
            summary.downloaded, summary.bytes, summary.skipped, summary.failed
        );
        Ok(())
    }
}
