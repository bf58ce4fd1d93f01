use crate::fa::error::FaResult;
use crate::fa::fetcher::ItemFetcher;
use crate::fa::grabber::{PageOutcome, Paginator, TerminalSignal};
use crate::fa::models::DownloadOutcome;
use crate::fa::sender::Transport;

pub(crate) mod error;
pub(crate) mod fetcher;
pub(crate) mod grabber;
pub(crate) mod io;
pub(crate) mod models;
pub(crate) mod parser;
pub(crate) mod sender;
pub(crate) mod tui;

/// The site every request goes to.
pub(crate) const BASE_URL: &str = "https://www.furaffinity.net";

/// What a finished crawl did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CrawlSummary {
    pub(crate) signal: TerminalSignal,
    pub(crate) downloaded: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
    /// Asset bytes written during this run.
    pub(crate) bytes: u64,
}

impl CrawlSummary {
    fn new() -> Self {
        CrawlSummary {
            signal: TerminalSignal::EndOfGallery,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            bytes: 0,
        }
    }

    fn record(&mut self, reference: &str, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { path, bytes } => {
                trace!("{} saved to {} ({} bytes)", reference, path.display(), bytes);
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::Skipped { path } => {
                trace!("{} already at {}", reference, path.display());
                self.skipped += 1;
            }
            DownloadOutcome::Failed { status } => {
                trace!("{} failed with HTTP {}, continuing", reference, status);
                self.failed += 1;
            }
        }
    }
}

/// Drives a crawl: each listing page is fully downloaded before the next one is requested.
pub(crate) struct FaWebConnector<'a, T: Transport> {
    /// The session every request goes through.
    transport: &'a T,
    paginator: Paginator,
    fetcher: ItemFetcher,
}

impl<'a, T: Transport> FaWebConnector<'a, T> {
    pub(crate) fn new(transport: &'a T, paginator: Paginator, fetcher: ItemFetcher) -> Self {
        FaWebConnector {
            transport,
            paginator,
            fetcher,
        }
    }

    /// Walks the listing until it ends.
    ///
    /// Stops at the first fatal error. Failed asset transfers are counted in
    /// the summary and the walk carries on.
    pub(crate) fn download_all(&mut self) -> FaResult<CrawlSummary> {
        let mut summary = CrawlSummary::new();
        loop {
            match self.paginator.next_page(self.transport)? {
                PageOutcome::End(signal) => {
                    info!("End of gallery");
                    summary.signal = signal;
                    return Ok(summary);
                }
                PageOutcome::Items { references, next_cursor } => {
                    for reference in &references {
                        let outcome = self.fetcher.fetch(self.transport, reference)?;
                        summary.record(reference, &outcome);
                    }
                    match next_cursor {
                        Some(cursor) => trace!("Page done, continuing at {}", cursor),
                        None => trace!("Page done, no further pages"),
                    }
                }
            }
        }
    }
}
