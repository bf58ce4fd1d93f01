use std::fs::{File, write};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;

use crate::fa::BASE_URL;
use crate::fa::error::{FaError, FaResult};
use crate::fa::io::directory::DirectoryManager;
use crate::fa::models::{DownloadOutcome, ItemRecord};
use crate::fa::parser::ItemPage;
use crate::fa::sender::Transport;
use crate::fa::tui::transfer_bar;

/// Downloads single submissions: metadata first, then the asset.
pub(crate) struct ItemFetcher {
    directories: DirectoryManager,
    /// Leave assets that already exist on disk alone.
    skip_existing: bool,
    /// Pause after every transferred asset.
    delay: Duration,
    show_progress: bool,
}

impl ItemFetcher {
    pub(crate) fn new(directories: DirectoryManager, skip_existing: bool, delay: Duration, show_progress: bool) -> Self {
        ItemFetcher {
            directories,
            skip_existing,
            delay,
            show_progress,
        }
    }

    /// Fetches one submission by its relative path (e.g. `/view/100/`).
    ///
    /// Only a non-200 answer on the asset itself is tolerated; it comes back as
    /// [`DownloadOutcome::Failed`]. Everything else that goes wrong is an error.
    pub(crate) fn fetch<T: Transport>(&self, transport: &T, reference: &str) -> FaResult<DownloadOutcome> {
        let id = item_id(reference)?;
        trace!("Fetching submission {} from {}", id, reference);
        let page = ItemPage::parse(&transport.get_html(&item_url(reference))?)?;
        let asset_url = page.asset_url.clone();
        let record = build_record(id, filename_from_url(&asset_url)?, page);

        let paths = self.directories.item_paths(&record.author, &record.filename)?;
        write_metadata(&paths.metadata, &record)?;

        if self.skip_existing && paths.asset.exists() {
            info!(
                "Skipping {}, already downloaded",
                console::style(format!("\"{}\"", record.filename)).color256(39).italic()
            );
            return Ok(DownloadOutcome::Skipped { path: paths.asset });
        }

        let outcome = self.download_asset(transport, &asset_url, &paths.asset, &record.title)?;
        if let Some(delay) = self.pause_after(&outcome) {
            trace!("Sleeping for {:?}", delay);
            sleep(delay);
        }
        Ok(outcome)
    }

    /// Only completed transfers are followed by the configured pause.
    fn pause_after(&self, outcome: &DownloadOutcome) -> Option<Duration> {
        match outcome {
            DownloadOutcome::Downloaded { .. } if !self.delay.is_zero() => Some(self.delay),
            _ => None,
        }
    }

    fn download_asset<T: Transport>(&self, transport: &T, url: &str, path: &Path, title: &str) -> FaResult<DownloadOutcome> {
        let response = transport.get_asset(url)?;
        if response.status != 200 {
            warn!("Got a HTTP {} while downloading {}; skipping", response.status, url);
            return Ok(DownloadOutcome::Failed { status: response.status });
        }

        let progress_bar = transfer_bar(title, response.content_length, self.show_progress);
        let mut file = BufWriter::new(File::create(path)?);
        let bytes = io::copy(&mut progress_bar.wrap_read(response.body), &mut file)?;
        file.flush()?;
        progress_bar.finish_and_clear();

        info!(
            "Downloaded {} ({} bytes)",
            console::style(format!("\"{}\"", path.display())).color256(39).italic(),
            bytes
        );
        Ok(DownloadOutcome::Downloaded {
            path: path.to_path_buf(),
            bytes,
        })
    }
}

/// Absolute URL of a submission page.
fn item_url(reference: &str) -> String {
    if reference.starts_with("http") {
        reference.to_string()
    } else {
        format!("{BASE_URL}{reference}")
    }
}

/// The submission id is the last path segment of `/view/<id>/`.
pub(crate) fn item_id(reference: &str) -> FaResult<u64> {
    let segment = reference
        .split('/')
        .rfind(|segment| !segment.is_empty())
        .unwrap_or_default();
    segment.parse::<u64>().map_err(|_| FaError::ParseError {
        field: "id",
        value: reference.to_string(),
    })
}

/// The on-disk name of an asset is the final segment of its URL.
pub(crate) fn filename_from_url(url: &str) -> FaResult<String> {
    match url.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(FaError::ParseError {
            field: "filename",
            value: url.to_string(),
        }),
    }
}

fn build_record(id: u64, filename: String, page: ItemPage) -> ItemRecord {
    ItemRecord {
        id,
        filename,
        author: page.author,
        date: page.date,
        title: page.title,
        description: page.description,
        category: page.category,
        kind: page.kind,
        species: page.species,
        gender: page.gender,
        views: page.views,
        favorites: page.favorites,
        rating: page.rating,
        tags: page.tags,
        comments: page.comments,
    }
}

/// Serializes a record as 4-space indented UTF-8 JSON.
pub(crate) fn metadata_json(record: &ItemRecord) -> FaResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    record.serialize(&mut serializer)?;
    Ok(buffer)
}

fn write_metadata(path: &Path, record: &ItemRecord) -> FaResult<()> {
    write(path, metadata_json(record)?)?;
    trace!("Wrote metadata to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::read;

    use super::*;
    use crate::fa::parser::item::tests::submission_html;
    use crate::fa::sender::mock::MockTransport;

    const ASSET_URL: &str = "https://d.furaffinity.net/art/alice/1600000000/1600000000.alice_100.png";

    fn transport(asset_status: u16) -> MockTransport {
        MockTransport::new()
            .page(
                "https://www.furaffinity.net/view/100/",
                submission_html("//d.furaffinity.net/art/alice/1600000000/1600000000.alice_100.png", "alice", "First"),
            )
            .asset(ASSET_URL, asset_status, b"\x89PNG fake image")
    }

    fn fetcher(root: &Path, skip_existing: bool, tree: bool) -> ItemFetcher {
        ItemFetcher::new(DirectoryManager::new(root, root, tree), skip_existing, Duration::ZERO, false)
    }

    #[test]
    fn test_item_id_comes_from_path() {
        assert_eq!(item_id("/view/100/").unwrap(), 100);
        assert_eq!(item_id("/view/42").unwrap(), 42);
        assert!(matches!(item_id("/view/abc/"), Err(FaError::ParseError { field: "id", .. })));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url(ASSET_URL).unwrap(), "1600000000.alice_100.png");
        assert!(filename_from_url("https://d.furaffinity.net/art/").is_err());
    }

    #[test]
    fn test_fetch_writes_asset_and_metadata() {
        let root = tempfile::tempdir().unwrap();
        let transport = transport(200);
        let outcome = fetcher(root.path(), false, false).fetch(&transport, "/view/100/").unwrap();

        let asset = root.path().join("1600000000.alice_100.png");
        assert_eq!(outcome, DownloadOutcome::Downloaded { path: asset.clone(), bytes: 15 });
        assert_eq!(read(&asset).unwrap(), b"\x89PNG fake image");

        let metadata = std::fs::read_to_string(root.path().join("1600000000.alice_100.png.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(value["id"], 100);
        assert_eq!(value["filename"], "1600000000.alice_100.png");
        assert_eq!(value["type"], "General Furry Art");
        assert_eq!(value["comments"][1]["parent_cid"], 10);
        assert_eq!(value["comments"][0]["parent_cid"], serde_json::Value::Null);
        assert!(metadata.contains("ünïcødé ✨"));
        assert!(metadata.starts_with("{\n    \"id\": 100,"));
    }

    #[test]
    fn test_id_ignores_page_body() {
        let root = tempfile::tempdir().unwrap();
        let html = submission_html("//d.furaffinity.net/art/alice/1/999.png", "alice", "/view/999/");
        let transport = MockTransport::new()
            .page("https://www.furaffinity.net/view/100/", html)
            .asset("https://d.furaffinity.net/art/alice/1/999.png", 200, b"x");
        fetcher(root.path(), false, false).fetch(&transport, "/view/100/").unwrap();

        let metadata = std::fs::read_to_string(root.path().join("999.png.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(value["id"], 100);
    }

    #[test]
    fn test_skip_existing_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let transport = transport(200);
        let fetcher = fetcher(root.path(), true, false);
        let metadata_path = root.path().join("1600000000.alice_100.png.json");

        let first = fetcher.fetch(&transport, "/view/100/").unwrap();
        assert!(matches!(first, DownloadOutcome::Downloaded { .. }));
        let first_metadata = read(&metadata_path).unwrap();

        let second = fetcher.fetch(&transport, "/view/100/").unwrap();
        assert_eq!(
            second,
            DownloadOutcome::Skipped {
                path: root.path().join("1600000000.alice_100.png")
            }
        );
        assert_eq!(read(&metadata_path).unwrap(), first_metadata);
        assert_eq!(transport.request_count(ASSET_URL), 1);
        assert_eq!(transport.request_count("https://www.furaffinity.net/view/100/"), 2);
    }

    #[test]
    fn test_redownload_without_skip_mode() {
        let root = tempfile::tempdir().unwrap();
        let transport = transport(200);
        let fetcher = fetcher(root.path(), false, false);
        fetcher.fetch(&transport, "/view/100/").unwrap();
        fetcher.fetch(&transport, "/view/100/").unwrap();
        assert_eq!(transport.request_count(ASSET_URL), 2);
    }

    #[test]
    fn test_failed_transfer_keeps_metadata() {
        let root = tempfile::tempdir().unwrap();
        let transport = transport(404);
        let outcome = fetcher(root.path(), false, false).fetch(&transport, "/view/100/").unwrap();

        assert_eq!(outcome, DownloadOutcome::Failed { status: 404 });
        assert!(root.path().join("1600000000.alice_100.png.json").is_file());
        assert!(!root.path().join("1600000000.alice_100.png").exists());
    }

    #[test]
    fn test_pause_follows_downloads_only() {
        let root = tempfile::tempdir().unwrap();
        let delay = Duration::from_millis(5);
        let fetcher = ItemFetcher::new(DirectoryManager::new(root.path(), root.path(), false), true, delay, false);

        let downloaded = DownloadOutcome::Downloaded {
            path: root.path().join("1.png"),
            bytes: 1,
        };
        assert_eq!(fetcher.pause_after(&downloaded), Some(delay));
        assert_eq!(fetcher.pause_after(&DownloadOutcome::Failed { status: 404 }), None);
        assert_eq!(
            fetcher.pause_after(&DownloadOutcome::Skipped {
                path: root.path().join("1.png")
            }),
            None
        );

        let no_delay = ItemFetcher::new(DirectoryManager::new(root.path(), root.path(), false), false, Duration::ZERO, false);
        assert_eq!(no_delay.pause_after(&downloaded), None);
    }

    #[test]
    fn test_download_waits_for_delay() {
        let root = tempfile::tempdir().unwrap();
        let transport = transport(200);
        let delay = Duration::from_millis(50);
        let fetcher = ItemFetcher::new(DirectoryManager::new(root.path(), root.path(), false), false, delay, false);

        let started = std::time::Instant::now();
        fetcher.fetch(&transport, "/view/100/").unwrap();
        assert!(started.elapsed() >= delay);
    }

    #[test]
    fn test_error_status_page_with_banner_surfaces_message() {
        let root = tempfile::tempdir().unwrap();
        let transport = MockTransport::new().page_with_status(
            "https://www.furaffinity.net/view/100/",
            404,
            r#"<div class="notice-message"><div><h2>System Message</h2>The submission you are trying to find is not in our database.</div></div>"#,
        );
        match fetcher(root.path(), false, false).fetch(&transport, "/view/100/") {
            Err(FaError::SystemMessage(message)) => {
                assert_eq!(message, "The submission you are trying to find is not in our database.")
            }
            other => panic!("expected a system message, got {other:?}"),
        }
    }

    #[test]
    fn test_tree_mode_nests_by_author() {
        let root = tempfile::tempdir().unwrap();
        let transport = transport(200);
        fetcher(root.path(), false, true).fetch(&transport, "/view/100/").unwrap();
        assert!(root.path().join("alice").join("1600000000.alice_100.png").is_file());
        assert!(root.path().join("alice").join("1600000000.alice_100.png.json").is_file());
    }

    #[test]
    fn test_notice_banner_aborts_item() {
        let root = tempfile::tempdir().unwrap();
        let transport = MockTransport::new().page(
            "https://www.furaffinity.net/view/100/",
            r#"<div class="notice-message"><div><h2>System Message</h2>You are not allowed to view this image due to the content filter settings.</div></div>"#,
        );
        match fetcher(root.path(), false, false).fetch(&transport, "/view/100/") {
            Err(FaError::SystemMessage(message)) => assert_eq!(
                message,
                "You are not allowed to view this image due to the content filter settings."
            ),
            other => panic!("expected a system message, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
