use std::fs;
use std::path::{Path, PathBuf};

use crate::fa::error::FaResult;

/// Stands in for every character that can't appear in a path component.
const REPLACEMENT: &str = "_";

/// Where an item's asset and metadata go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ItemPaths {
    pub(crate) asset: PathBuf,
    pub(crate) metadata: PathBuf,
}

/// Manages the output layout: flat, or one subdirectory per author ("tree" mode).
#[derive(Debug, Clone)]
pub(crate) struct DirectoryManager {
    /// Base directory for downloaded assets
    output_dir: PathBuf,
    /// Base directory for metadata files, often the same as `output_dir`
    metadata_dir: PathBuf,
    /// Whether to nest files under a directory named after the author
    tree: bool,
}

impl DirectoryManager {
    pub(crate) fn new(output_dir: impl Into<PathBuf>, metadata_dir: impl Into<PathBuf>, tree: bool) -> Self {
        DirectoryManager {
            output_dir: output_dir.into(),
            metadata_dir: metadata_dir.into(),
            tree,
        }
    }

    pub(crate) fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub(crate) fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// Creates the output and metadata roots if they don't exist yet.
    pub(crate) fn create_directory_structure(&self) -> FaResult<()> {
        for dir in [&self.output_dir, &self.metadata_dir] {
            if !dir.is_dir() {
                info!("Creating directory {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Resolves the asset and metadata paths for one item.
    ///
    /// In tree mode the author's directories are created under both roots
    /// when they are missing, each one checked on its own.
    pub(crate) fn item_paths(&self, author: &str, filename: &str) -> FaResult<ItemPaths> {
        let (asset_dir, metadata_dir) = if self.tree {
            let author_dir = sanitize_filename(author);
            let asset_dir = self.output_dir.join(&author_dir);
            let metadata_dir = self.metadata_dir.join(&author_dir);
            for dir in [&asset_dir, &metadata_dir] {
                if !dir.is_dir() {
                    info!(
                        "Creating directory for {} at {}",
                        console::style(author).color256(39).italic(),
                        dir.display()
                    );
                    fs::create_dir_all(dir)?;
                }
            }
            (asset_dir, metadata_dir)
        } else {
            (self.output_dir.clone(), self.metadata_dir.clone())
        };

        let filename = sanitize_filename(filename);
        Ok(ItemPaths {
            asset: asset_dir.join(&filename),
            metadata: metadata_dir.join(format!("{filename}.json")),
        })
    }
}

/// Turns an untrusted name into a single safe path component.
///
/// Reserved and control characters become `_`, and so do names made only of
/// dots, so the result never walks out of its parent directory.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    let options = ::sanitize_filename::Options {
        truncate: true,
        windows: true,
        replacement: REPLACEMENT,
    };
    let sanitized = ::sanitize_filename::sanitize_with_options(filename, options);
    if sanitized.is_empty() { REPLACEMENT.to_string() } else { sanitized }
}
