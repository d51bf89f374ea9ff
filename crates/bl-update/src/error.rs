use std::io;
use std::path::PathBuf;

use bl_compiler::ParseError;

/// Error fetching the remote rule list.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),
}

/// Error writing the refreshed rule list to local storage.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Failed to create '{}': {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to stage '{}': {source}", .path.display())]
    Stage { path: PathBuf, source: io::Error },
    #[error("Failed to write '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Error type for classifier bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BlacklistError {
    #[error("Unable to load blacklist.txt: no readable local rule file and no bundled rules")]
    Configuration,
    #[error("Failed to parse rule list: {0}")]
    Parse(#[from] ParseError),
}

/// Why a refresh cycle kept the previous rules.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Failed to parse rule list: {0}")]
    Parse(#[from] ParseError),
}
