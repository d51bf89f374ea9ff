//! Blacklist Update Library
//!
//! Bootstrap, local persistence and conditional HTTP refresh for the
//! comment-spam blacklist.
//!
//! # Modules
//!
//! - `config`: Rule file location and remote source settings
//! - `store`: Local rule file and the bundled fallback
//! - `remote`: `If-Modified-Since` fetch of the master rule list
//! - `controller`: The `Blacklist` handle and its refresh cycle
//! - `error`: Error types

use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

pub mod config;
pub mod controller;
pub mod error;
pub mod remote;
pub mod store;

// Re-export commonly used types
pub use config::{BlacklistConfig, BLACKLIST_FILE, BUNDLED_BLACKLIST, DEFAULT_BLACKLIST_DIR, DEFAULT_BLACKLIST_URL};
pub use controller::{Blacklist, RefreshOutcome};
pub use error::{BlacklistError, FetchError, PersistError, RefreshError};
pub use remote::{FetchOutcome, HttpSource, RemoteSource};
pub use store::{RuleFile, RuleSource};

static BLACKLIST: OnceLock<Blacklist> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
static BOOTSTRAPS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

/// Process-wide blacklist, bootstrapped on first call.
///
/// Later calls return the existing instance and ignore their arguments.
pub fn blacklist(base_path: Option<&Path>, upload_dir: Option<&Path>) -> Result<&'static Blacklist, BlacklistError> {
    init(BlacklistConfig::new(base_path, upload_dir))
}

/// Like [`blacklist`], with full control over the configuration.
///
/// Concurrent first calls bootstrap once; the others wait and share the result.
/// A failed bootstrap leaves the singleton unset so a later call can retry.
pub fn init(config: BlacklistConfig) -> Result<&'static Blacklist, BlacklistError> {
    if let Some(existing) = BLACKLIST.get() {
        return Ok(existing);
    }

    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = BLACKLIST.get() {
        return Ok(existing);
    }

    #[cfg(test)]
    BOOTSTRAPS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let built = Blacklist::new(&config)?;
    Ok(BLACKLIST.get_or_init(|| built))
}

/// The process-wide blacklist, if it has been bootstrapped.
pub fn instance() -> Option<&'static Blacklist> {
    BLACKLIST.get()
}

/// Refresh the process-wide blacklist. Does nothing before bootstrap.
pub fn check_for_update() {
    match BLACKLIST.get() {
        Some(blacklist) => blacklist.check_for_update(),
        None => log::debug!("Blacklist update skipped: not loaded yet"),
    }
}
