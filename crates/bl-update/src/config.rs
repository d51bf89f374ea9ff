use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed name of the rule file, locally and in the bundle.
pub const BLACKLIST_FILE: &str = "blacklist.txt";

/// Sub-directory of the base path used when no upload directory is set.
pub const DEFAULT_BLACKLIST_DIR: &str = "resources";

/// Master copy of the MT-Blacklist rule list.
pub const DEFAULT_BLACKLIST_URL: &str = "http://www.jayallen.org/comment_spam/blacklist.txt";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rule list shipped with the crate, used when no local file can be read.
pub const BUNDLED_BLACKLIST: &str = include_str!("../resources/blacklist.txt");

/// Classifier configuration.
#[derive(Clone)]
pub struct BlacklistConfig {
    /// Directory holding `blacklist.txt`; blank counts as unset.
    pub upload_dir: Option<PathBuf>,
    /// Application base path; the file lives under `resources/` there.
    pub base_path: Option<PathBuf>,
    pub remote_url: String,
    pub timeout: Duration,
    pub bundled: Option<&'static str>,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            upload_dir: None,
            base_path: None,
            remote_url: DEFAULT_BLACKLIST_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            bundled: Some(BUNDLED_BLACKLIST),
        }
    }
}

impl BlacklistConfig {
    pub fn new(base_path: Option<&Path>, upload_dir: Option<&Path>) -> Self {
        Self {
            upload_dir: upload_dir.map(Path::to_path_buf),
            base_path: base_path.map(Path::to_path_buf),
            ..Self::default()
        }
    }

    pub fn rule_file_path(&self) -> Option<PathBuf> {
        resolve_rule_file(self.upload_dir.as_deref(), self.base_path.as_deref())
    }
}

/// `upload_dir/blacklist.txt`, else `base_path/resources/blacklist.txt`.
pub fn resolve_rule_file(upload_dir: Option<&Path>, base_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = upload_dir.filter(|dir| !is_blank(dir)) {
        return Some(dir.join(BLACKLIST_FILE));
    }

    base_path.map(|base| base.join(DEFAULT_BLACKLIST_DIR).join(BLACKLIST_FILE))
}

fn is_blank(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}
