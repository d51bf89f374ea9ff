//! Local rule file and bootstrap loading

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bl_compiler::parse_rule_list;
use bl_core::RuleSet;
use tempfile::NamedTempFile;

use crate::error::{BlacklistError, PersistError};

/// Where the initial rule set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Local(PathBuf),
    Bundled,
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Bundled => f.write_str("bundled rules"),
        }
    }
}

/// The local copy of the rule list. The path may be unknown.
#[derive(Debug, Clone)]
pub struct RuleFile {
    path: Option<PathBuf>,
}

impl RuleFile {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the file, returning its text and path.
    pub fn read(&self) -> io::Result<(String, &Path)> {
        let path = self.path().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "null path (upload dir and base path both unset)",
            )
        })?;
        let text = fs::read_to_string(path)?;
        Ok((text, path))
    }

    /// Replace the file with `text`, creating parent directories.
    ///
    /// The text is staged in a temporary file next to the target and renamed
    /// over it, so the file is either the old list or the complete new one.
    /// Returns `Ok(false)` without touching the disk when no path is known.
    pub fn persist(&self, text: &str) -> Result<bool, PersistError> {
        let Some(path) = self.path() else {
            log::debug!("Not writing blacklist file since directory paths were unset");
            return Ok(false);
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;

        let stage_error = |source| PersistError::Stage {
            path: parent.to_path_buf(),
            source,
        };
        let mut staged = NamedTempFile::new_in(parent).map_err(stage_error)?;
        staged.write_all(text.as_bytes()).map_err(stage_error)?;
        staged.as_file().sync_all().map_err(stage_error)?;

        staged.persist(path).map_err(|e| PersistError::Write {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        Ok(true)
    }
}

/// Load the initial rule set.
///
/// Any failure to read the local file, including having no path at all, falls
/// back to the bundled rules. Parse errors are fatal either way.
pub fn load_initial(rule_file: &RuleFile, bundled: Option<&str>) -> Result<(RuleSet, RuleSource), BlacklistError> {
    let (rule_set, source) = match rule_file.read() {
        Ok((text, path)) => (parse_rule_list(&text)?, RuleSource::Local(path.to_path_buf())),
        Err(e) => {
            log::debug!("Local blacklist unavailable ({e}), using bundled rules");
            let text = bundled.ok_or(BlacklistError::Configuration)?;
            (parse_rule_list(text)?, RuleSource::Bundled)
        }
    };

    log::info!(
        "Loaded blacklist from {}: {} literal rules, {} regex rules",
        source,
        rule_set.literals().len(),
        rule_set.patterns().len()
    );

    Ok((rule_set, source))
}
