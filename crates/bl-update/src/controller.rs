//! Active rule set and refresh protocol
//!
//! The active `RuleSet` sits behind an `ArcSwap`. Readers take a snapshot
//! without locking; a refresh builds a complete new set and publishes it with
//! a single store, so nobody ever sees half of an update.

use std::path::Path;
use std::sync::{Arc, Mutex, TryLockError};

use arc_swap::ArcSwap;
use bl_compiler::parse_rule_list;
use bl_core::{Freshness, RuleSet};

use crate::config::BlacklistConfig;
use crate::error::{BlacklistError, RefreshError};
use crate::remote::{FetchOutcome, HttpSource, RemoteSource};
use crate::store::{load_initial, RuleFile, RuleSource};

/// What a refresh cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Server answered 304.
    NotModified,
    /// Server sent a body that is not newer than the active rules.
    Stale,
    /// A new rule set was published.
    Updated,
    /// Another refresh was already running.
    Busy,
    /// Fetch or parse failed; the active rules were kept.
    Failed,
}

/// Comment-spam classifier holding the active rule set.
pub struct Blacklist {
    active: ArcSwap<RuleSet>,
    rule_file: RuleFile,
    source: RuleSource,
    remote: Box<dyn RemoteSource>,
    refresh_guard: Mutex<()>,
}

impl Blacklist {
    /// Bootstrap from the configured local file or the bundled rules, with
    /// updates fetched over HTTP.
    pub fn new(config: &BlacklistConfig) -> Result<Self, BlacklistError> {
        let remote = HttpSource::new(config.remote_url.as_str(), config.timeout);
        Self::with_remote(config, Box::new(remote))
    }

    pub fn with_remote(config: &BlacklistConfig, remote: Box<dyn RemoteSource>) -> Result<Self, BlacklistError> {
        let rule_file = RuleFile::new(config.rule_file_path());
        let (rule_set, source) = load_initial(&rule_file, config.bundled)?;

        Ok(Self {
            active: ArcSwap::from_pointee(rule_set),
            rule_file,
            source,
            remote,
            refresh_guard: Mutex::new(()),
        })
    }

    /// Does the text hit any active rule?
    pub fn is_blacklisted(&self, text: &str) -> bool {
        self.active.load().is_blacklisted(text)
    }

    /// Consistent snapshot of the active rules.
    pub fn rule_set(&self) -> Arc<RuleSet> {
        self.active.load_full()
    }

    pub fn freshness(&self) -> Option<Freshness> {
        self.active.load().freshness()
    }

    /// Where bootstrap read the initial rules from.
    pub fn source(&self) -> &RuleSource {
        &self.source
    }

    pub fn rule_file_path(&self) -> Option<&Path> {
        self.rule_file.path()
    }

    /// Try to download a newer rule list. Failures are logged and the current
    /// rules stay active.
    pub fn check_for_update(&self) {
        self.refresh();
    }

    /// Run one refresh cycle and report what happened.
    pub fn refresh(&self) -> RefreshOutcome {
        let _guard = match self.refresh_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::debug!("Blacklist update already in progress");
                return RefreshOutcome::Busy;
            }
        };

        match self.try_refresh() {
            Ok(outcome) => outcome,
            Err(e) => {
                log::info!("Blacklist update: unable to update comment spam blacklist due to: {e}");
                RefreshOutcome::Failed
            }
        }
    }

    fn try_refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let current = self.active.load_full();
        let since = current.freshness();

        let (body, last_modified) = match self.remote.fetch(since)? {
            FetchOutcome::NotModified => {
                log::debug!("Blacklist not modified since {since:?}");
                return Ok(RefreshOutcome::NotModified);
            }
            FetchOutcome::Modified { body, last_modified } => (body, last_modified),
        };

        if !is_newer(since, last_modified) {
            log::debug!("Ignoring blacklist last modified {last_modified:?}, have {since:?}");
            return Ok(RefreshOutcome::Stale);
        }

        let mut candidate = parse_rule_list(&body)?;

        // A failed write must not cost us the newer rules.
        match self.rule_file.persist(&body) {
            Ok(true) => log::debug!("Saved new blacklist to {:?}", self.rule_file.path()),
            Ok(false) => {}
            Err(e) => log::warn!("Unable to save new blacklist: {e}"),
        }

        if candidate.freshness().is_none() && last_modified.is_some() {
            candidate = candidate.with_freshness(last_modified);
        }

        log::info!(
            "Blacklist updated: {} literal rules, {} regex rules",
            candidate.literals().len(),
            candidate.patterns().len()
        );
        self.active.store(Arc::new(candidate));

        Ok(RefreshOutcome::Updated)
    }
}

/// Without a current timestamp anything is newer; an unknown
/// `Last-Modified` never is.
fn is_newer(current: Option<Freshness>, last_modified: Option<Freshness>) -> bool {
    match (current, last_modified) {
        (None, _) => true,
        (Some(current), Some(last_modified)) => last_modified > current,
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;

    use bl_core::{LiteralRule, PatternRule};
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::error::FetchError;

    const BUNDLED: &str = "# Last update: 2004/03/08 23:17:30\nold-spam\nold(er)?-pattern\n";
    const UPDATE: &str = "new-spam\nnew-(pills|meds)\n";

    fn bundled_time() -> Freshness {
        Utc.with_ymd_and_hms(2004, 3, 8, 23, 17, 30).unwrap()
    }

    struct FakeRemote {
        responses: Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
        requests: Mutex<Vec<Option<Freshness>>>,
    }

    impl FakeRemote {
        fn with(responses: Vec<Result<FetchOutcome, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Option<Freshness>> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl RemoteSource for FakeRemote {
        fn fetch(&self, if_modified_since: Option<Freshness>) -> Result<FetchOutcome, FetchError> {
            self.requests.lock().unwrap().push(if_modified_since);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch")
        }
    }

    fn modified(body: &str, last_modified: Option<Freshness>) -> Result<FetchOutcome, FetchError> {
        Ok(FetchOutcome::Modified {
            body: body.to_string(),
            last_modified,
        })
    }

    fn config(bundled: &'static str) -> BlacklistConfig {
        BlacklistConfig {
            bundled: Some(bundled),
            ..BlacklistConfig::default()
        }
    }

    fn blacklist(config: &BlacklistConfig, remote: &Arc<FakeRemote>) -> Blacklist {
        Blacklist::with_remote(config, Box::new(remote.clone())).unwrap()
    }

    fn literals(set: &RuleSet) -> Vec<String> {
        set.literals().iter().map(|r| r.as_str().to_string()).collect()
    }

    fn patterns(set: &RuleSet) -> Vec<String> {
        set.patterns().iter().map(|r| r.as_str().to_string()).collect()
    }

    #[test]
    fn not_modified_keeps_same_rule_set() {
        let remote = FakeRemote::with(vec![Ok(FetchOutcome::NotModified)]);
        let blacklist = blacklist(&config(BUNDLED), &remote);
        let before = blacklist.rule_set();

        assert_eq!(blacklist.refresh(), RefreshOutcome::NotModified);

        assert!(Arc::ptr_eq(&before, &blacklist.rule_set()));
        assert_eq!(blacklist.freshness(), Some(bundled_time()));
        assert_eq!(remote.requests(), vec![Some(bundled_time())]);
    }

    #[test]
    fn older_or_equal_last_modified_is_ignored() {
        let older = Utc.with_ymd_and_hms(2004, 1, 1, 0, 0, 0).unwrap();
        let remote = FakeRemote::with(vec![
            modified(UPDATE, Some(bundled_time())),
            modified(UPDATE, Some(older)),
        ]);
        let blacklist = blacklist(&config(BUNDLED), &remote);
        let before = blacklist.rule_set();

        assert_eq!(blacklist.refresh(), RefreshOutcome::Stale);
        assert_eq!(blacklist.refresh(), RefreshOutcome::Stale);

        assert!(Arc::ptr_eq(&before, &blacklist.rule_set()));
        assert!(blacklist.is_blacklisted("old-spam"));
        assert!(!blacklist.is_blacklisted("new-spam"));
    }

    #[test]
    fn unknown_last_modified_is_not_newer() {
        let remote = FakeRemote::with(vec![modified(UPDATE, None)]);
        let blacklist = blacklist(&config(BUNDLED), &remote);

        assert_eq!(blacklist.refresh(), RefreshOutcome::Stale);
        assert!(!blacklist.is_blacklisted("new-spam"));
    }

    #[test]
    fn newer_last_modified_replaces_rules() {
        let newer = Utc.with_ymd_and_hms(2005, 6, 1, 12, 0, 0).unwrap();
        let remote = FakeRemote::with(vec![modified(UPDATE, Some(newer))]);
        let blacklist = blacklist(&config(BUNDLED), &remote);

        assert_eq!(blacklist.refresh(), RefreshOutcome::Updated);

        let set = blacklist.rule_set();
        assert_eq!(literals(&set), vec!["new-spam"]);
        assert_eq!(patterns(&set), vec!["new-(pills|meds)"]);
        assert_eq!(set.freshness(), Some(newer));
        assert!(blacklist.is_blacklisted("buy new-meds"));
        assert!(!blacklist.is_blacklisted("old-spam"));
    }

    #[test]
    fn last_update_comment_beats_header() {
        let header = Utc.with_ymd_and_hms(2005, 6, 1, 12, 0, 0).unwrap();
        let body = "# Last update: 2005/05/30 08:00:00\nnew-spam\n";
        let remote = FakeRemote::with(vec![modified(body, Some(header))]);
        let blacklist = blacklist(&config(BUNDLED), &remote);

        assert_eq!(blacklist.refresh(), RefreshOutcome::Updated);
        assert_eq!(
            blacklist.freshness(),
            Some(Utc.with_ymd_and_hms(2005, 5, 30, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn without_freshness_any_body_is_taken() {
        let remote = FakeRemote::with(vec![modified(UPDATE, None)]);
        let blacklist = blacklist(&config("old-spam\n"), &remote);

        assert_eq!(blacklist.refresh(), RefreshOutcome::Updated);
        assert_eq!(remote.requests(), vec![None]);
        assert_eq!(blacklist.freshness(), None);
        assert!(blacklist.is_blacklisted("new-spam"));
    }

    #[test]
    fn parse_error_keeps_previous_rules() {
        let newer = Utc.with_ymd_and_hms(2005, 6, 1, 12, 0, 0).unwrap();
        let remote = FakeRemote::with(vec![modified("fine\nbroken(\n", Some(newer))]);
        let blacklist = blacklist(&config(BUNDLED), &remote);
        let before = blacklist.rule_set();

        assert_eq!(blacklist.refresh(), RefreshOutcome::Failed);
        assert!(Arc::ptr_eq(&before, &blacklist.rule_set()));
    }

    #[test]
    fn unusable_transport_still_bootstraps() {
        let config = BlacklistConfig {
            remote_url: "not a url".to_string(),
            ..config(BUNDLED)
        };
        let blacklist = Blacklist::new(&config).unwrap();
        assert!(blacklist.is_blacklisted("old-spam"));

        assert_eq!(blacklist.refresh(), RefreshOutcome::Failed);
        assert!(blacklist.is_blacklisted("old-spam"));
        assert_eq!(blacklist.freshness(), Some(bundled_time()));
    }

    #[test]
    fn fetch_error_keeps_previous_rules() {
        let remote = FakeRemote::with(vec![Err(FetchError::Status(reqwest::StatusCode::BAD_GATEWAY))]);
        let blacklist = blacklist(&config(BUNDLED), &remote);
        let before = blacklist.rule_set();

        blacklist.check_for_update();

        assert!(Arc::ptr_eq(&before, &blacklist.rule_set()));
        assert!(blacklist.is_blacklisted("old-spam"));
    }

    #[test]
    fn persist_failure_still_swaps() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("uploads");
        fs::write(&blocker, "").unwrap();

        let config = BlacklistConfig {
            upload_dir: Some(blocker),
            ..config(BUNDLED)
        };
        let newer = Utc.with_ymd_and_hms(2005, 6, 1, 12, 0, 0).unwrap();
        let remote = FakeRemote::with(vec![modified(UPDATE, Some(newer))]);
        let blacklist = blacklist(&config, &remote);
        assert_eq!(blacklist.source(), &RuleSource::Bundled);

        assert_eq!(blacklist.refresh(), RefreshOutcome::Updated);
        assert!(blacklist.is_blacklisted("new-spam"));
    }

    #[test]
    fn persisted_update_is_reloaded_on_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlacklistConfig {
            base_path: Some(dir.path().to_path_buf()),
            ..config(BUNDLED)
        };
        let body = "# Last update: 2005/05/30 08:00:00\nnew-spam # comment\nnew-(pills|meds)\n";
        let header = Utc.with_ymd_and_hms(2005, 6, 1, 12, 0, 0).unwrap();
        let remote = FakeRemote::with(vec![modified(body, Some(header))]);
        let first = blacklist(&config, &remote);
        assert_eq!(first.source(), &RuleSource::Bundled);
        assert_eq!(first.refresh(), RefreshOutcome::Updated);

        let path = dir.path().join("resources").join("blacklist.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), body);

        let second = Blacklist::with_remote(&config, Box::new(FakeRemote::with(Vec::new()))).unwrap();
        assert_eq!(second.source(), &RuleSource::Local(path));

        let (a, b) = (first.rule_set(), second.rule_set());
        assert_eq!(a.literals(), b.literals());
        assert_eq!(a.patterns(), b.patterns());
        assert_eq!(a.freshness(), b.freshness());
        assert_eq!(b.literals(), &[LiteralRule::new("new-spam")]);
        assert_eq!(b.patterns(), &[PatternRule::new("new-(pills|meds)").unwrap()]);
    }

    #[test]
    fn concurrent_refresh_is_skipped() {
        let remote = FakeRemote::with(Vec::new());
        let blacklist = blacklist(&config(BUNDLED), &remote);

        let _held = blacklist.refresh_guard.lock().unwrap();
        assert_eq!(blacklist.refresh(), RefreshOutcome::Busy);
        assert!(remote.requests().is_empty());
    }

    #[test]
    fn readers_see_whole_snapshots_during_refresh() {
        let newer = Utc.with_ymd_and_hms(2005, 6, 1, 12, 0, 0).unwrap();
        let remote = FakeRemote::with(vec![modified(UPDATE, Some(newer))]);
        let blacklist = Arc::new(blacklist(&config(BUNDLED), &remote));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let blacklist = Arc::clone(&blacklist);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let set = blacklist.rule_set();
                        let old = set.is_blacklisted("old-spam") && set.is_blacklisted("old-pattern");
                        let new = set.is_blacklisted("new-spam") && set.is_blacklisted("new-pills");
                        assert!(old ^ new, "torn rule set observed");
                    }
                })
            })
            .collect();

        assert_eq!(blacklist.refresh(), RefreshOutcome::Updated);
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn is_newer_rules() {
        let t = bundled_time();
        assert!(is_newer(None, None));
        assert!(is_newer(None, Some(t)));
        assert!(!is_newer(Some(t), None));
        assert!(!is_newer(Some(t), Some(t)));
        assert!(is_newer(Some(t), Some(t + chrono::Duration::seconds(1))));
    }
}
