use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::plan::ManifestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    InFlight,
    Loaded,
    Failed(String),
}

/// Process-wide record of every asset URL requested so far.
///
/// URL identity is the dedup key: a URL is fetched at most once unless it
/// failed or was explicitly invalidated.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: BTreeMap<String, AssetState>,
    ready: BTreeSet<ManifestId>,
}

/// The cache is shared by every session on the (single) UI thread.
pub type SharedAssetCache = Rc<RefCell<AssetCache>>;

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedAssetCache {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn state(&self, url: &str) -> Option<&AssetState> {
        self.entries.get(url)
    }

    /// Claims `url` for fetching.
    ///
    /// Returns true when the caller must issue the request; false when the
    /// URL is already loaded or another session's request is in flight.
    pub fn claim(&mut self, url: &str) -> bool {
        match self.entries.get(url) {
            Some(AssetState::InFlight) | Some(AssetState::Loaded) => false,
            Some(AssetState::Failed(_)) | None => {
                self.entries.insert(url.to_string(), AssetState::InFlight);
                true
            }
        }
    }

    pub fn mark_loaded(&mut self, url: &str) {
        self.entries.insert(url.to_string(), AssetState::Loaded);
    }

    /// Records the outcome of a request. Outcomes for URLs nobody claimed
    /// are ignored and reported as `false`.
    pub fn complete(&mut self, url: &str, outcome: Result<(), String>) -> bool {
        let Some(entry) = self.entries.get_mut(url) else {
            warn!(url, "completion for unknown asset ignored");
            return false;
        };
        *entry = match outcome {
            Ok(()) => {
                debug!(url, "asset loaded");
                AssetState::Loaded
            }
            Err(reason) => {
                warn!(url, %reason, "asset failed");
                AssetState::Failed(reason)
            }
        };
        true
    }

    /// Drops failed entries so the next claim fetches them again.
    pub fn forget_failed<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) {
        for url in urls {
            if matches!(self.entries.get(url), Some(AssetState::Failed(_))) {
                self.entries.remove(url);
            }
        }
    }

    /// Forgets settled entries entirely; in-flight requests are left alone.
    pub fn invalidate<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) {
        for url in urls {
            if !matches!(self.entries.get(url), Some(AssetState::InFlight)) {
                self.entries.remove(url);
            }
        }
    }

    pub fn is_ready(&self, id: &ManifestId) -> bool {
        self.ready.contains(id)
    }

    pub fn mark_ready(&mut self, id: ManifestId) {
        self.ready.insert(id);
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, AssetState::InFlight))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetCache, AssetState};

    #[test]
    fn claim_is_granted_once_until_failure() {
        let mut c = AssetCache::new();
        assert!(c.claim("a.js"));
        assert!(!c.claim("a.js"));
        assert_eq!(c.in_flight(), 1);
        c.complete("a.js", Err("404".into()));
        assert_eq!(c.state("a.js"), Some(&AssetState::Failed("404".into())));
        assert!(c.claim("a.js"));
        c.complete("a.js", Ok(()));
        assert!(!c.claim("a.js"));
        assert_eq!(c.state("a.js"), Some(&AssetState::Loaded));
    }

    #[test]
    fn unknown_completion_is_ignored() {
        let mut c = AssetCache::new();
        assert!(!c.complete("never.js", Ok(())));
        assert!(c.is_empty());
    }

    #[test]
    fn invalidate_keeps_in_flight_entries() {
        let mut c = AssetCache::new();
        c.mark_loaded("a.js");
        c.claim("b.js");
        c.invalidate(["a.js", "b.js"]);
        assert_eq!(c.state("a.js"), None);
        assert_eq!(c.state("b.js"), Some(&AssetState::InFlight));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn forget_failed_only_touches_failures() {
        let mut c = AssetCache::new();
        c.mark_loaded("ok.css");
        c.claim("bad.css");
        c.complete("bad.css", Err("offline".into()));
        c.forget_failed(["ok.css", "bad.css"]);
        assert_eq!(c.state("ok.css"), Some(&AssetState::Loaded));
        assert_eq!(c.state("bad.css"), None);
    }
}
