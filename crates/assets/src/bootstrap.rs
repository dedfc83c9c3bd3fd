use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{AssetState, SharedAssetCache};
use crate::error::AssetError;
use crate::host::{AssetHost, AssetKind};
use crate::plan::LoadPlan;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

impl BootstrapStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapStatus::Idle => "idle",
            BootstrapStatus::Loading => "loading",
            BootstrapStatus::Ready => "ready",
            BootstrapStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BootstrapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives one [`LoadPlan`] to `Ready` or `Failed`.
///
/// Stylesheets are all requested on `start`; scripts are requested one at a
/// time, each only after its predecessor loaded. The host reports
/// completions to the shared cache and then calls [`AssetBootstrap::pump`].
/// A bounded load also needs [`AssetBootstrap::tick_timeout`] once per
/// animation frame; completions never count toward the bound.
#[derive(Debug)]
pub struct AssetBootstrap {
    plan: LoadPlan,
    cache: SharedAssetCache,
    status: BootstrapStatus,
    cursor: usize,
    error: Option<AssetError>,
    load_timeout_frames: Option<u32>,
    stalled_frames: u32,
    reordered: Vec<String>,
}

impl AssetBootstrap {
    pub fn new(plan: LoadPlan, cache: SharedAssetCache) -> Self {
        Self {
            plan,
            cache,
            status: BootstrapStatus::Idle,
            cursor: 0,
            error: None,
            load_timeout_frames: None,
            stalled_frames: 0,
            reordered: Vec::new(),
        }
    }

    /// Fail once more than `frames` animation frames pass with no script
    /// progress.
    pub fn with_load_timeout(mut self, frames: Option<u32>) -> Self {
        self.load_timeout_frames = frames;
        self
    }

    pub fn status(&self) -> BootstrapStatus {
        self.status
    }

    pub fn error(&self) -> Option<&AssetError> {
        self.error.as_ref()
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Scripts confirmed loaded for this plan, in order.
    pub fn loaded_scripts(&self) -> &[String] {
        &self.plan.scripts()[..self.cursor]
    }

    /// Scripts another plan evaluated before this plan's earlier scripts.
    pub fn reordered_scripts(&self) -> &[String] {
        &self.reordered
    }

    pub fn start(&mut self, host: &mut impl AssetHost) -> BootstrapStatus {
        if self.status != BootstrapStatus::Idle {
            return self.status;
        }
        if self.cache.borrow().is_ready(self.plan.id()) {
            debug!(plan = self.plan.id().short(), "plan already ready");
            self.cursor = self.plan.scripts().len();
            self.status = BootstrapStatus::Ready;
            return self.status;
        }

        debug!(
            plan = self.plan.id().short(),
            scripts = self.plan.scripts().len(),
            styles = self.plan.styles().len(),
            "loading assets"
        );
        self.status = BootstrapStatus::Loading;
        self.cursor = 0;
        self.stalled_frames = 0;
        self.request_styles(host);
        self.pump(host)
    }

    fn request_styles(&mut self, host: &mut impl AssetHost) {
        let mut cache = self.cache.borrow_mut();
        for url in self.plan.styles() {
            if cache.state(url).is_none() && host.asset_present(AssetKind::Stylesheet, url) {
                cache.mark_loaded(url);
                continue;
            }
            if cache.claim(url) {
                host.request_stylesheet(url);
            }
        }
    }

    fn failed_style(&self) -> Option<AssetError> {
        let cache = self.cache.borrow();
        self.plan.styles().iter().find_map(|url| match cache.state(url) {
            Some(AssetState::Failed(reason)) => Some(AssetError::AssetLoad {
                kind: AssetKind::Stylesheet,
                url: url.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        })
    }

    /// Advances as far as completed assets allow.
    pub fn pump(&mut self, host: &mut impl AssetHost) -> BootstrapStatus {
        if self.status != BootstrapStatus::Loading {
            return self.status;
        }
        if let Some(err) = self.failed_style() {
            return self.fail(err);
        }

        let before = self.cursor;
        loop {
            let Some(url) = self.plan.scripts().get(self.cursor).cloned() else {
                return self.finish(&*host);
            };
            let state = self.cache.borrow().state(&url).cloned();
            match state {
                Some(AssetState::Loaded) => self.cursor += 1,
                Some(AssetState::InFlight) => break,
                Some(AssetState::Failed(reason)) => {
                    return self.fail(AssetError::AssetLoad {
                        kind: AssetKind::Script,
                        url,
                        reason,
                    });
                }
                None => {
                    if host.asset_present(AssetKind::Script, &url) {
                        self.cache.borrow_mut().mark_loaded(&url);
                        continue;
                    }
                    self.cache.borrow_mut().claim(&url);
                    debug!(url = %url, index = self.cursor, "requesting script");
                    host.request_script(&url);
                    break;
                }
            }
        }

        if self.cursor > before {
            self.stalled_frames = 0;
        }
        self.note_reordered();
        self.status
    }

    /// Shared scripts are evaluated once, in whichever order the plans that
    /// share them ran. A later script already loaded while an earlier one is
    /// pending ran without its predecessors' globals.
    fn note_reordered(&mut self) {
        let cache = self.cache.borrow();
        let Some(pending) = self.plan.scripts().get(self.cursor) else {
            return;
        };
        for url in &self.plan.scripts()[self.cursor + 1..] {
            if cache.state(url) == Some(&AssetState::Loaded) && !self.reordered.contains(url) {
                warn!(url = %url, before = %pending, "shared script evaluated out of plan order");
                self.reordered.push(url.clone());
            }
        }
    }

    /// Counts one animation frame against the load timeout.
    pub fn tick_timeout(&mut self) -> BootstrapStatus {
        if self.status != BootstrapStatus::Loading {
            return self.status;
        }
        let Some(limit) = self.load_timeout_frames else {
            return self.status;
        };
        self.stalled_frames += 1;
        if self.stalled_frames <= limit {
            return self.status;
        }
        let Some(url) = self.plan.scripts().get(self.cursor).cloned() else {
            return self.status;
        };
        let reason = "timed out".to_string();
        self.cache.borrow_mut().complete(&url, Err(reason.clone()));
        self.fail(AssetError::AssetLoad {
            kind: AssetKind::Script,
            url,
            reason,
        })
    }

    fn finish(&mut self, host: &impl AssetHost) -> BootstrapStatus {
        let missing: Vec<String> = self
            .plan
            .required_globals()
            .iter()
            .filter(|name| !host.global_defined(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return self.fail(AssetError::EngineMissing { missing });
        }
        self.cache.borrow_mut().mark_ready(self.plan.id().clone());
        self.status = BootstrapStatus::Ready;
        info!(plan = self.plan.id().short(), "assets ready");
        self.status
    }

    fn fail(&mut self, err: AssetError) -> BootstrapStatus {
        warn!(error = %err, "asset bootstrap failed");
        self.error = Some(err);
        self.status = BootstrapStatus::Failed;
        self.status
    }

    /// Re-enters `Loading` from scratch after a failure.
    ///
    /// Loaded assets are kept; failed ones are fetched again. After
    /// `EngineMissing` the plan's scripts are dropped from the cache so the
    /// whole bundle loads fresh.
    pub fn retry(&mut self, host: &mut impl AssetHost) -> BootstrapStatus {
        if self.status != BootstrapStatus::Failed {
            return self.status;
        }
        {
            let mut cache = self.cache.borrow_mut();
            if self.error.as_ref().is_some_and(AssetError::is_engine_missing) {
                cache.invalidate(self.plan.scripts().iter().map(String::as_str));
            }
            cache.forget_failed(self.plan.urls());
        }
        debug!(plan = self.plan.id().short(), "retrying asset bootstrap");
        self.error = None;
        self.status = BootstrapStatus::Idle;
        self.start(host)
    }
}
