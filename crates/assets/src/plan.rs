//! Composition of engine manifests into a single ordered load plan.
//!
//! Globe scripts are placed after the point-cloud engine's dependencies and
//! immediately before its main bundle (the last PCE script). A URL that
//! appears in both manifests is loaded once, at its first position.
//!
//! The order holds within one plan only. Plans sharing a cache share script
//! evaluation, so a shared script another plan already ran may precede this
//! plan's earlier scripts; the bootstrap reports such scripts but cannot
//! undo them.

use std::collections::BTreeSet;
use std::fmt;

use crate::manifest::AssetManifest;

/// BLAKE3 digest identifying a composed plan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManifestId(String);

impl ManifestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ManifestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    scripts: Vec<String>,
    styles: BTreeSet<String>,
    required_globals: Vec<String>,
    id: ManifestId,
}

impl LoadPlan {
    pub fn compose(pce: &AssetManifest, globe: Option<&AssetManifest>) -> Self {
        let mut ordered: Vec<&str> = Vec::new();
        let (deps, main) = match pce.scripts.split_last() {
            Some((main, deps)) => (deps, Some(main)),
            None => (&pce.scripts[..], None),
        };
        ordered.extend(deps.iter().map(String::as_str));
        if let Some(g) = globe {
            ordered.extend(g.scripts.iter().map(String::as_str));
        }
        ordered.extend(main.map(String::as_str));

        let mut seen = BTreeSet::new();
        let scripts: Vec<String> = ordered
            .into_iter()
            .filter(|url| seen.insert(*url))
            .map(str::to_string)
            .collect();

        let mut styles = pce.styles.clone();
        let mut required_globals = pce.required_globals.clone();
        if let Some(g) = globe {
            styles.extend(g.styles.iter().cloned());
            for name in &g.required_globals {
                if !required_globals.contains(name) {
                    required_globals.push(name.clone());
                }
            }
        }

        let id = manifest_id(&scripts, &styles, &required_globals);
        Self {
            scripts,
            styles,
            required_globals,
            id,
        }
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn styles(&self) -> &BTreeSet<String> {
        &self.styles
    }

    pub fn required_globals(&self) -> &[String] {
        &self.required_globals
    }

    pub fn id(&self) -> &ManifestId {
        &self.id
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.scripts
            .iter()
            .chain(self.styles.iter())
            .map(String::as_str)
    }
}

fn manifest_id(scripts: &[String], styles: &BTreeSet<String>, globals: &[String]) -> ManifestId {
    let mut hasher = blake3::Hasher::new();
    for (tag, items) in [
        (b's', scripts.iter().collect::<Vec<_>>()),
        (b'c', styles.iter().collect()),
        (b'g', globals.iter().collect()),
    ] {
        hasher.update(&[tag]);
        for item in items {
            hasher.update(&(item.len() as u64).to_le_bytes());
            hasher.update(item.as_bytes());
        }
    }
    ManifestId(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::LoadPlan;
    use crate::manifest::{AssetManifest, DEFAULT_BASE_PATH};
    use pretty_assertions::assert_eq;

    fn m(scripts: &[&str], styles: &[&str], globals: &[&str]) -> AssetManifest {
        AssetManifest::new(scripts.iter().copied(), styles.iter().copied(), globals.iter().copied())
    }

    #[test]
    fn globe_scripts_precede_main_bundle() {
        let pce = m(&["jq.js", "three.js", "potree.js"], &["p.css"], &["Potree"]);
        let ge = m(&["Cesium.js"], &["w.css"], &["Cesium"]);
        let plan = LoadPlan::compose(&pce, Some(&ge));
        assert_eq!(plan.scripts(), ["jq.js", "three.js", "Cesium.js", "potree.js"]);
        assert_eq!(plan.styles().len(), 2);
        assert_eq!(plan.required_globals(), ["Potree", "Cesium"]);
    }

    #[test]
    fn without_globe_plan_is_the_pce_manifest() {
        let pce = AssetManifest::potree(DEFAULT_BASE_PATH);
        let plan = LoadPlan::compose(&pce, None);
        assert_eq!(plan.scripts(), &pce.scripts[..]);
        assert_eq!(plan.styles(), &pce.styles);
    }

    #[test]
    fn shared_urls_load_once_at_first_position() {
        let pce = m(&["jq.js", "potree.js"], &[], &[]);
        let ge = m(&["jq.js", "Cesium.js"], &[], &[]);
        let plan = LoadPlan::compose(&pce, Some(&ge));
        assert_eq!(plan.scripts(), ["jq.js", "Cesium.js", "potree.js"]);
    }

    #[test]
    fn identity_follows_content_and_order() {
        let a = LoadPlan::compose(&m(&["a.js", "b.js"], &["x.css", "y.css"], &[]), None);
        let same = LoadPlan::compose(&m(&["a.js", "b.js"], &["y.css", "x.css"], &[]), None);
        let swapped = LoadPlan::compose(&m(&["b.js", "a.js"], &["x.css", "y.css"], &[]), None);
        assert_eq!(a.id(), same.id());
        assert_ne!(a.id(), swapped.id());
        assert_eq!(a.id().as_str().len(), 64);
        assert_eq!(a.id().short().len(), 12);
    }

    #[test]
    fn globe_changes_identity() {
        let pce = AssetManifest::potree(DEFAULT_BASE_PATH);
        let ge = AssetManifest::cesium(DEFAULT_BASE_PATH);
        assert_ne!(
            LoadPlan::compose(&pce, None).id(),
            LoadPlan::compose(&pce, Some(&ge)).id()
        );
    }
}
