use crate::host::AssetKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load {kind} {url}: {reason}")]
    AssetLoad {
        kind: AssetKind,
        url: String,
        reason: String,
    },
    #[error("assets loaded but engine globals are missing: {}", missing.join(", "))]
    EngineMissing { missing: Vec<String> },
}

impl AssetError {
    pub fn is_engine_missing(&self) -> bool {
        matches!(self, AssetError::EngineMissing { .. })
    }
}
