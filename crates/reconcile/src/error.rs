use tablemerge_client::ClientError;
use thiserror::Error;

use crate::model::MergeStage;

/// Why a merge run stopped.
///
/// Every variant is terminal: the engine never continues past one. Writes
/// issued before the failure stay applied.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Unusable configuration. Raised before any remote call.
    #[error("configuration error: {0}")]
    Config(String),
    /// Access verification failed. Nothing was mutated.
    #[error("cannot access {target}: {source}")]
    Access { target: String, source: ClientError },
    /// A remote call failed after verification.
    #[error("{stage} failed: {source}")]
    Remote { stage: MergeStage, source: ClientError },
}

impl MergeError {
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Config(_) => None,
            Self::Access { source, .. } | Self::Remote { source, .. } => Some(source),
        }
    }

    pub fn stage(&self) -> Option<MergeStage> {
        match self {
            Self::Config(_) => None,
            Self::Access { .. } => Some(MergeStage::Verifying),
            Self::Remote { stage, .. } => Some(*stage),
        }
    }
}
