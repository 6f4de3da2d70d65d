use crate::config::AnalysisConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic content+config identity, used as the cache key.
///
/// Stored as lowercase hex of a SHA-256 digest. Two equal fingerprints imply
/// the same unit bytes, the same output-affecting configuration, and the same
/// model identity, so cached findings can be reused without re-inference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a source unit under a configuration and model identity.
///
/// Fields are length-prefixed before hashing so that no concatenation of
/// content/config/model strings can collide with another split of the same
/// bytes.
#[must_use]
pub fn fingerprint_unit(content: &[u8], config: &AnalysisConfig, model_id: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, content);
    update_field(&mut hasher, config.canonical_string().as_bytes());
    update_field(&mut hasher, model_id.as_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Derive a chunk fingerprint from its unit's fingerprint, sequence index,
/// and byte offsets.
#[must_use]
pub fn fingerprint_chunk(
    unit: &Fingerprint,
    index: usize,
    start_byte: usize,
    end_byte: usize,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, unit.as_str().as_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update((start_byte as u64).to_le_bytes());
    hasher.update((end_byte as u64).to_le_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
