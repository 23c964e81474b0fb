//! L2 block identity and range validation

use serde::{Deserialize, Serialize};

use crate::error::{FinalityError, FinalityResult};

/// An L2 block as submitted by the rollup derivation pipeline
///
/// Identity is `(block_height, block_hash)`. The timestamp is only used to
/// resolve the Bitcoin height the committee power is measured at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct L2Block {
    /// Hex block hash, with or without `0x`
    pub block_hash: String,
    pub block_height: u64,
    /// Unix seconds
    pub block_timestamp: u64,
}

impl L2Block {
    pub fn new(block_hash: impl Into<String>, block_height: u64, block_timestamp: u64) -> Self {
        Self {
            block_hash: block_hash.into(),
            block_height,
            block_timestamp,
        }
    }

    /// Copy of this block carrying the normalized hash
    pub fn normalized(&self) -> Self {
        Self {
            block_hash: normalize_block_hash(&self.block_hash),
            block_height: self.block_height,
            block_timestamp: self.block_timestamp,
        }
    }
}

/// Lookup key form of a block hash: one leading `0x`/`0X` removed, lowercase.
///
/// Idempotent for hex input.
pub fn normalize_block_hash(hash: &str) -> String {
    let trimmed = hash
        .strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .unwrap_or(hash);
    trimmed.to_ascii_lowercase()
}

/// Reject empty input and any height gap between neighbours
pub fn ensure_consecutive(blocks: &[L2Block]) -> FinalityResult<()> {
    if blocks.is_empty() {
        return Err(FinalityError::EmptyBlocks);
    }

    for (index, pair) in blocks.windows(2).enumerate() {
        let expected = pair[0].block_height.checked_add(1);
        if expected != Some(pair[1].block_height) {
            return Err(FinalityError::NonConsecutiveBlocks {
                index: index + 1,
                expected: expected.unwrap_or(u64::MAX),
                actual: pair[1].block_height,
            });
        }
    }
    Ok(())
}
