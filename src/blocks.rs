use serde::{Deserialize, Serialize};
use std::fmt;

/// Broadcast time is laid out in fixed blocks of this many seconds.
pub const BLOCK_SECS: u32 = 30 * 60;

const VERY_SHORT_MAX: u32 = 10 * 60;
const SHORT_MAX: u32 = 15 * 60;
const MEDIUM_MAX: u32 = 28 * 60;
const LONG_MAX: u32 = 58 * 60;

/// Structural category of an episode by running time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    /// Up to 10 minutes: three share a block.
    VeryShort,
    /// Up to 15 minutes: two share a block.
    Short,
    /// Up to 28 minutes: one block, padded with commercials.
    Medium,
    /// Up to 58 minutes: two blocks.
    Long,
    /// Three or more blocks.
    VeryLong,
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockCategory::VeryShort => "very_short",
            BlockCategory::Short => "short",
            BlockCategory::Medium => "medium",
            BlockCategory::Long => "long",
            BlockCategory::VeryLong => "very_long",
        };
        f.write_str(s)
    }
}

/// How an episode of a given duration occupies broadcast blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLayout {
    pub category: BlockCategory,
    /// Blocks spanned by one placement (a single episode, or a shared block).
    pub blocks: u32,
    /// Episodes of this length that fit in one placement.
    pub episodes_per_block: u32,
    /// Seconds left for commercials when the placement is full.
    pub padding_secs: u32,
}

impl BlockLayout {
    pub fn span_secs(&self) -> u32 {
        self.blocks.saturating_mul(BLOCK_SECS)
    }

    pub fn is_shared(&self) -> bool {
        self.episodes_per_block > 1
    }
}

/// Classify an episode duration. Exact thresholds fall in the lower category.
///
/// Long episodes always take at least two blocks and very long ones at least
/// three, so every single-episode placement keeps room for a break.
pub fn classify(duration_secs: u32) -> BlockLayout {
    let (category, blocks, per_block) = match duration_secs {
        d if d <= VERY_SHORT_MAX => (BlockCategory::VeryShort, 1, 3),
        d if d <= SHORT_MAX => (BlockCategory::Short, 1, 2),
        d if d <= MEDIUM_MAX => (BlockCategory::Medium, 1, 1),
        d if d <= LONG_MAX => (BlockCategory::Long, duration_secs.div_ceil(BLOCK_SECS).max(2), 1),
        _ => (BlockCategory::VeryLong, duration_secs.div_ceil(BLOCK_SECS).max(3), 1),
    };
    let span = blocks.saturating_mul(BLOCK_SECS);
    BlockLayout {
        category,
        blocks,
        episodes_per_block: per_block,
        padding_secs: span.saturating_sub(duration_secs.saturating_mul(per_block)),
    }
}
