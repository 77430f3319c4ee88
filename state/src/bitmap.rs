//! Tick bitmap: one bit per usable tick, packed into 256-bit words.
//!
//! Searches never leave the word of the starting position. When a word has
//! no initialized tick in the searched direction, the word's edge is
//! returned with `initialized = false`, so callers see word boundaries as
//! uninitialized candidates.

use alloy_primitives::U256;
use std::collections::BTreeMap;
use tickscan_core::{Tick, TickSpacing, TickscanError, TickscanResult};

/// Bits per bitmap word
pub const WORD_BITS: u32 = 256;

/// Tick index divided by spacing, rounded toward negative infinity
pub fn compress(tick: Tick, spacing: TickSpacing) -> i64 {
    (tick.0 as i64).div_euclid(spacing.0 as i64)
}

/// Word index and bit index of a compressed tick
pub fn position(compressed: i64) -> (i32, usize) {
    ((compressed >> 8) as i32, (compressed & 0xff) as usize)
}

fn expand(compressed: i64, spacing: TickSpacing) -> Tick {
    let raw = compressed * spacing.0 as i64;
    Tick(raw.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

fn check_spacing(spacing: TickSpacing) -> TickscanResult<()> {
    if !spacing.is_valid() {
        return Err(TickscanError::InvalidSpacing(spacing.0));
    }
    Ok(())
}

/// Next initialized tick within the word of `tick`.
///
/// With `lte` the search covers `tick` itself and everything below it in
/// the word. Without `lte` it covers everything strictly above `tick` in the
/// word of `compressed + 1`. `word_at` supplies bitmap words by index.
pub fn next_initialized_tick_within_one_word<F>(
    mut word_at: F,
    tick: Tick,
    spacing: TickSpacing,
    lte: bool,
) -> TickscanResult<(bool, Tick)>
where
    F: FnMut(i32) -> TickscanResult<U256>,
{
    check_spacing(spacing)?;
    let compressed = compress(tick, spacing);
    let one = U256::from(1u8);

    if lte {
        let (word_pos, bit) = position(compressed);
        // all bits at or below `bit`
        let mask = (one << bit) - one + (one << bit);
        let masked = word_at(word_pos)? & mask;

        if masked.is_zero() {
            Ok((false, expand(compressed - bit as i64, spacing)))
        } else {
            let msb = (WORD_BITS as usize - 1) - masked.leading_zeros();
            Ok((true, expand(compressed - (bit - msb) as i64, spacing)))
        }
    } else {
        let start = compressed + 1;
        let (word_pos, bit) = position(start);
        // all bits at or above `bit`
        let mask = !((one << bit) - one);
        let masked = word_at(word_pos)? & mask;

        if masked.is_zero() {
            let remaining = (WORD_BITS as usize - 1 - bit) as i64;
            Ok((false, expand(start + remaining, spacing)))
        } else {
            let lsb = masked.trailing_zeros();
            Ok((true, expand(start + (lsb - bit) as i64, spacing)))
        }
    }
}

/// In-memory tick bitmap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickBitmap {
    words: BTreeMap<i32, U256>,
}

impl TickBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the initialized bit of `tick`
    pub fn flip_tick(&mut self, tick: Tick, spacing: TickSpacing) -> TickscanResult<()> {
        check_spacing(spacing)?;
        if !tick.is_aligned(spacing) {
            return Err(TickscanError::TickNotAligned {
                tick: tick.0,
                spacing: spacing.0,
            });
        }

        let (word_pos, bit) = position(compress(tick, spacing));
        let word = self.words.entry(word_pos).or_insert(U256::ZERO);
        *word ^= U256::from(1u8) << bit;
        if word.is_zero() {
            self.words.remove(&word_pos);
        }
        Ok(())
    }

    pub fn is_initialized(&self, tick: Tick, spacing: TickSpacing) -> bool {
        if !tick.is_aligned(spacing) {
            return false;
        }
        let (word_pos, bit) = position(compress(tick, spacing));
        self.word(word_pos).bit(bit)
    }

    /// Word at `word_pos`, zero when nothing in it is initialized
    pub fn word(&self, word_pos: i32) -> U256 {
        self.words.get(&word_pos).copied().unwrap_or(U256::ZERO)
    }

    /// Non-empty words in ascending index order
    pub fn words(&self) -> impl Iterator<Item = (i32, U256)> + '_ {
        self.words.iter().map(|(pos, word)| (*pos, *word))
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: Tick,
        spacing: TickSpacing,
        lte: bool,
    ) -> TickscanResult<(bool, Tick)> {
        next_initialized_tick_within_one_word(|pos| Ok(self.word(pos)), tick, spacing, lte)
    }
}
