//! Sampled instrument data.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Maximum sample name length in the container (bytes).
pub const NAME_LEN: usize = 22;

/// Maximum sample volume.
pub const MAX_VOLUME: u8 = 64;

/// A sampled waveform with loop and tuning metadata.
///
/// The wave is shared behind `Arc` so module edits that leave a sample
/// untouched share its data.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name.
    pub name: ArrayString<NAME_LEN>,
    /// Signed 8-bit PCM, even length.
    pub wave: Arc<Vec<i8>>,
    /// Loop start byte offset.
    pub loop_start: u32,
    /// Loop end byte offset; equal to `loop_start` means no loop.
    pub loop_end: u32,
    /// Pitch bias, -8..=7.
    pub finetune: i8,
    /// Default volume, 0..=64.
    pub volume: u8,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            wave: Arc::new(Vec::new()),
            loop_start: 0,
            loop_end: 0,
            finetune: 0,
            volume: MAX_VOLUME,
        }
    }
}

impl Sample {
    /// Create a named empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Wave length in bytes.
    pub fn len(&self) -> usize {
        self.wave.len()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }

    /// Returns true if the sample loops.
    pub fn has_loop(&self) -> bool {
        self.loop_end > self.loop_start
    }
}
