//! The persistent module tree.
//!
//! A `Module` is an immutable value; every edit returns a new `Module`
//! sharing the unchanged branches of the old one. Identity comparison of
//! the shared `Arc`s is therefore a valid "did this change" test, which
//! the playback engine uses to decide whether channel runtime state can
//! survive a module swap.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::pattern::{Cell, Pattern};
use crate::sample::Sample;

/// Maximum title length in the container (bytes).
pub const TITLE_LEN: usize = 20;

/// Sample slots per module; slot 0 is the reserved absent sentinel.
pub const SAMPLE_SLOTS: usize = 32;

/// Maximum sequence length the container can hold.
pub const MAX_SEQUENCE: usize = 128;

/// A complete song: patterns, sequence, and sample bank.
#[derive(Clone, Debug)]
pub struct Module {
    /// Song title.
    pub name: ArrayString<TITLE_LEN>,
    /// Channels per pattern (4 for the classic format).
    pub num_channels: u8,
    /// Ordered pattern indices.
    pub sequence: Arc<Vec<u8>>,
    /// Sequence index to restart from when playback wraps.
    pub restart_pos: u8,
    /// Pattern list, indexable by sequence entries.
    pub patterns: Arc<Vec<Arc<Pattern>>>,
    /// Sample slots 0..=31; slot 0 is always `None`.
    pub samples: Arc<Vec<Option<Arc<Sample>>>>,
}

impl Module {
    /// Create a new module: one empty pattern, a one-entry sequence,
    /// all sample slots empty.
    pub fn new(name: &str, num_channels: u8) -> Self {
        let mut title = ArrayString::new();
        let _ = title.try_push_str(name);
        Self {
            name: title,
            num_channels,
            sequence: Arc::new(alloc::vec![0]),
            restart_pos: 0,
            patterns: Arc::new(alloc::vec![Arc::new(Pattern::new(num_channels))]),
            samples: Arc::new(alloc::vec![None; SAMPLE_SLOTS]),
        }
    }

    /// Look up a sample slot. Slot 0 and out-of-range slots are absent.
    pub fn sample(&self, index: u8) -> Option<&Arc<Sample>> {
        self.samples.get(index as usize).and_then(|slot| slot.as_ref())
    }

    /// Look up a pattern by index.
    pub fn pattern(&self, index: u8) -> Option<&Arc<Pattern>> {
        self.patterns.get(index as usize)
    }

    /// The pattern playing at a sequence position.
    pub fn pattern_at(&self, pos: usize) -> Option<&Arc<Pattern>> {
        self.sequence.get(pos).and_then(|&idx| self.pattern(idx))
    }

    /// Highest pattern index the sequence reaches. Patterns above this
    /// are unreachable (and are not written by the codec).
    pub fn last_used_pattern(&self) -> u8 {
        self.sequence.iter().copied().max().unwrap_or(0)
    }

    // --- pure edits ---

    /// Replace one cell; shares every untouched pattern.
    pub fn with_cell(&self, pattern: u8, row: usize, channel: u8, cell: Cell) -> Self {
        let Some(target) = self.pattern(pattern) else {
            return self.clone();
        };
        let edited = target.with_cell(row, channel, cell);
        let mut patterns: Vec<Arc<Pattern>> = (*self.patterns).clone();
        patterns[pattern as usize] = edited;
        Self { patterns: Arc::new(patterns), ..self.clone() }
    }

    /// Replace a whole pattern, growing the list if needed.
    pub fn with_pattern(&self, index: u8, pattern: Pattern) -> Self {
        let mut patterns: Vec<Arc<Pattern>> = (*self.patterns).clone();
        while patterns.len() <= index as usize {
            patterns.push(Arc::new(Pattern::new(self.num_channels)));
        }
        patterns[index as usize] = Arc::new(pattern);
        Self { patterns: Arc::new(patterns), ..self.clone() }
    }

    /// Replace a sample slot. Slot 0 is the reserved absent sentinel,
    /// so writes to it (and to out-of-range slots) are ignored.
    pub fn with_sample(&self, index: u8, sample: Option<Sample>) -> Self {
        if index == 0 || index as usize >= SAMPLE_SLOTS {
            return self.clone();
        }
        let mut samples: Vec<Option<Arc<Sample>>> = (*self.samples).clone();
        samples[index as usize] = sample.map(Arc::new);
        Self { samples: Arc::new(samples), ..self.clone() }
    }

    /// Replace the sequence; truncates to the container limit and
    /// re-sanitizes the restart position.
    pub fn with_sequence(&self, mut sequence: Vec<u8>) -> Self {
        sequence.truncate(MAX_SEQUENCE);
        if sequence.is_empty() {
            sequence.push(0);
        }
        let restart_pos = if (self.restart_pos as usize) < sequence.len() {
            self.restart_pos
        } else {
            0
        };
        Self { sequence: Arc::new(sequence), restart_pos, ..self.clone() }
    }

    /// Set the restart position, sanitized against the sequence length.
    pub fn with_restart_pos(&self, restart_pos: u8) -> Self {
        let restart_pos = if (restart_pos as usize) < self.sequence.len() {
            restart_pos
        } else {
            0
        };
        Self { restart_pos, ..self.clone() }
    }

    /// Rename the module (truncated to the container limit).
    pub fn with_name(&self, name: &str) -> Self {
        let mut title = ArrayString::new();
        for c in name.chars() {
            if title.try_push(c).is_err() {
                break;
            }
        }
        Self { name: title, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_module_shape() {
        let module = Module::new("untitled", 4);
        assert_eq!(module.num_channels, 4);
        assert_eq!(module.sequence.as_slice(), &[0]);
        assert_eq!(module.patterns.len(), 1);
        assert_eq!(module.samples.len(), SAMPLE_SLOTS);
        assert!(module.sample(0).is_none());
    }

    #[test]
    fn cell_edit_preserves_old_value() {
        let module = Module::new("a", 4);
        let cell = Cell { pitch: 12, inst: 1, ..Cell::EMPTY };
        let edited = module.with_cell(0, 5, 2, cell);

        assert_eq!(module.pattern(0).unwrap().cell(5, 2).pitch, -1);
        assert_eq!(edited.pattern(0).unwrap().cell(5, 2).pitch, 12);
    }

    #[test]
    fn cell_edit_shares_untouched_branches() {
        let module = Module::new("a", 4).with_pattern(1, Pattern::new(4));
        let edited = module.with_cell(0, 0, 0, Cell { pitch: 1, ..Cell::EMPTY });

        // Pattern 1 and the sample bank are the same allocations.
        assert!(Arc::ptr_eq(module.pattern(1).unwrap(), edited.pattern(1).unwrap()));
        assert!(Arc::ptr_eq(&module.samples, &edited.samples));
        assert!(Arc::ptr_eq(&module.sequence, &edited.sequence));
        assert!(!Arc::ptr_eq(&module.patterns, &edited.patterns));
    }

    #[test]
    fn sample_slot_zero_is_immutable() {
        let module = Module::new("a", 4);
        let edited = module.with_sample(0, Some(Sample::new("nope")));
        assert!(edited.sample(0).is_none());
    }

    #[test]
    fn sample_edit_changes_bank_identity_only() {
        let module = Module::new("a", 4);
        let edited = module.with_sample(1, Some(Sample::new("kick")));

        assert!(!Arc::ptr_eq(&module.samples, &edited.samples));
        assert!(Arc::ptr_eq(&module.patterns, &edited.patterns));
        assert_eq!(edited.sample(1).unwrap().name.as_str(), "kick");
    }

    #[test]
    fn restart_pos_sanitized_against_sequence() {
        let module = Module::new("a", 4)
            .with_sequence(alloc::vec![0, 0, 0])
            .with_restart_pos(2);
        assert_eq!(module.restart_pos, 2);

        let shrunk = module.with_sequence(alloc::vec![0]);
        assert_eq!(shrunk.restart_pos, 0);
    }

    #[test]
    fn last_used_pattern_tracks_sequence() {
        let module = Module::new("a", 4).with_sequence(alloc::vec![0, 3, 1]);
        assert_eq!(module.last_used_pattern(), 3);
    }
}
