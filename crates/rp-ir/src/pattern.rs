//! Pattern and cell types.

use alloc::sync::Arc;
use alloc::vec::Vec;

/// Rows per pattern, a format constant.
pub const ROWS: usize = 64;

/// One note slot in a pattern.
///
/// Effect selector and parameter nibbles are kept raw so the codec can
/// round-trip them bit-exactly; playback decodes them through
/// [`crate::Effect::from_cell`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Pitch index into the period table, -1 = no note.
    pub pitch: i8,
    /// 1-based sample index, 0 = no instrument change.
    pub inst: u8,
    /// 4-bit effect selector.
    pub effect: u8,
    /// High parameter nibble.
    pub param0: u8,
    /// Low parameter nibble.
    pub param1: u8,
}

impl Cell {
    /// The shared no-op cell.
    pub const EMPTY: Cell = Cell { pitch: -1, inst: 0, effect: 0, param0: 0, param1: 0 };

    /// Both parameter nibbles combined as one byte.
    pub const fn param_byte(&self) -> u8 {
        (self.param0 << 4) | (self.param1 & 0x0F)
    }

    /// Returns true if the cell is completely empty.
    pub fn is_empty(&self) -> bool {
        *self == Cell::EMPTY
    }

    /// Returns true if the cell carries a note.
    pub fn has_note(&self) -> bool {
        self.pitch >= 0
    }
}

/// A fixed-size grid of cells, 64 rows by `channels` columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    channels: u8,
    /// Row-major: data[row * channels + channel]
    data: Vec<Cell>,
}

impl Pattern {
    /// Create an empty pattern.
    pub fn new(channels: u8) -> Self {
        Self {
            channels,
            data: alloc::vec![Cell::EMPTY; ROWS * channels as usize],
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Number of rows (always [`ROWS`]).
    pub fn rows(&self) -> usize {
        ROWS
    }

    /// Get a cell.
    pub fn cell(&self, row: usize, channel: u8) -> &Cell {
        debug_assert!(row < ROWS);
        debug_assert!(channel < self.channels);
        &self.data[row * self.channels as usize + channel as usize]
    }

    /// Get a mutable cell (codec/edit construction only — published
    /// patterns are shared behind `Arc` and never mutated).
    pub fn cell_mut(&mut self, row: usize, channel: u8) -> &mut Cell {
        debug_assert!(row < ROWS);
        debug_assert!(channel < self.channels);
        &mut self.data[row * self.channels as usize + channel as usize]
    }

    /// All cells of one row.
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.channels as usize;
        &self.data[start..start + self.channels as usize]
    }

    /// Copy-on-write cell replacement.
    pub fn with_cell(self: &Arc<Self>, row: usize, channel: u8, cell: Cell) -> Arc<Self> {
        let mut next = (**self).clone();
        *next.cell_mut(row, channel) = cell;
        Arc::new(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_is_shared_noop() {
        assert!(Cell::EMPTY.is_empty());
        assert!(!Cell::EMPTY.has_note());
        assert_eq!(Cell::EMPTY.param_byte(), 0);
    }

    #[test]
    fn param_byte_packs_nibbles() {
        let cell = Cell { pitch: -1, inst: 0, effect: 0xD, param0: 0x1, param1: 0x0 };
        assert_eq!(cell.param_byte(), 0x10);
    }

    #[test]
    fn pattern_cell_access() {
        let mut pattern = Pattern::new(4);
        pattern.cell_mut(10, 2).pitch = 12;

        assert_eq!(pattern.cell(10, 2).pitch, 12);
        assert_eq!(pattern.cell(10, 1).pitch, -1);
        assert_eq!(pattern.row(10).len(), 4);
    }

    #[test]
    fn with_cell_leaves_original_untouched() {
        let original = Arc::new(Pattern::new(4));
        let edited = original.with_cell(0, 0, Cell { pitch: 5, ..Cell::EMPTY });

        assert_eq!(original.cell(0, 0).pitch, -1);
        assert_eq!(edited.cell(0, 0).pitch, 5);
    }
}
