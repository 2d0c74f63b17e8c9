//! Effect command decoding.
//!
//! Cells store the raw 4-bit selector and parameter nibbles; playback
//! decodes them into this enum at dispatch time.

use crate::pattern::Cell;

/// A decoded effect column command (ProTracker command set).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,

    /// Cycle between note, note+x, note+y each tick.
    Arpeggio { x: u8, y: u8 },
    /// Slide pitch up by amount per tick.
    PortaUp(u8),
    /// Slide pitch down by amount per tick.
    PortaDown(u8),
    /// Slide toward the target note; 0 = reuse remembered rate.
    TonePorta(u8),
    /// Vibrato; zero nibbles reuse remembered speed/depth.
    Vibrato { speed: u8, depth: u8 },
    /// Tone portamento with remembered rate + volume slide.
    TonePortaVolSlide { up: u8, down: u8 },
    /// Continuing vibrato + volume slide.
    VibratoVolSlide { up: u8, down: u8 },
    /// Tremolo; zero nibbles reuse remembered speed/depth.
    Tremolo { speed: u8, depth: u8 },
    /// Set channel panning (0-255).
    SetPan(u8),
    /// Set sample offset in 256-byte units; 0 = reuse remembered.
    SampleOffset(u8),
    /// Volume slide, up nibble first.
    VolumeSlide { up: u8, down: u8 },
    /// Jump to sequence position.
    PositionJump(u8),
    /// Set channel volume (clamped to 64).
    SetVolume(u8),
    /// Break to a row (BCD-decoded) of the next position.
    PatternBreak(u8),
    /// Fine pitch slide up, once per row.
    FinePortaUp(u8),
    /// Fine pitch slide down, once per row.
    FinePortaDown(u8),
    /// Select vibrato waveform (bit 2 = keep phase across notes).
    SetVibratoWaveform(u8),
    /// Override the active sample's finetune.
    SetFinetune(i8),
    /// 0 = anchor loop start row, n = loop back n times.
    PatternLoop(u8),
    /// Select tremolo waveform (bit 2 = keep phase across notes).
    SetTremoloWaveform(u8),
    /// Retrigger the note every n ticks.
    RetriggerNote(u8),
    /// Fine volume slide up, once per row.
    FineVolumeSlideUp(u8),
    /// Fine volume slide down, once per row.
    FineVolumeSlideDown(u8),
    /// Silence the note at tick n.
    NoteCut(u8),
    /// Defer the row's note until tick n.
    NoteDelay(u8),
    /// Repeat the current row n extra times.
    PatternDelay(u8),
    /// Set ticks per row.
    SetSpeed(u8),
    /// Set tempo (ticks-per-second basis).
    SetTempo(u8),
}

impl Effect {
    /// Decode a cell's raw effect nibbles.
    pub fn from_cell(cell: &Cell) -> Effect {
        let x = cell.param0 & 0x0F;
        let y = cell.param1 & 0x0F;
        let param = cell.param_byte();

        match cell.effect & 0x0F {
            0x0 if param != 0 => Effect::Arpeggio { x, y },
            0x1 => Effect::PortaUp(param),
            0x2 => Effect::PortaDown(param),
            0x3 => Effect::TonePorta(param),
            0x4 => Effect::Vibrato { speed: x, depth: y },
            0x5 => Effect::TonePortaVolSlide { up: x, down: y },
            0x6 => Effect::VibratoVolSlide { up: x, down: y },
            0x7 => Effect::Tremolo { speed: x, depth: y },
            0x8 => Effect::SetPan(param),
            0x9 => Effect::SampleOffset(param),
            0xA => Effect::VolumeSlide { up: x, down: y },
            0xB => Effect::PositionJump(param),
            0xC => Effect::SetVolume(param.min(64)),
            0xD => Effect::PatternBreak(x * 10 + y),
            0xE => Self::from_extended(x, y),
            0xF => {
                if param == 0 {
                    Effect::None
                } else if param < 32 {
                    Effect::SetSpeed(param)
                } else {
                    Effect::SetTempo(param)
                }
            }
            _ => Effect::None,
        }
    }

    /// Decode an Exy extended effect.
    fn from_extended(sub: u8, val: u8) -> Effect {
        match sub {
            0x1 => Effect::FinePortaUp(val),
            0x2 => Effect::FinePortaDown(val),
            0x4 => Effect::SetVibratoWaveform(val),
            0x5 => Effect::SetFinetune(if val > 7 { val as i8 - 16 } else { val as i8 }),
            0x6 => Effect::PatternLoop(val),
            0x7 => Effect::SetTremoloWaveform(val),
            0x9 => Effect::RetriggerNote(val),
            0xA => Effect::FineVolumeSlideUp(val),
            0xB => Effect::FineVolumeSlideDown(val),
            0xC => Effect::NoteCut(val),
            0xD => Effect::NoteDelay(val),
            0xE => Effect::PatternDelay(val),
            _ => Effect::None,
        }
    }

    /// Returns true for the effects that treat a cell's pitch as a slide
    /// target rather than an immediate retrigger.
    pub fn is_tone_porta(&self) -> bool {
        matches!(self, Effect::TonePorta(_) | Effect::TonePortaVolSlide { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(effect: u8, param0: u8, param1: u8) -> Cell {
        Cell { pitch: -1, inst: 0, effect, param0, param1 }
    }

    #[test]
    fn empty_cell_decodes_to_none() {
        assert_eq!(Effect::from_cell(&Cell::EMPTY), Effect::None);
    }

    #[test]
    fn arpeggio_needs_nonzero_param() {
        assert_eq!(Effect::from_cell(&cell(0x0, 0, 0)), Effect::None);
        assert_eq!(
            Effect::from_cell(&cell(0x0, 4, 7)),
            Effect::Arpeggio { x: 4, y: 7 }
        );
    }

    #[test]
    fn pattern_break_param_is_bcd() {
        assert_eq!(Effect::from_cell(&cell(0xD, 1, 0)), Effect::PatternBreak(10));
        assert_eq!(Effect::from_cell(&cell(0xD, 6, 3)), Effect::PatternBreak(63));
    }

    #[test]
    fn speed_and_tempo_split_at_32() {
        assert_eq!(Effect::from_cell(&cell(0xF, 0, 6)), Effect::SetSpeed(6));
        assert_eq!(Effect::from_cell(&cell(0xF, 1, 15)), Effect::SetSpeed(31));
        assert_eq!(Effect::from_cell(&cell(0xF, 2, 0)), Effect::SetTempo(32));
        assert_eq!(Effect::from_cell(&cell(0xF, 7, 13)), Effect::SetTempo(125));
        assert_eq!(Effect::from_cell(&cell(0xF, 0, 0)), Effect::None);
    }

    #[test]
    fn finetune_override_sign_extends() {
        assert_eq!(Effect::from_cell(&cell(0xE, 0x5, 7)), Effect::SetFinetune(7));
        assert_eq!(Effect::from_cell(&cell(0xE, 0x5, 8)), Effect::SetFinetune(-8));
        assert_eq!(Effect::from_cell(&cell(0xE, 0x5, 15)), Effect::SetFinetune(-1));
    }

    #[test]
    fn porta_variants_are_target_effects() {
        assert!(Effect::TonePorta(3).is_tone_porta());
        assert!(Effect::TonePortaVolSlide { up: 1, down: 0 }.is_tone_porta());
        assert!(!Effect::PortaUp(3).is_tone_porta());
    }

    #[test]
    fn set_volume_clamps() {
        assert_eq!(Effect::from_cell(&cell(0xC, 0x7, 0)), Effect::SetVolume(64));
        assert_eq!(Effect::from_cell(&cell(0xC, 0x2, 0)), Effect::SetVolume(32));
    }
}
