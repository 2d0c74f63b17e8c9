//! Vibrato/tremolo oscillators.
//!
//! One cycle is 64 phase steps, advanced by `speed` once per tick on
//! ticks after the first. The random waveform holds a fresh value per
//! advance from a small deterministic PRNG so two runs of the same
//! module render identically.

use core::f32::consts::TAU;

use rand_core::RngCore;
use rand_pcg::Pcg32;

const PHASE_STEPS: u32 = 64;

/// Oscillator shape selected by the waveform effect's low bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    /// Ramp down.
    Saw,
    Square,
    /// Hold a random level per step.
    Random,
}

impl Waveform {
    fn from_bits(bits: u8) -> Waveform {
        match bits & 0x3 {
            0 => Waveform::Sine,
            1 => Waveform::Saw,
            2 => Waveform::Square,
            _ => Waveform::Random,
        }
    }
}

/// One modulation oscillator with remembered speed/depth.
#[derive(Clone, Debug)]
pub struct Lfo {
    waveform: Waveform,
    /// Waveform-select bit 2: keep phase running across note triggers.
    keep_phase: bool,
    speed: u8,
    depth: u8,
    phase: u32,
    rng: Pcg32,
    random_level: f32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            keep_phase: false,
            speed: 0,
            depth: 0,
            phase: 0,
            rng: Pcg32::new(0xcafe_f00d_d15e_a5e5, 0x0a02_bdbf_7bb3_c0a7),
            random_level: 0.0,
        }
    }
}

impl Lfo {
    /// Take over speed/depth from an effect parameter; zero nibbles keep
    /// the remembered values.
    pub fn configure(&mut self, speed: u8, depth: u8) {
        if speed != 0 {
            self.speed = speed;
        }
        if depth != 0 {
            self.depth = depth;
        }
    }

    /// Apply a waveform-select parameter (E4x / E7x).
    pub fn select_waveform(&mut self, param: u8) {
        self.waveform = Waveform::from_bits(param);
        self.keep_phase = param & 0x4 != 0;
    }

    /// A new note starts; rewind the phase unless the waveform was
    /// selected with the keep-phase bit.
    pub fn retrigger(&mut self) {
        if !self.keep_phase {
            self.phase = 0;
        }
    }

    /// Advance one tick.
    pub fn advance(&mut self) {
        self.phase = self.phase.wrapping_add(self.speed as u32);
        if self.waveform == Waveform::Random {
            // 24 random bits mapped onto -1.0..1.0.
            let raw = self.rng.next_u32() >> 8;
            self.random_level = raw as f32 / (1 << 24) as f32 * 2.0 - 1.0;
        }
    }

    /// Oscillator level at the current phase, -1.0..=1.0.
    fn level(&self) -> f32 {
        let x = (self.phase % PHASE_STEPS) as f32 / PHASE_STEPS as f32;
        match self.waveform {
            Waveform::Sine => libm::sinf(TAU * x),
            Waveform::Saw => 1.0 - 2.0 * x,
            Waveform::Square => {
                if x < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Random => self.random_level,
        }
    }

    /// Vibrato contribution in period units.
    pub fn period_offset(&self) -> f32 {
        self.level() * self.depth as f32 * 2.0
    }

    /// Tremolo contribution in volume units.
    pub fn volume_offset(&self) -> f32 {
        self.level() * self.depth as f32 * 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_params_keep_remembered_values() {
        let mut lfo = Lfo::default();
        lfo.configure(4, 8);
        lfo.configure(0, 0);
        assert_eq!(lfo.speed, 4);
        assert_eq!(lfo.depth, 8);

        lfo.configure(0, 2);
        assert_eq!(lfo.speed, 4);
        assert_eq!(lfo.depth, 2);
    }

    #[test]
    fn sine_starts_at_zero_and_peaks_at_quarter_cycle() {
        let mut lfo = Lfo::default();
        lfo.configure(16, 8);
        assert_eq!(lfo.period_offset(), 0.0);

        lfo.advance();
        // Quarter cycle: full positive depth, 8 * 2 period units.
        assert!((lfo.period_offset() - 16.0).abs() < 1e-3);
    }

    #[test]
    fn retrigger_rewinds_unless_phase_kept() {
        let mut lfo = Lfo::default();
        lfo.configure(5, 8);
        lfo.advance();
        lfo.retrigger();
        assert_eq!(lfo.phase, 0);

        lfo.select_waveform(0x4); // sine, keep phase
        lfo.advance();
        lfo.advance();
        lfo.retrigger();
        assert_eq!(lfo.phase, 10);
    }

    #[test]
    fn square_alternates_half_cycles() {
        let mut lfo = Lfo::default();
        lfo.select_waveform(0x2);
        lfo.configure(16, 1);
        assert_eq!(lfo.level(), 1.0);
        lfo.advance();
        lfo.advance();
        assert_eq!(lfo.level(), -1.0);
    }

    #[test]
    fn random_is_deterministic() {
        let mut a = Lfo::default();
        let mut b = Lfo::default();
        a.select_waveform(0x3);
        b.select_waveform(0x3);
        a.configure(1, 4);
        b.configure(1, 4);
        for _ in 0..8 {
            a.advance();
            b.advance();
            assert_eq!(a.level(), b.level());
            assert!(a.level() >= -1.0 && a.level() <= 1.0);
        }
    }
}
