//! Per-channel playback state.
//!
//! A channel owns everything the tick machine mutates for one pattern
//! column: the sounding period and volume, effect memories, modulation
//! oscillators, and the backend voice currently bound to it. The
//! `sched_*` fields cache the value most recently pushed to the backend
//! so a tick that changes nothing schedules nothing.

use rp_ir::period::{PERIOD_MAX, PERIOD_MIN};
use rp_ir::{Cell, MAX_VOLUME};

use crate::backend::VoiceId;
use crate::lfo::Lfo;

/// Runtime state for one sequenced channel.
#[derive(Clone, Debug)]
pub struct ChannelState {
    /// Active sample slot; 0 while no instrument has played.
    pub sample: u8,
    /// Remembered sample-offset parameter (9xx high byte).
    pub offset_param: u8,
    /// Start offset for the next trigger, in bytes.
    pub offset: u32,
    /// Sounding period; 0 while no note has played.
    pub period: u16,
    /// Active finetune (the sample's, unless overridden).
    pub finetune: i8,
    /// Channel volume, 0..=64.
    pub volume: u8,
    /// Panning, 0 left .. 255 right.
    pub panning: u8,
    pub muted: bool,

    pub vibrato: Lfo,
    pub tremolo: Lfo,

    /// Tone portamento destination; 0 = no slide in progress.
    pub porta_target: u16,
    /// Remembered portamento rate.
    pub porta_rate: u8,

    /// Pattern-loop anchor row for this channel.
    pub loop_row: usize,
    /// Loops taken since the anchor.
    pub loop_count: u8,

    /// Cell held back by a note-delay effect until its tick arrives.
    pub delayed: Option<Cell>,

    pub voice: Option<VoiceId>,

    // Last values actually scheduled on the voice.
    pub sched_period: Option<f32>,
    pub sched_detune: Option<i8>,
    pub sched_gain: Option<f32>,
    pub sched_pan: Option<u8>,
}

impl ChannelState {
    pub fn new(panning: u8) -> Self {
        Self {
            sample: 0,
            offset_param: 0,
            offset: 0,
            period: 0,
            finetune: 0,
            volume: MAX_VOLUME,
            panning,
            muted: false,
            vibrato: Lfo::default(),
            tremolo: Lfo::default(),
            porta_target: 0,
            porta_rate: 0,
            loop_row: 0,
            loop_count: 0,
            delayed: None,
            voice: None,
            sched_period: None,
            sched_detune: None,
            sched_gain: None,
            sched_pan: None,
        }
    }

    /// Forget what the backend was last told; the next push schedules
    /// every parameter. Called when the bound voice changes.
    pub fn reset_scheduled(&mut self) {
        self.sched_period = None;
        self.sched_detune = None;
        self.sched_gain = None;
        self.sched_pan = None;
    }

    /// Volume slide, up nibble taking precedence.
    pub fn slide_volume(&mut self, up: u8, down: u8) {
        if up > 0 {
            self.volume = (self.volume + up).min(MAX_VOLUME);
        } else {
            self.volume = self.volume.saturating_sub(down);
        }
    }

    /// Pitch slide up (periods shrink), clamped at the table edge.
    /// A silent channel (period 0) has nothing to slide.
    pub fn slide_period_up(&mut self, amount: u8) {
        if self.period == 0 {
            return;
        }
        self.period = self.period.saturating_sub(amount as u16).max(PERIOD_MIN);
    }

    /// Pitch slide down, clamped at the table edge.
    pub fn slide_period_down(&mut self, amount: u8) {
        if self.period == 0 {
            return;
        }
        self.period = (self.period + amount as u16).min(PERIOD_MAX);
    }

    /// One tone-portamento step toward the target. Snaps onto the
    /// target when a full step would overshoot, then clears the slide.
    pub fn porta_step(&mut self) {
        if self.porta_target == 0 || self.period == 0 {
            return;
        }
        let step = self.porta_rate as u16;
        let distance = self.period.abs_diff(self.porta_target);
        if distance <= step {
            self.period = self.porta_target;
            self.porta_target = 0;
        } else if self.period > self.porta_target {
            self.period -= step;
        } else {
            self.period += step;
        }
    }

    /// Stereo position as the backend wants it.
    pub fn pan_value(&self) -> f32 {
        (self.panning as f32 - 128.0) / 128.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_slide_prefers_up_nibble() {
        let mut ch = ChannelState::new(128);
        ch.volume = 40;
        ch.slide_volume(3, 9);
        assert_eq!(ch.volume, 43);
        ch.slide_volume(0, 5);
        assert_eq!(ch.volume, 38);
    }

    #[test]
    fn volume_slide_clamps_at_both_ends() {
        let mut ch = ChannelState::new(128);
        ch.volume = 62;
        ch.slide_volume(15, 0);
        assert_eq!(ch.volume, 64);
        ch.volume = 2;
        ch.slide_volume(0, 15);
        assert_eq!(ch.volume, 0);
    }

    #[test]
    fn period_slides_stop_at_table_edges() {
        let mut ch = ChannelState::new(128);
        ch.period = PERIOD_MIN + 3;
        ch.slide_period_up(10);
        assert_eq!(ch.period, PERIOD_MIN);

        ch.period = PERIOD_MAX - 3;
        ch.slide_period_down(10);
        assert_eq!(ch.period, PERIOD_MAX);
    }

    #[test]
    fn period_slides_leave_silent_channels_alone() {
        let mut ch = ChannelState::new(128);
        ch.slide_period_up(10);
        assert_eq!(ch.period, 0);
        ch.slide_period_down(10);
        assert_eq!(ch.period, 0);
    }

    #[test]
    fn porta_snaps_onto_target_and_clears() {
        let mut ch = ChannelState::new(128);
        ch.period = 500;
        ch.porta_target = 453;
        ch.porta_rate = 20;

        ch.porta_step();
        assert_eq!(ch.period, 480);
        ch.porta_step();
        assert_eq!(ch.period, 460);
        // 7 away with a step of 20: land exactly, never overshoot.
        ch.porta_step();
        assert_eq!(ch.period, 453);
        assert_eq!(ch.porta_target, 0);

        // Further steps leave the period alone.
        ch.porta_step();
        assert_eq!(ch.period, 453);
    }

    #[test]
    fn porta_slides_upward_too() {
        let mut ch = ChannelState::new(128);
        ch.period = 113;
        ch.porta_target = 140;
        ch.porta_rate = 12;
        ch.porta_step();
        assert_eq!(ch.period, 125);
        ch.porta_step();
        assert_eq!(ch.period, 137);
        ch.porta_step();
        assert_eq!(ch.period, 140);
    }

    #[test]
    fn pan_maps_to_unit_range() {
        assert_eq!(ChannelState::new(128).pan_value(), 0.0);
        assert_eq!(ChannelState::new(0).pan_value(), -1.0);
        assert!(ChannelState::new(255).pan_value() > 0.99);
    }
}
