//! The audio backend boundary.
//!
//! The engine schedules parameter changes ahead of real time against an
//! abstract voice-based backend; everything it asks for carries an
//! absolute timestamp in backend seconds. A backend that honors the
//! timestamps (a WebAudio-style graph, an offline renderer) gets
//! sample-accurate playback without the engine knowing its buffer size.

use alloc::sync::Arc;

use rp_ir::Sample;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle for one playing voice on the backend.
    pub struct VoiceId;
}

/// A timestamped, voice-oriented audio sink.
///
/// All `when` arguments are absolute times on the backend's clock, the
/// same clock `now` reports. Calls for a given voice arrive in
/// non-decreasing time order.
pub trait Backend {
    /// Current backend time in seconds.
    fn now(&self) -> f64;

    /// Start a voice playing `sample` at time `when`, from byte
    /// `offset` into the waveform. The voice starts silent; the engine
    /// ramps its gain in to avoid clicks.
    fn play(&mut self, sample: &Arc<Sample>, when: f64, offset: u32) -> VoiceId;

    /// Schedule a period (pitch) change.
    fn set_period(&mut self, voice: VoiceId, when: f64, period: f32);

    /// Schedule a chromatic detune in semitones on top of the period.
    fn set_detune(&mut self, voice: VoiceId, when: f64, semitones: i8);

    /// Schedule an instantaneous gain change, 0.0..=1.0.
    fn set_gain(&mut self, voice: VoiceId, when: f64, gain: f32);

    /// Schedule a short linear ramp to `gain` ending at `when`.
    fn ramp_gain(&mut self, voice: VoiceId, when: f64, gain: f32);

    /// Schedule a stereo position change, -1.0 (left) to 1.0 (right).
    fn set_pan(&mut self, voice: VoiceId, when: f64, pan: f32);

    /// Stop and release a voice at time `when`. The id is dead after
    /// this call.
    fn stop(&mut self, voice: VoiceId, when: f64);
}

/// A backend that discards everything and never advances its clock.
///
/// Used by the offline renderer's dry run to find a module's loop point,
/// and by tests that only care about engine state.
#[derive(Default)]
pub struct NullBackend {
    voices: SlotMap<VoiceId, ()>,
    /// Total `play` calls, live and dead.
    pub voices_started: usize,
}

impl Backend for NullBackend {
    fn now(&self) -> f64 {
        0.0
    }

    fn play(&mut self, _sample: &Arc<Sample>, _when: f64, _offset: u32) -> VoiceId {
        self.voices_started += 1;
        self.voices.insert(())
    }

    fn set_period(&mut self, _voice: VoiceId, _when: f64, _period: f32) {}

    fn set_detune(&mut self, _voice: VoiceId, _when: f64, _semitones: i8) {}

    fn set_gain(&mut self, _voice: VoiceId, _when: f64, _gain: f32) {}

    fn ramp_gain(&mut self, _voice: VoiceId, _when: f64, _gain: f32) {}

    fn set_pan(&mut self, _voice: VoiceId, _when: f64, _pan: f32) {}

    fn stop(&mut self, voice: VoiceId, _when: f64) {
        self.voices.remove(voice);
    }
}

impl NullBackend {
    /// Voices started and not yet stopped.
    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }
}
