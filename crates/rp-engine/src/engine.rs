//! The tick state machine.
//!
//! Playback advances in ticks scheduled ahead of the backend clock.
//! Each row spans `speed` ticks: tick 0 applies instruments, notes and
//! first-tick effects, later ticks run the continuing effects (slides,
//! vibrato, retriggers), and the last tick's row-end pass resolves flow
//! control (jumps, breaks, pattern loops, pattern delay). After every
//! tick, each channel pushes only the parameters that changed to its
//! backend voice.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, warn};
use rp_ir::period::{period, PITCHES};
use rp_ir::{Cell, Effect, Module, Pattern, Sample, MAX_VOLUME, ROWS};

use crate::backend::Backend;
use crate::channel::ChannelState;
use crate::jam::{JamId, JamVoice};
use crate::marker::{MarkerQueue, RowMarker};

/// Ticks per row when no speed command has run.
pub const DEFAULT_SPEED: u32 = 6;

/// Default tempo; a tick lasts `60 / tempo / 24` seconds.
pub const DEFAULT_TEMPO: u32 = 125;

const TICKS_PER_BEAT: f64 = 24.0;

/// How far ahead of the backend clock `pump` schedules.
pub const LOOKAHEAD: f64 = 0.5;

/// Length of the gain ramp-in on a fresh voice, to avoid clicks.
const GAIN_RAMP: f64 = 0.005;

/// Module playback against a timestamped backend.
pub struct Engine<B: Backend> {
    backend: B,
    module: Module,
    channels: Vec<ChannelState>,
    jam: BTreeMap<JamId, JamVoice>,

    pos: usize,
    row: usize,
    tick: u32,
    speed: u32,
    tempo: u32,

    /// Extra repeats left for the current row (pattern delay).
    row_delay: u32,
    /// True while the current row is a pattern-delay repeat.
    row_repeating: bool,
    loop_pattern: bool,
    playing: bool,

    /// Sequence positions entered since `play`; re-entering one means
    /// the song has looped.
    visited: Vec<bool>,

    /// Schedule cursor on the backend timeline.
    clock: f64,
    start_time: f64,
    markers: MarkerQueue,
}

impl<B: Backend> Engine<B> {
    pub fn new(module: Module, backend: B) -> Self {
        let channels = Self::make_channels(module.num_channels);
        let visited = alloc::vec![false; module.sequence.len()];
        Self {
            backend,
            module,
            channels,
            jam: BTreeMap::new(),
            pos: 0,
            row: 0,
            tick: 0,
            speed: DEFAULT_SPEED,
            tempo: DEFAULT_TEMPO,
            row_delay: 0,
            row_repeating: false,
            loop_pattern: false,
            playing: false,
            visited,
            clock: 0.0,
            start_time: 0.0,
            markers: MarkerQueue::default(),
        }
    }

    fn make_channels(num_channels: u8) -> Vec<ChannelState> {
        // Amiga LRRL ordering, pulled in from the edges a little.
        (0..num_channels)
            .map(|i| match i % 4 {
                0 | 3 => ChannelState::new(64),
                _ => ChannelState::new(192),
            })
            .collect()
    }

    // --- transport ---

    /// Start (or resume) playback from the current position. The
    /// schedule cursor re-bases on the backend clock.
    pub fn play(&mut self) {
        let now = self.backend.now();
        debug!("play from pos {} row {} at t={:.3}", self.pos, self.row, now);
        self.clock = now;
        self.start_time = now;
        self.tick = 0;
        self.playing = true;
        self.markers.clear();
        self.reset_visited();
    }

    /// Stop playback: every live voice (sequenced and jam) is released
    /// and the schedule cursor resets.
    pub fn pause(&mut self) {
        self.playing = false;
        let when = self.backend.now();
        debug!("pause at pos {} row {}", self.pos, self.row);
        self.stop_all_voices(when);
        self.markers.clear();
        self.clock = 0.0;
        self.start_time = 0.0;
        self.tick = 0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Jump to a sequence position (clamped), restarting its pattern.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.module.sequence.len().saturating_sub(1));
        self.row = 0;
        self.tick = 0;
        self.reset_visited();
    }

    /// When enabled, the sequence never advances: the current pattern
    /// repeats.
    pub fn set_loop_pattern(&mut self, enabled: bool) {
        self.loop_pattern = enabled;
    }

    pub fn set_muted(&mut self, channel: usize, muted: bool) {
        if let Some(ch) = self.channels.get_mut(channel) {
            ch.muted = muted;
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Seconds of playback scheduled since `play`.
    pub fn elapsed(&self) -> f64 {
        self.clock - self.start_time
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelState> {
        self.channels.get(index)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// The row whose audio is sounding right now, per the backend clock.
    pub fn playhead(&mut self) -> Option<RowMarker> {
        let now = self.backend.now();
        self.markers.current(now)
    }

    /// Swap in an edited module. Channel runtime state survives unless
    /// the channel count changed; voices survive unless the sample bank
    /// changed (identity-compared, so pattern edits never interrupt
    /// sounding notes).
    pub fn set_module(&mut self, module: Module) {
        let when = self.backend.now();
        if module.num_channels != self.module.num_channels {
            self.stop_all_voices(when);
            self.channels = Self::make_channels(module.num_channels);
        } else if !Arc::ptr_eq(&module.samples, &self.module.samples) {
            self.stop_all_voices(when);
        }
        if !Arc::ptr_eq(&module.sequence, &self.module.sequence) {
            if self.pos >= module.sequence.len() {
                self.pos = 0;
                self.row = 0;
                self.tick = 0;
            }
            self.module = module;
            self.reset_visited();
            return;
        }
        self.module = module;
    }

    fn reset_visited(&mut self) {
        self.visited.clear();
        self.visited.resize(self.module.sequence.len(), false);
        if let Some(slot) = self.visited.get_mut(self.pos) {
            *slot = true;
        }
    }

    fn stop_all_voices(&mut self, when: f64) {
        for ch in &mut self.channels {
            if let Some(voice) = ch.voice.take() {
                self.backend.stop(voice, when);
            }
            ch.reset_scheduled();
        }
        for jam in self.jam.values_mut() {
            if let Some(voice) = jam.voice.take() {
                self.backend.stop(voice, when);
            }
        }
        self.jam.clear();
    }

    // --- scheduling ---

    /// Schedule ticks until the cursor is `LOOKAHEAD` past the backend
    /// clock. Call this from a coarse timer (~100ms is plenty).
    pub fn pump(&mut self) {
        if !self.playing {
            return;
        }
        let horizon = self.backend.now() + LOOKAHEAD;
        while self.clock < horizon {
            self.process_tick();
        }
    }

    /// Advance one tick. Returns true when the song loops, i.e. the
    /// sequence re-enters a position already played since `play`.
    pub fn process_tick(&mut self) -> bool {
        let Some(pattern) = self.module.pattern_at(self.pos).cloned() else {
            self.clock += self.tick_len();
            return false;
        };

        if self.tick == 0 {
            self.markers.push(RowMarker { time: self.clock, pos: self.pos, row: self.row });
        }

        for ch in 0..self.channels.len() {
            self.process_channel_tick(&pattern, ch);
        }

        self.tick += 1;
        let mut looped = false;
        if self.tick >= self.speed {
            self.tick = 0;
            looped = self.advance_row(&pattern);
        }
        self.clock += self.tick_len();
        looped
    }

    fn tick_len(&self) -> f64 {
        60.0 / self.tempo as f64 / TICKS_PER_BEAT
    }

    // --- per-channel tick ---

    fn process_channel_tick(&mut self, pattern: &Pattern, ch: usize) {
        let cell = *pattern.cell(self.row, ch as u8);
        let fx = Effect::from_cell(&cell);

        if self.tick == 0 {
            self.channels[ch].delayed = None;
            if let Effect::NoteDelay(d) = fx {
                if d > 0 {
                    self.channels[ch].delayed = Some(cell);
                    return;
                }
            }
            self.apply_row_start(ch, &cell, &fx);
            self.apply_first_tick_effect(ch, &fx);
        } else {
            self.apply_continuing_effect(ch, &fx);
        }

        self.push_channel_params(ch, &fx);
    }

    /// Tick 0: instrument column, sample offset, and the note itself.
    fn apply_row_start(&mut self, ch: usize, cell: &Cell, fx: &Effect) {
        if cell.inst != 0 {
            let defaults = self.module.sample(cell.inst).map(|s| (s.volume, s.finetune));
            let st = &mut self.channels[ch];
            st.sample = cell.inst;
            st.offset = 0;
            match defaults {
                Some((volume, finetune)) => {
                    st.volume = volume;
                    st.finetune = finetune;
                }
                None => warn!("instrument {} has no sample", cell.inst),
            }
        }

        if let Effect::SampleOffset(p) = fx {
            let st = &mut self.channels[ch];
            if *p > 0 {
                st.offset_param = *p;
            }
            st.offset = st.offset_param as u32 * 256;
        }

        if cell.has_note() {
            let pitch = cell.pitch as u8;
            if fx.is_tone_porta() {
                let st = &mut self.channels[ch];
                let target = period(st.finetune, pitch);
                if st.period == 0 {
                    // Nothing sounding to slide from.
                    st.period = target;
                } else {
                    st.porta_target = target;
                }
            } else {
                self.trigger_note(ch, pitch);
            }
        }
    }

    fn trigger_note(&mut self, ch: usize, pitch: u8) {
        {
            let st = &mut self.channels[ch];
            st.period = period(st.finetune, pitch);
            st.porta_target = 0;
            st.vibrato.retrigger();
            st.tremolo.retrigger();
        }
        self.restart_voice(ch);
    }

    /// Stop the channel's voice and start a fresh one from the current
    /// sample and offset. It starts silent; the parameter push ramps the
    /// gain in.
    fn restart_voice(&mut self, ch: usize) {
        let when = self.clock;
        if let Some(voice) = self.channels[ch].voice.take() {
            self.backend.stop(voice, when);
        }
        let slot = self.channels[ch].sample;
        let Some(sample) = self.module.sample(slot).cloned() else {
            return;
        };
        if sample.is_empty() {
            return;
        }
        let offset = self.channels[ch].offset.min(sample.len() as u32);
        let voice = self.backend.play(&sample, when, offset);
        let st = &mut self.channels[ch];
        st.voice = Some(voice);
        st.reset_scheduled();
    }

    fn apply_first_tick_effect(&mut self, ch: usize, fx: &Effect) {
        match *fx {
            Effect::Vibrato { speed, depth } => self.channels[ch].vibrato.configure(speed, depth),
            Effect::Tremolo { speed, depth } => self.channels[ch].tremolo.configure(speed, depth),
            Effect::TonePorta(rate) if rate > 0 => self.channels[ch].porta_rate = rate,
            Effect::SetPan(pan) => self.channels[ch].panning = pan,
            Effect::SetVolume(volume) => self.channels[ch].volume = volume,
            Effect::SetSpeed(speed) => self.speed = speed as u32,
            Effect::SetTempo(tempo) => self.tempo = tempo as u32,
            Effect::FinePortaUp(amount) => self.channels[ch].slide_period_up(amount),
            Effect::FinePortaDown(amount) => self.channels[ch].slide_period_down(amount),
            Effect::FineVolumeSlideUp(amount) => self.channels[ch].slide_volume(amount, 0),
            Effect::FineVolumeSlideDown(amount) => self.channels[ch].slide_volume(0, amount),
            Effect::SetVibratoWaveform(w) => self.channels[ch].vibrato.select_waveform(w),
            Effect::SetTremoloWaveform(w) => self.channels[ch].tremolo.select_waveform(w),
            Effect::SetFinetune(finetune) => self.channels[ch].finetune = finetune,
            Effect::PatternLoop(0) => self.channels[ch].loop_row = self.row,
            Effect::NoteCut(0) => self.channels[ch].volume = 0,
            _ => {}
        }
    }

    fn apply_continuing_effect(&mut self, ch: usize, fx: &Effect) {
        match *fx {
            Effect::PortaUp(amount) => self.channels[ch].slide_period_up(amount),
            Effect::PortaDown(amount) => self.channels[ch].slide_period_down(amount),
            Effect::TonePorta(_) => self.channels[ch].porta_step(),
            Effect::TonePortaVolSlide { up, down } => {
                let st = &mut self.channels[ch];
                st.porta_step();
                st.slide_volume(up, down);
            }
            Effect::Vibrato { .. } => self.channels[ch].vibrato.advance(),
            Effect::VibratoVolSlide { up, down } => {
                let st = &mut self.channels[ch];
                st.vibrato.advance();
                st.slide_volume(up, down);
            }
            Effect::Tremolo { .. } => self.channels[ch].tremolo.advance(),
            Effect::VolumeSlide { up, down } => self.channels[ch].slide_volume(up, down),
            Effect::RetriggerNote(every) if every > 0 => {
                if self.tick % every as u32 == 0 {
                    self.restart_voice(ch);
                }
            }
            Effect::NoteCut(at) => {
                if self.tick == at as u32 {
                    self.channels[ch].volume = 0;
                }
            }
            Effect::NoteDelay(at) => {
                if self.tick == at as u32 {
                    if let Some(held) = self.channels[ch].delayed.take() {
                        self.apply_row_start(ch, &held, &Effect::None);
                    }
                }
            }
            _ => {}
        }
    }

    /// Push changed parameters to the channel's voice.
    fn push_channel_params(&mut self, ch: usize, fx: &Effect) {
        let tick = self.tick;
        let when = self.clock;
        let backend = &mut self.backend;
        let st = &mut self.channels[ch];
        let Some(voice) = st.voice else {
            return;
        };

        let vibrato = match fx {
            Effect::Vibrato { .. } | Effect::VibratoVolSlide { .. } => st.vibrato.period_offset(),
            _ => 0.0,
        };
        let tremolo = match fx {
            Effect::Tremolo { .. } => st.tremolo.volume_offset(),
            _ => 0.0,
        };
        let detune = match *fx {
            Effect::Arpeggio { x, y } => match tick % 3 {
                1 => x as i8,
                2 => y as i8,
                _ => 0,
            },
            _ => 0,
        };

        if st.period != 0 {
            let effective = st.period as f32 + vibrato;
            if st.sched_period != Some(effective) {
                backend.set_period(voice, when, effective);
                st.sched_period = Some(effective);
            }
        }

        if st.sched_detune != Some(detune) {
            backend.set_detune(voice, when, detune);
            st.sched_detune = Some(detune);
        }

        let volume = if st.muted {
            0.0
        } else {
            (st.volume as f32 + tremolo).clamp(0.0, MAX_VOLUME as f32)
        };
        let gain = volume / MAX_VOLUME as f32;
        if st.sched_gain != Some(gain) {
            if st.sched_gain.is_none() {
                // Fresh voice: fade in instead of stepping.
                backend.ramp_gain(voice, when + GAIN_RAMP, gain);
            } else {
                backend.set_gain(voice, when, gain);
            }
            st.sched_gain = Some(gain);
        }

        if st.sched_pan != Some(st.panning) {
            backend.set_pan(voice, when, st.pan_value());
            st.sched_pan = Some(st.panning);
        }
    }

    // --- row end ---

    fn advance_row(&mut self, pattern: &Pattern) -> bool {
        let mut jump = None;
        let mut brk = None;
        let mut loop_jump = None;
        let mut delay = 0u8;

        for ch in 0..self.channels.len() {
            match Effect::from_cell(pattern.cell(self.row, ch as u8)) {
                Effect::PositionJump(pos) => jump = Some(pos as usize),
                Effect::PatternBreak(row) => brk = Some(row as usize),
                Effect::PatternLoop(count) if count > 0 => {
                    let st = &mut self.channels[ch];
                    if st.loop_count < count {
                        st.loop_count += 1;
                        loop_jump = Some(st.loop_row);
                    } else {
                        st.loop_count = 0;
                    }
                }
                Effect::PatternDelay(count) => delay = count,
                _ => {}
            }
        }

        // A repeating row must not re-arm its own delay.
        if delay > 0 && !self.row_repeating {
            self.row_delay = delay as u32;
        }
        if self.row_delay > 0 {
            self.row_delay -= 1;
            self.row_repeating = true;
            return false;
        }
        self.row_repeating = false;

        if let Some(row) = loop_jump {
            self.row = row;
            return false;
        }

        let next_pos = if let Some(pos) = jump {
            self.row = brk.unwrap_or(0);
            Some(pos)
        } else if let Some(row) = brk {
            self.row = row;
            Some(self.pos + 1)
        } else {
            self.row += 1;
            if self.row >= pattern.rows() {
                self.row = 0;
                Some(self.pos + 1)
            } else {
                None
            }
        };

        let Some(mut pos) = next_pos else {
            return false;
        };
        if self.row >= ROWS {
            // Break past the end of the target pattern.
            self.row = 0;
            pos += 1;
        }
        if self.loop_pattern {
            pos = self.pos;
        } else if pos >= self.module.sequence.len() {
            pos = self.module.restart_pos as usize;
        }
        self.pos = pos;
        for ch in &mut self.channels {
            ch.loop_row = 0;
            ch.loop_count = 0;
        }
        core::mem::replace(&mut self.visited[pos], true)
    }

    // --- jam ---

    /// Start a preview note keyed by `id`, inheriting channel state from
    /// `channel`. An override sample plays instead of the channel's
    /// instrument (previewing unsaved sample edits).
    pub fn jam_on(&mut self, id: JamId, channel: usize, pitch: u8, override_sample: Option<Arc<Sample>>) {
        self.jam_off(id);
        let Some(src) = self.channels.get(channel) else {
            return;
        };
        let mut jam = JamVoice::from_channel(src);
        jam.override_sample = override_sample;

        let sample = jam
            .override_sample
            .clone()
            .or_else(|| self.module.sample(jam.sample).cloned())
            .filter(|s| !s.is_empty());
        if let Some(sample) = sample {
            if jam.override_sample.is_some() {
                // An override implies an instrument change, so its
                // defaults win; otherwise the cloned channel values
                // stand, like a bare note on a sequenced channel.
                jam.finetune = sample.finetune;
                jam.volume = sample.volume;
            }
            jam.period = period(jam.finetune, pitch.min(PITCHES as u8 - 1));

            let when = self.backend.now();
            let offset = jam.offset.min(sample.len() as u32);
            let voice = self.backend.play(&sample, when, offset);
            self.backend.set_period(voice, when, jam.period as f32);
            self.backend.set_pan(voice, when, (jam.panning as f32 - 128.0) / 128.0);
            self.backend.ramp_gain(voice, when + GAIN_RAMP, jam.volume as f32 / MAX_VOLUME as f32);
            jam.voice = Some(voice);
        }
        self.jam.insert(id, jam);
    }

    /// Release the preview note keyed by `id`. Other jam notes and all
    /// sequenced channels are untouched.
    pub fn jam_off(&mut self, id: JamId) {
        if let Some(jam) = self.jam.remove(&id) {
            if let Some(voice) = jam.voice {
                let when = self.backend.now();
                self.backend.stop(voice, when);
            }
        }
    }

    /// Held jam notes.
    pub fn jam_count(&self) -> usize {
        self.jam.len()
    }

    pub fn jam(&self, id: JamId) -> Option<&JamVoice> {
        self.jam.get(&id)
    }
}
