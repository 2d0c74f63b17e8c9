//! Playback engine for the replayer tracker.
//!
//! [`Engine`] runs the classic tick state machine over an immutable
//! module, scheduling voice parameter changes ahead of real time
//! against a [`Backend`]. The backend is abstract so the same engine
//! drives live playback, silent duration measurement, and offline
//! rendering.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod backend;
mod channel;
mod engine;
mod jam;
mod lfo;
mod marker;
mod render;

pub use backend::{Backend, NullBackend, VoiceId};
pub use channel::ChannelState;
pub use engine::{Engine, DEFAULT_SPEED, DEFAULT_TEMPO, LOOKAHEAD};
pub use jam::{JamId, JamVoice};
pub use lfo::{Lfo, Waveform};
pub use marker::{MarkerQueue, RowMarker};
pub use render::{measure, render, MAX_MEASURE_TICKS};
