//! Jam voices: live note preview outside the sequencer.
//!
//! A jam voice is keyed by a caller-chosen id (typically the MIDI note
//! or keyboard key that is held down) and starts from a snapshot of a
//! sequenced channel's state, so previewing over a playing song inherits
//! that channel's instrument, volume and panning. Jam voices are not
//! advanced by the tick machine; they sound until released.

use alloc::sync::Arc;

use rp_ir::Sample;

use crate::backend::VoiceId;
use crate::channel::ChannelState;

/// Caller-chosen key identifying one held jam note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct JamId(pub u64);

/// One held preview note.
#[derive(Debug)]
pub struct JamVoice {
    /// Sample slot inherited from the source channel.
    pub sample: u8,
    /// Sample played instead of the slot, when previewing unsaved
    /// instrument edits.
    pub override_sample: Option<Arc<Sample>>,
    pub offset: u32,
    pub finetune: i8,
    pub volume: u8,
    pub panning: u8,
    pub period: u16,
    pub voice: Option<VoiceId>,
}

impl JamVoice {
    /// Snapshot the parts of a channel a preview note inherits.
    pub fn from_channel(ch: &ChannelState) -> Self {
        Self {
            sample: ch.sample,
            override_sample: None,
            offset: ch.offset,
            finetune: ch.finetune,
            volume: ch.volume,
            panning: ch.panning,
            period: 0,
            voice: None,
        }
    }
}
