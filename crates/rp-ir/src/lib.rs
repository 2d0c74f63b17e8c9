//! Core data model for the replayer tracker.
//!
//! Defines the immutable module tree (cells, patterns, samples) that the
//! codec produces and the playback engine consumes, plus the historical
//! period tables that tie pitch indices to hardware periods.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod effects;
mod module;
mod pattern;
pub mod period;
mod sample;

pub use effects::Effect;
pub use module::{Module, MAX_SEQUENCE, SAMPLE_SLOTS, TITLE_LEN};
pub use pattern::{Cell, Pattern, ROWS};
pub use sample::{Sample, MAX_VOLUME, NAME_LEN};
