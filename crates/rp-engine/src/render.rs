//! Offline rendering.
//!
//! A module's duration is not written anywhere in the container; the
//! only way to know it is to play the song. Rendering therefore runs
//! twice: a dry run against a discarding backend until the sequence
//! loops, then a real run scheduling exactly that much audio on the
//! caller's backend.

use log::warn;
use rp_ir::Module;

use crate::backend::{Backend, NullBackend};
use crate::engine::Engine;

/// Tick cap for the dry run; a pathological module whose flow control
/// never revisits a position stops here (~7 hours at default tempo).
pub const MAX_MEASURE_TICKS: u64 = 1_000_000;

/// Play the module silently and return its duration in seconds, up to
/// the point where the sequence first loops.
pub fn measure(module: &Module) -> f64 {
    let mut engine = Engine::new(module.clone(), NullBackend::default());
    engine.play();
    let mut ticks = 0u64;
    while !engine.process_tick() {
        ticks += 1;
        if ticks >= MAX_MEASURE_TICKS {
            warn!("module never loops; capping render at {} ticks", MAX_MEASURE_TICKS);
            break;
        }
    }
    engine.elapsed()
}

/// Schedule one full playthrough of the module on `backend`, returning
/// the backend and the rendered duration.
pub fn render<B: Backend>(module: &Module, backend: B) -> (B, f64) {
    let duration = measure(module);
    let mut engine = Engine::new(module.clone(), backend);
    engine.play();
    while engine.elapsed() < duration {
        engine.process_tick();
    }
    engine.pause();
    (engine.into_backend(), duration)
}
